//! Gateway command handlers.

use tabled::Tabled;

use opnbridge_core::{Bridge, CycleOutcome, GatewayEntity};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GatewayRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Sensor")]
    sensor: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Monitor")]
    monitor: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn to_row(gw: &GatewayEntity, color: bool) -> GatewayRow {
    let label = if gw.online { "online" } else { "offline" };
    GatewayRow {
        name: gw.name.clone(),
        status: output::paint_state(label, gw.online, color),
        sensor: gw.sensor_state().to_string(),
        address: gw.ip_address.clone().unwrap_or_default(),
        monitor: gw.monitor_target.clone().unwrap_or_default(),
        last_seen: gw
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

/// Run one reconciliation cycle and print what is tracked.
pub async fn handle(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    if let CycleOutcome::Degraded { error, .. } = bridge.reconcile_gateways_once().await {
        return Err(CliError::during("list gateways", error));
    }

    let color = output::should_color(&global.color);
    let snapshot = bridge.gateways().snapshot();
    let gateways: Vec<&GatewayEntity> = snapshot.iter().map(|gw| &**gw).collect();

    let out = output::render_list(
        &global.output,
        &gateways,
        |gw| to_row(gw, color),
        |gw| format!("{}\t{}", gw.name, if gw.online { "online" } else { "offline" }),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

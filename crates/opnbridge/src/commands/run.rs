//! Foreground polling loop.

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use opnbridge_core::{Bridge, GatewayEvent};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Start the pollers and log changes until Ctrl-C.
pub async fn handle(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let mut events = bridge.gateways().subscribe();

    let seeded = bridge.poll_rules_once().await;
    info!(seeded, total = bridge.switches().len(), "initial rule read complete");

    bridge.start().await;
    if !global.quiet {
        eprintln!("Polling {}. Press Ctrl-C to stop.", bridge.config().host);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped gateway events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    bridge.shutdown().await;
    Ok(())
}

fn log_event(event: &GatewayEvent) {
    let gw = event.entity();
    match event {
        GatewayEvent::Added(_) => info!(gateway = %gw.name, online = gw.online, "gateway added"),
        GatewayEvent::Updated(_) => {
            info!(gateway = %gw.name, online = gw.online, state = %gw.sensor_state(), "gateway updated");
        }
        GatewayEvent::Removed(_) => info!(gateway = %gw.name, "gateway removed"),
        GatewayEvent::Faulted(_) => warn!(gateway = %gw.name, "gateway status unknown"),
    }
}

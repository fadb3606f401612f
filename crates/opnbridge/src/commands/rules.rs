//! Rule switch command handlers.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use opnbridge_core::{Bridge, RuleSwitch, WriteOutcome};

use crate::cli::{GlobalOpts, RulesArgs, RulesCommand};
use crate::error::CliError;
use crate::output;

// ── View model ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SwitchView {
    id: String,
    /// Id hosts registered before it stopped covering the name.
    legacy_id: String,
    name: String,
    rule_uuid: String,
    invert: bool,
    /// Presented state. `None` when the read failed.
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<bool>,
}

impl SwitchView {
    fn new(bridge: &Bridge, switch: &RuleSwitch, state: Result<bool, String>) -> Self {
        let (on, error) = match state {
            Ok(on) => (Some(on), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            id: bridge.switch_id(switch).to_string(),
            legacy_id: bridge.switch_legacy_id(switch).to_string(),
            name: switch.name.clone(),
            rule_uuid: switch.rule_uuid.clone(),
            invert: switch.invert,
            on,
            error,
            changed: None,
        }
    }

    fn state_label(&self) -> &'static str {
        match self.on {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown",
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SwitchRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rule UUID")]
    rule_uuid: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Inverted")]
    invert: String,
    #[tabled(rename = "Error")]
    error: String,
}

fn to_row(view: &SwitchView, color: bool) -> SwitchRow {
    SwitchRow {
        name: view.name.clone(),
        rule_uuid: view.rule_uuid.clone(),
        state: output::paint_state(view.state_label(), view.on.unwrap_or(false), color),
        invert: (if view.invert { "yes" } else { "" }).to_owned(),
        error: view.error.clone().unwrap_or_default(),
    }
}

fn detail(view: &SwitchView, color: bool) -> String {
    let state = output::paint_state(view.state_label(), view.on.unwrap_or(false), color);
    let mut lines = vec![
        format!("Name:      {}", view.name),
        format!("Rule UUID: {}", view.rule_uuid),
        format!("State:     {state}"),
    ];
    if view.invert {
        lines.push("Inverted:  yes".into());
    }
    match view.changed {
        Some(true) => lines.push("Changed:   yes".into()),
        Some(false) => lines.push("Changed:   no (already in requested state)".into()),
        None => {}
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(bridge: &Bridge, args: RulesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        RulesCommand::Status => {
            let mut views = Vec::with_capacity(bridge.switches().len());
            for switch in bridge.switches() {
                let state = bridge.get_on(&switch.rule_uuid).await.map_err(|e| {
                    warn!(rule = %switch.rule_uuid, error = %e, "could not read rule");
                    e.to_string()
                });
                views.push(SwitchView::new(bridge, switch, state));
            }

            let out = output::render_list(
                &global.output,
                &views,
                |v| to_row(v, color),
                |v| format!("{}\t{}", v.rule_uuid, v.state_label()),
            );
            output::print_output(&out, global.quiet);

            let failed = views.iter().filter(|v| v.on.is_none()).count();
            if failed > 0 {
                return Err(CliError::PartialFailure {
                    failed,
                    total: views.len(),
                });
            }
            Ok(())
        }

        RulesCommand::Get { rule } => {
            let switch = bridge.switch(&rule)?;
            let on = bridge
                .get_on(&switch.rule_uuid)
                .await
                .map_err(|e| CliError::during(format!("read rule '{}'", switch.name), e))?;
            let view = SwitchView::new(bridge, switch, Ok(on));
            let out = output::render_single(
                &global.output,
                &view,
                |v| detail(v, color),
                |v| v.state_label().to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RulesCommand::Set { rule, state } => {
            let switch = bridge.switch(&rule)?;
            let outcome = bridge
                .set_on(&switch.rule_uuid, state.is_on())
                .await
                .map_err(|e| CliError::during(format!("switch rule '{}'", switch.name), e))?;
            let mut view = SwitchView::new(bridge, switch, Ok(state.is_on()));
            view.changed = Some(outcome == WriteOutcome::Toggled);
            let out = output::render_single(
                &global.output,
                &view,
                |v| detail(v, color),
                |v| v.state_label().to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

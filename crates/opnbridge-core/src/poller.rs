// ── Background polling ──
//
// Two independent timers owned by the bridge: one re-reads every
// configured rule, one runs gateway reconciliation. Both stop on the
// bridge's cancellation token; a cycle in progress finishes its current
// remote call but schedules nothing further.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::gateways::CycleOutcome;

/// Spawn the timers the configuration asks for.
pub(crate) fn spawn(bridge: &Bridge, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    let config = bridge.config();
    let mut handles = Vec::new();

    if config.poll_interval > Duration::ZERO && !config.switches.is_empty() {
        info!(
            interval_secs = config.poll_interval.as_secs(),
            rules = config.switches.len(),
            "starting rule poller"
        );
        handles.push(tokio::spawn(rule_poll_task(
            bridge.clone(),
            config.poll_interval,
            cancel.clone(),
        )));
    }

    if config.gateways.enabled {
        let period = config.gateways.effective_poll_interval();
        info!(interval_secs = period.as_secs(), "starting gateway poller");
        handles.push(tokio::spawn(gateway_poll_task(
            bridge.clone(),
            period,
            cancel.clone(),
        )));
    }

    handles
}

/// Re-read every rule each period. The first read happens one period in.
async fn rule_poll_task(bridge: Bridge, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                bridge.poll_rules_once().await;
            }
        }
    }
    debug!("rule poller stopped");
}

/// Reconcile gateways immediately, then each period.
async fn gateway_poll_task(bridge: Bridge, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let CycleOutcome::Synced(events) = bridge.reconcile_gateways_once().await {
                    debug!(changes = events.len(), "gateway cycle complete");
                }
            }
        }
    }
    debug!("gateway poller stopped");
}

// ── Bridge facade ──
//
// Owns the rule state service, the gateway reconciler, the presenter and
// the background timers. Cheaply cloneable (`Arc` inner) so timers and
// host callbacks can hold their own handle.

use std::sync::Arc;

use opnbridge_api::OpnClient;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::StatusCache;
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::gateways::{CycleOutcome, GatewayReconciler};
use crate::model::RuleSwitch;
use crate::poller;
use crate::rules::{RuleStateService, SwitchPresenter, WriteOutcome};

/// The state synchronization engine for one firewall.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    rules: RuleStateService,
    gateways: GatewayReconciler,
    presenter: Arc<dyn SwitchPresenter>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig, client: OpnClient, presenter: Arc<dyn SwitchPresenter>) -> Self {
        let client = Arc::new(client);
        let rules = RuleStateService::new(
            Arc::clone(&client),
            StatusCache::new(config.status_ttl),
            config.retry,
        );
        let gateways = GatewayReconciler::new(client, config.gateways.clone());

        Self {
            inner: Arc::new(BridgeInner {
                config,
                rules,
                gateways,
                presenter,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn switches(&self) -> &[RuleSwitch] {
        &self.inner.config.switches
    }

    /// Find a configured switch by rule uuid, then by name (case-insensitive).
    pub fn switch(&self, identifier: &str) -> Result<&RuleSwitch, CoreError> {
        let switches = self.switches();
        switches
            .iter()
            .find(|s| s.rule_uuid == identifier)
            .or_else(|| switches.iter().find(|s| s.matches(identifier)))
            .ok_or_else(|| CoreError::UnknownRule {
                identifier: identifier.to_owned(),
            })
    }

    /// Stable host-facing identity of a switch.
    pub fn switch_id(&self, switch: &RuleSwitch) -> Uuid {
        switch.stable_id(&self.inner.config.host)
    }

    /// Identity the switch had when ids also covered its name. Hosts use
    /// it to find presentation state cached under the old scheme.
    pub fn switch_legacy_id(&self, switch: &RuleSwitch) -> Uuid {
        switch.legacy_id(&self.inner.config.host)
    }

    pub fn rules(&self) -> &RuleStateService {
        &self.inner.rules
    }

    pub fn gateways(&self) -> &GatewayReconciler {
        &self.inner.gateways
    }

    pub fn presenter(&self) -> &Arc<dyn SwitchPresenter> {
        &self.inner.presenter
    }

    // ── Host operations ──────────────────────────────────────────────

    /// Presented on/off value for a switch.
    pub async fn get_on(&self, identifier: &str) -> Result<bool, CoreError> {
        let switch = self.switch(identifier)?;
        self.inner.rules.read(switch).await
    }

    /// Drive a switch to the requested presented value.
    pub async fn set_on(&self, identifier: &str, on: bool) -> Result<WriteOutcome, CoreError> {
        let switch = self.switch(identifier)?;
        self.inner
            .rules
            .write(switch, on, self.inner.presenter.as_ref())
            .await
    }

    /// Refresh every configured rule and push the presented values.
    /// Returns how many rules were read successfully. Failures leave the
    /// presentation untouched.
    pub async fn poll_rules_once(&self) -> usize {
        let mut refreshed = 0;
        for switch in self.switches() {
            match self.inner.rules.refresh(switch).await {
                Ok(enabled) => {
                    self.inner
                        .presenter
                        .set_on(&switch.rule_uuid, switch.presented(enabled));
                    refreshed += 1;
                }
                Err(e) => {
                    debug!(rule = %switch.rule_uuid, error = %e, "poll failed");
                }
            }
        }
        refreshed
    }

    pub async fn reconcile_gateways_once(&self) -> CycleOutcome {
        self.inner.gateways.reconcile_once().await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background timers. A stopped bridge stays stopped.
    pub async fn start(&self) {
        if self.inner.cancel.is_cancelled() {
            warn!("bridge already stopped, not starting pollers");
            return;
        }
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("pollers already running");
            return;
        }
        handles.extend(poller::spawn(self, &self.inner.cancel));
        info!(tasks = handles.len(), "bridge started");
    }

    /// Cancel all timers. No further cycles are scheduled once this returns.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Cancel all timers and wait for in-flight cycles to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("bridge stopped");
    }
}

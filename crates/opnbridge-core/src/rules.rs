// ── Rule state service ──
//
// Reads and writes a rule's enabled flag on top of the API client. Reads
// are TTL-cached and coalesced per rule; writes are read-compare-toggle
// with an optimistic presentation update that is rolled back on failure.
//
// The remote endpoint toggles rather than sets, so writes to one rule are
// serialized: two overlapping toggles would otherwise cancel out.

use std::sync::Arc;

use dashmap::DashMap;
use opnbridge_api::OpnClient;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::StatusCache;
use crate::coalesce::RequestCoalescer;
use crate::error::CoreError;
use crate::model::{RuleSwitch, StatusMethod};
use crate::retry::RetryPolicy;

// ── Presentation seam ────────────────────────────────────────────────

/// Where presented on/off values go: the host platform's switch entity.
///
/// Keyed by rule uuid. `set_on` must not block.
pub trait SwitchPresenter: Send + Sync {
    /// Push a presented on/off value.
    fn set_on(&self, rule_uuid: &str, on: bool);

    /// The last value pushed for this rule, if any.
    fn last_observed(&self, rule_uuid: &str) -> Option<bool>;
}

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The rule already had the requested state; nothing was sent.
    Unchanged,
    /// The rule was toggled (and applied, if configured).
    Toggled,
}

// ── Enabled flag parsing ─────────────────────────────────────────────

/// Decode a wire value into an enabled flag, if it is one of the
/// recognized encodings: `"1"`/`"0"`, `1`/`0` (also `1.0`/`0.0`), `true`/`false`.
fn decode_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "1" => Some(true),
        Value::String(s) if s == "0" => Some(false),
        Value::Number(n) => match n.as_f64() {
            Some(x) if (x - 1.0).abs() < f64::EPSILON => Some(true),
            Some(x) if x.abs() < f64::EPSILON => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parse `rule.enabled` from the direct lookup.
///
/// An absent field means disabled. Any unrecognized value, including
/// `null`, is an error so the caller falls back to the search endpoint.
pub(crate) fn parse_enabled(rule_uuid: &str, value: Option<&Value>) -> Result<bool, CoreError> {
    let Some(value) = value else {
        return Ok(false);
    };
    decode_flag(value).ok_or_else(|| CoreError::UnparseableEnabled {
        rule_uuid: rule_uuid.to_owned(),
        value: value.to_string(),
    })
}

/// Parse `enabled` from a search row: anything not recognizably true is false.
pub(crate) fn parse_enabled_lenient(value: Option<&Value>) -> bool {
    value.and_then(decode_flag).unwrap_or(false)
}

// ── Remote reads ─────────────────────────────────────────────────────

async fn lookup_direct(
    client: &OpnClient,
    retry: RetryPolicy,
    rule_uuid: &str,
) -> Result<bool, CoreError> {
    let lookup = retry
        .run("getRule", || client.get_rule(rule_uuid))
        .await?;
    parse_enabled(rule_uuid, lookup.enabled())
}

async fn lookup_search(
    client: &OpnClient,
    retry: RetryPolicy,
    rule_uuid: &str,
) -> Result<bool, CoreError> {
    let response = retry
        .run("searchRule", || client.search_rules(rule_uuid))
        .await?;
    let row = response
        .rows()
        .iter()
        .find(|row| row.uuid.as_deref() == Some(rule_uuid))
        .ok_or_else(|| CoreError::RuleNotFound {
            rule_uuid: rule_uuid.to_owned(),
        })?;
    Ok(parse_enabled_lenient(row.enabled.as_ref()))
}

/// Read the enabled flag, preferring the direct lookup when configured and
/// falling back to search on any failure of it.
async fn lookup_enabled(
    client: Arc<OpnClient>,
    retry: RetryPolicy,
    method: StatusMethod,
    rule_uuid: String,
) -> Result<bool, CoreError> {
    if method == StatusMethod::GetRule {
        match lookup_direct(&client, retry, &rule_uuid).await {
            Ok(enabled) => return Ok(enabled),
            Err(e) => {
                warn!(rule = %rule_uuid, error = %e, "getRule failed, falling back to searchRule");
            }
        }
    }
    lookup_search(&client, retry, &rule_uuid).await
}

// ── RuleStateService ─────────────────────────────────────────────────

/// Cached, coalesced, retrying access to firewall rule state.
pub struct RuleStateService {
    client: Arc<OpnClient>,
    retry: RetryPolicy,
    cache: StatusCache,
    /// Pending reads, keyed by rule uuid. Each result carries the instant
    /// its remote request was issued.
    reads: RequestCoalescer<String, (bool, Instant), CoreError>,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RuleStateService {
    pub fn new(client: Arc<OpnClient>, cache: StatusCache, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            cache,
            reads: RequestCoalescer::new(),
            write_locks: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn client(&self) -> &Arc<OpnClient> {
        &self.client
    }

    /// Remote enabled flag, bypassing the cache. Concurrent calls for the
    /// same rule share one remote read.
    pub async fn fetch_enabled(&self, rule: &RuleSwitch) -> Result<bool, CoreError> {
        self.fetch_observed(rule).await.map(|(enabled, _)| enabled)
    }

    /// Fetch the remote enabled flag and record it in the cache. Returns the
    /// cached value, which stays at a committed toggle if the read was issued
    /// before that toggle landed.
    pub async fn refresh(&self, rule: &RuleSwitch) -> Result<bool, CoreError> {
        let (enabled, issued_at) = self.fetch_observed(rule).await?;
        Ok(self.cache.put_observed(&rule.rule_uuid, enabled, issued_at))
    }

    /// Presented on/off value, served from the cache while fresh.
    pub async fn read(&self, rule: &RuleSwitch) -> Result<bool, CoreError> {
        if let Some(enabled) = self.cache.get_fresh(&rule.rule_uuid) {
            debug!(rule = %rule.rule_uuid, enabled, "status served from cache");
            return Ok(rule.presented(enabled));
        }
        let enabled = self.refresh(rule).await?;
        Ok(rule.presented(enabled))
    }

    /// Drive the rule to the requested presented value.
    ///
    /// Reads the live state first and does nothing if it already matches.
    /// Otherwise the presenter is updated optimistically, then the rule is
    /// toggled (and applied if configured). On failure the presenter gets
    /// back the value it held before the optimistic update and the error is
    /// returned unchanged.
    pub async fn write(
        &self,
        rule: &RuleSwitch,
        on: bool,
        presenter: &dyn SwitchPresenter,
    ) -> Result<WriteOutcome, CoreError> {
        let lock = self.write_lock(&rule.rule_uuid);
        let _guard = lock.lock().await;

        let target = rule.target_enabled(on);
        let (current, issued_at) = self.fetch_observed(rule).await?;
        if current == target {
            debug!(rule = %rule.rule_uuid, enabled = current, "already in requested state");
            self.cache.put_observed(&rule.rule_uuid, current, issued_at);
            return Ok(WriteOutcome::Unchanged);
        }

        // A presenter that never saw this rule gets the state just read.
        let prior = presenter
            .last_observed(&rule.rule_uuid)
            .unwrap_or_else(|| rule.presented(current));
        presenter.set_on(&rule.rule_uuid, on);

        match self.commit(rule).await {
            Ok(()) => {
                self.cache.put(&rule.rule_uuid, target);
                info!(rule = %rule.rule_uuid, name = %rule.name, enabled = target, "rule toggled");
                Ok(WriteOutcome::Toggled)
            }
            Err(e) => {
                presenter.set_on(&rule.rule_uuid, prior);
                error!(rule = %rule.rule_uuid, error = %e, "toggle failed, presentation reverted");
                Err(e)
            }
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn fetch_observed(&self, rule: &RuleSwitch) -> Result<(bool, Instant), CoreError> {
        let client = Arc::clone(&self.client);
        let retry = self.retry;
        let method = rule.status_method;
        let rule_uuid = rule.rule_uuid.clone();
        self.reads
            .run(rule.rule_uuid.clone(), move || async move {
                let issued_at = Instant::now();
                lookup_enabled(client, retry, method, rule_uuid)
                    .await
                    .map(|enabled| (enabled, issued_at))
            })
            .await
    }

    async fn commit(&self, rule: &RuleSwitch) -> Result<(), CoreError> {
        let client = &self.client;
        let response = self
            .retry
            .run("toggleRule", || client.toggle_rule(&rule.rule_uuid))
            .await?;
        debug!(rule = %rule.rule_uuid, %response, "toggle response");

        if rule.apply_after_toggle {
            let response = self
                .retry
                .run("apply", || client.apply_filter())
                .await?;
            debug!(rule = %rule.rule_uuid, %response, "apply response");
        }
        Ok(())
    }

    fn write_lock(&self, rule_uuid: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.write_locks
                .entry(rule_uuid.to_owned())
                .or_default()
                .value(),
        )
    }
}

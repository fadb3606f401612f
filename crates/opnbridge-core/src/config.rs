// ── Runtime engine configuration ──
//
// What to track and how often, already resolved from user settings.
// Never touches disk: the config crate builds a `BridgeConfig` and
// hands it in together with a ready `OpnClient`.

use std::collections::HashSet;
use std::time::Duration;

use crate::cache::DEFAULT_STATUS_TTL;
use crate::model::{RuleSwitch, SensorKind};
use crate::retry::RetryPolicy;

/// Everything the engine needs besides the API client and presenter.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Firewall host; seeds the stable switch identities.
    pub host: String,
    /// Configured rule switches, in display order.
    pub switches: Vec<RuleSwitch>,
    /// Freshness window for cached rule states.
    pub status_ttl: Duration,
    /// Background rule poll period. Zero disables rule polling.
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub gateways: GatewayConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            switches: Vec::new(),
            status_ttl: DEFAULT_STATUS_TTL,
            poll_interval: Duration::ZERO,
            retry: RetryPolicy::default(),
            gateways: GatewayConfig::default(),
        }
    }
}

/// Gateway sensor discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub sensor_kind: SensorKind,
    /// Only track these names. `None` tracks every gateway.
    pub include: Option<HashSet<String>>,
}

impl GatewayConfig {
    /// Floor applied to the gateway poll period.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    /// Configured poll period, never below [`MIN_POLL_INTERVAL`](Self::MIN_POLL_INTERVAL).
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(Self::MIN_POLL_INTERVAL)
    }

    /// Whether a gateway with this name passes the include filter.
    pub fn includes(&self, name: &str) -> bool {
        self.include.as_ref().is_none_or(|names| names.contains(name))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            sensor_kind: SensorKind::default(),
            include: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_has_floor() {
        let mut cfg = GatewayConfig::default();
        assert_eq!(cfg.effective_poll_interval(), Duration::from_secs(30));

        cfg.poll_interval = Duration::from_secs(1);
        assert_eq!(cfg.effective_poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn include_filter() {
        let mut cfg = GatewayConfig::default();
        assert!(cfg.includes("WAN"));

        cfg.include = Some(HashSet::from(["WAN".to_owned()]));
        assert!(cfg.includes("WAN"));
        assert!(!cfg.includes("WAN2"));
    }
}

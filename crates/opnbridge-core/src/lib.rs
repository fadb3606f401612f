//! State synchronization engine between an OPNsense firewall and a host
//! automation platform.
//!
//! - **[`Bridge`]**: facade owning everything below plus the background
//!   timers. [`get_on`](Bridge::get_on) / [`set_on`](Bridge::set_on) serve
//!   the host's switch callbacks; [`start`](Bridge::start) and
//!   [`shutdown`](Bridge::shutdown) manage polling.
//!
//! - **[`RuleStateService`]**: reads and toggles firewall rules. Reads go
//!   through a TTL [`StatusCache`] and a per-rule [`RequestCoalescer`];
//!   remote calls are wrapped in a [`RetryPolicy`].
//!
//! - **[`GatewayReconciler`]**: turns gateway status listings into a tracked
//!   set of [`GatewayEntity`] sensors, emitting [`GatewayEvent`]s for every
//!   add, update, removal and fault.
//!
//! - **[`normalize`]**: the ordered rules mapping a gateway status row to
//!   an online/offline verdict.

pub mod bridge;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod gateways;
pub mod model;
pub mod normalize;
mod poller;
pub mod retry;
pub mod rules;
mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use cache::StatusCache;
pub use coalesce::RequestCoalescer;
pub use config::{BridgeConfig, GatewayConfig};
pub use error::CoreError;
pub use gateways::{CycleOutcome, GatewayEvent, GatewayReconciler};
pub use model::{GatewayEntity, RuleSwitch, SensorKind, SensorState, StatusFault, StatusMethod};
pub use retry::{RetryPolicy, Transient};
pub use rules::{RuleStateService, SwitchPresenter, WriteOutcome};

// ── Domain model ──
//
// Canonical types for the two entity families the bridge exposes:
// rule switches (one per configured firewall rule) and gateway sensors
// (one per discovered gateway name).

pub mod gateway;
pub mod rule;

use uuid::Uuid;

pub use gateway::{GatewayEntity, SensorKind, SensorState, StatusFault};
pub use rule::{RuleSwitch, StatusMethod};

/// Namespace for every identity the bridge derives. Fixed forever: changing
/// it would orphan every entity a host has ever registered.
pub const ENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x8c1f_4a2e_6d0b_5e37_9a41_0f2c_7b65_d3e9);

/// Deterministic identity for an arbitrary seed string.
pub(crate) fn derive_id(seed: &str) -> Uuid {
    Uuid::new_v5(&ENTITY_NAMESPACE, seed.as_bytes())
}

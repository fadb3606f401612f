// ── Rule switch domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::derive_id;

/// Which endpoint is authoritative for a rule's enabled flag.
///
/// `GetRule` still falls back to the search endpoint when the direct
/// lookup fails or answers with something unreadable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StatusMethod {
    #[default]
    GetRule,
    SearchRule,
}

/// A configured firewall rule presented as an on/off switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSwitch {
    /// Remote rule uuid; doubles as the status cache key.
    pub rule_uuid: String,
    /// Display name.
    pub name: String,
    /// Present `on` when the rule is disabled.
    pub invert: bool,
    pub status_method: StatusMethod,
    /// Commit filter changes after each toggle.
    pub apply_after_toggle: bool,
}

impl RuleSwitch {
    pub const DEFAULT_NAME: &'static str = "OPNsense Rule";

    pub fn new(rule_uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rule_uuid: rule_uuid.into(),
            name: name.into(),
            invert: false,
            status_method: StatusMethod::default(),
            apply_after_toggle: false,
        }
    }

    /// Map the remote enabled flag to the presented on/off value.
    pub fn presented(&self, enabled: bool) -> bool {
        enabled != self.invert
    }

    /// Map a requested on/off value to the enabled flag it implies.
    pub fn target_enabled(&self, on: bool) -> bool {
        on != self.invert
    }

    /// Identity that survives renames: derived from host and rule uuid only.
    pub fn stable_id(&self, host: &str) -> Uuid {
        derive_id(&format!("{host}::{}", self.rule_uuid))
    }

    /// Identity older hosts registered, which also folded in the name.
    /// Hosts map state cached under it onto [`stable_id`](Self::stable_id).
    pub fn legacy_id(&self, host: &str) -> Uuid {
        derive_id(&format!("{host}::{}::{}", self.rule_uuid, self.name))
    }

    /// Does `identifier` name this switch (by rule uuid or display name)?
    pub fn matches(&self, identifier: &str) -> bool {
        self.rule_uuid == identifier || self.name.eq_ignore_ascii_case(identifier)
    }
}

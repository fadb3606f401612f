// ── Core error types ──
//
// Errors surfaced by the engine. API failures are wrapped, never rewritten:
// the `Api` variant carries the underlying `opnbridge_api::Error` behind an
// `Arc` so one coalesced failure can be handed to every waiting caller.

use std::sync::Arc;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Remote errors (wrapped, unchanged) ───────────────────────────
    #[error(transparent)]
    Api(Arc<opnbridge_api::Error>),

    // ── Rule errors ──────────────────────────────────────────────────
    #[error("Rule UUID {rule_uuid} not found in search results")]
    RuleNotFound { rule_uuid: String },

    #[error("Could not parse rule.enabled for {rule_uuid}: {value}")]
    UnparseableEnabled { rule_uuid: String, value: String },

    #[error("No switch configured for '{identifier}'")]
    UnknownRule { identifier: String },

    // ── Reconciliation errors ────────────────────────────────────────
    #[error("Gateway listing unavailable: {message}")]
    GatewayFetch { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if retrying the failed call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            _ => false,
        }
    }

    /// The underlying API error, if this failure came from the remote side.
    pub fn api_error(&self) -> Option<&opnbridge_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<opnbridge_api::Error> for CoreError {
    fn from(err: opnbridge_api::Error) -> Self {
        Self::Api(Arc::new(err))
    }
}

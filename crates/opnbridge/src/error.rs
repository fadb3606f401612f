//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use opnbridge_config::ConfigError;
use opnbridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the firewall while trying to {operation}")]
    #[diagnostic(
        code(opnbridge::communication_failure),
        help(
            "Check that the firewall is reachable and the API is enabled.\n\
             If it uses a self-signed certificate, set ca_path or verify_tls = false."
        )
    )]
    CommunicationFailure {
        operation: String,
        #[source]
        source: CoreError,
    },

    #[error("Request timed out while trying to {operation}")]
    #[diagnostic(
        code(opnbridge::timeout),
        help("Raise request_timeout in the config file if the firewall is slow to answer.")
    )]
    Timeout {
        operation: String,
        #[source]
        source: CoreError,
    },

    #[error("The firewall rejected the API credentials")]
    #[diagnostic(
        code(opnbridge::auth_failed),
        help(
            "Verify api_key and the secret for this host.\n\
             The key needs access to Firewall: Rules and Status: Gateways."
        )
    )]
    AuthFailed {
        #[source]
        source: CoreError,
    },

    // ── Rules ────────────────────────────────────────────────────────
    #[error("No switch configured for '{identifier}'")]
    #[diagnostic(
        code(opnbridge::unknown_rule),
        help("Run: opnbridge rules status to see configured switches")
    )]
    UnknownRule { identifier: String },

    #[error("Rule {rule_uuid} does not exist on the firewall")]
    #[diagnostic(
        code(opnbridge::rule_not_found),
        help("The rule may have been deleted. Update rule_uuid in the config file.")
    )]
    RuleNotFound { rule_uuid: String },

    #[error("{failed} of {total} switches could not be read")]
    #[diagnostic(code(opnbridge::partial_failure), help("Re-run with -v for details."))]
    PartialFailure { failed: usize, total: usize },

    // ── Gateways ─────────────────────────────────────────────────────
    #[error("Gateway listing unavailable: {message}")]
    #[diagnostic(
        code(opnbridge::gateway_fetch),
        help("Neither the gateway status nor the gateway settings endpoint answered.")
    )]
    GatewayFetch { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Missing required setting '{field}'")]
    #[diagnostic(
        code(opnbridge::missing_setting),
        help(
            "Add '{field}' to the config file or set OPNBRIDGE_{env} in the environment.\n\
             Expected at: {path}"
        )
    )]
    MissingSetting {
        field: &'static str,
        env: String,
        path: String,
    },

    #[error("No API secret found for host '{host}'")]
    #[diagnostic(
        code(opnbridge::no_credentials),
        help(
            "Set api_secret_env to the name of an environment variable holding the secret,\n\
             store it in the system keyring (service 'opnbridge', entry '{host}/api-secret'),\n\
             or set api_secret in the config file."
        )
    )]
    NoCredentials { host: String },

    #[error("Configuration error")]
    #[diagnostic(code(opnbridge::config_error))]
    Config(#[source] ConfigError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommunicationFailure { .. } | Self::GatewayFetch { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::UnknownRule { .. } | Self::RuleNotFound { .. } => exit_code::NOT_FOUND,
            Self::MissingSetting { .. } | Self::NoCredentials { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::PartialFailure { .. } => exit_code::GENERAL,
        }
    }

    /// Attach the operation being attempted to a core failure.
    pub fn during(operation: impl Into<String>, err: CoreError) -> Self {
        match err {
            CoreError::UnknownRule { identifier } => Self::UnknownRule { identifier },
            CoreError::RuleNotFound { rule_uuid } => Self::RuleNotFound { rule_uuid },
            CoreError::GatewayFetch { message } => Self::GatewayFetch { message },
            other => {
                let operation = operation.into();
                let status = other.api_error().and_then(opnbridge_api::Error::status);
                let timed_out = matches!(
                    other.api_error(),
                    Some(opnbridge_api::Error::Transport(e)) if e.is_timeout()
                );
                if matches!(status, Some(401 | 403)) {
                    Self::AuthFailed { source: other }
                } else if timed_out {
                    Self::Timeout {
                        operation,
                        source: other,
                    }
                } else {
                    Self::CommunicationFailure {
                        operation,
                        source: other,
                    }
                }
            }
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::during("talk to the firewall", err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { field } => Self::MissingSetting {
                field,
                env: field.to_uppercase(),
                path: opnbridge_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { host } => Self::NoCredentials { host },
            other => Self::Config(other),
        }
    }
}

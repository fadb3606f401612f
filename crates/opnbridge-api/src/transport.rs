// Shared transport configuration for building reqwest::Client instances.
//
// The host process owns TLS and timeout decisions; the engine only ever
// receives the finished client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

/// TLS verification mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Trust an additional CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (firewalls ship self-signed by default).
    DangerAcceptInvalid,
}

/// Transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_millis(15_000),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// An unreadable or invalid CA file is not fatal: it is logged and the
    /// client falls back to the system roots.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("opnbridge/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => match load_ca(path) {
                Ok(cert) => builder = builder.add_root_certificate(cert),
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "failed to load CA certificate");
                }
            },
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

fn load_ca(path: &Path) -> Result<reqwest::Certificate, String> {
    let pem = std::fs::read(path).map_err(|e| format!("failed to read CA cert: {e}"))?;
    reqwest::Certificate::from_pem(&pem).map_err(|e| format!("invalid CA cert: {e}"))
}

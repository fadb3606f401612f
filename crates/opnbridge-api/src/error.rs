use thiserror::Error;

/// Top-level error type for the `opnbridge-api` crate.
///
/// Covers every failure mode of the firewall API surface: transport,
/// HTTP status classes, and payload decoding. `opnbridge-core` wraps these
/// without rewriting them so the root cause always survives.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No response was received (connection refused/reset, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP status ─────────────────────────────────────────────────
    /// The firewall answered with a 5xx status.
    #[error("HTTP {status} {reason}")]
    Server { status: u16, reason: String },

    /// The firewall answered with a 4xx status (bad uuid, missing privilege, ...).
    #[error("HTTP {status} {reason}")]
    Rejected {
        status: u16,
        reason: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The payload parsed, but not into any shape the endpoint is known to return.
    #[error("Unexpected response shape from {endpoint}")]
    UnexpectedPayload { endpoint: &'static str },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Network-level failures (no response at all) and 5xx answers are
    /// transient. Anything the firewall deliberately answered with a 4xx,
    /// and anything we failed to decode, is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                !e.is_builder()
                    && !e.is_redirect()
                    && !e.is_decode()
                    && e.status().is_none_or(|s| s.is_server_error())
            }
            Self::Server { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Server { status, .. } | Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Server {
            status: 502,
            reason: "Bad Gateway".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn client_errors_are_final() {
        let err = Error::Rejected {
            status: 404,
            reason: "Not Found".into(),
            body: String::new(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn decode_failures_are_final() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.status(), None);
    }
}

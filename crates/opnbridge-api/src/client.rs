// OPNsense API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, basic auth, and status
// classification. Endpoint groups (firewall filter, gateways) are inherent
// methods in separate files to keep this module focused on transport mechanics.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// API key + secret pair, sent as HTTP basic auth on every request.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: SecretString,
}

/// HTTP client for the firewall's REST API.
///
/// Statuses 2xx are successes, 4xx become [`Error::Rejected`], and 5xx become
/// [`Error::Server`]. Callers never see a raw `reqwest::Response`.
pub struct OpnClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<ApiCredentials>,
}

impl OpnClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the firewall root (e.g. `https://192.168.1.1:8443`).
    pub fn new(
        base_url: Url,
        credentials: Option<ApiCredentials>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Create a client for `https://{host}`, where `host` may carry a port.
    pub fn for_host(
        host: &str,
        credentials: Option<ApiCredentials>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("https://{host}"))?;
        Self::new(base_url, credentials, transport)
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<ApiCredentials>,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// The firewall base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL for an absolute API path such as `/api/firewall/filter/apply`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.key, Some(creds.secret.expose_secret())),
            None => builder,
        }
    }

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {url}");

        let resp = self.authorize(self.http.get(url)).send().await?;
        let body = Self::check_status(resp).await?;
        decode(body)
    }

    /// Send a GET request, accepting any body shape.
    pub(crate) async fn get_opaque(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = self.api_url(path)?;
        debug!("GET {url}");

        let resp = self.authorize(self.http.get(url)).send().await?;
        let body = Self::check_status(resp).await?;
        Ok(decode_opaque(body))
    }

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url).json(body)).send().await?;
        let body = Self::check_status(resp).await?;
        decode(body)
    }

    /// Send a POST request, optionally with a JSON body, accepting any response body.
    pub(crate) async fn post_opaque(
        &self,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<serde_json::Value, Error> {
        let url = self.api_url(path)?;
        debug!("POST {url}");

        let mut builder = self.http.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = self.authorize(builder).send().await?;
        let body = Self::check_status(resp).await?;
        Ok(decode_opaque(body))
    }

    /// Classify the response status and return the body text on 2xx.
    async fn check_status(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let reason = status.canonical_reason().unwrap_or_default().to_owned();

        if status.is_server_error() {
            return Err(Error::Server {
                status: status.as_u16(),
                reason,
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                reason,
                body: body.chars().take(200).collect(),
            });
        }

        Ok(resp.text().await?)
    }
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Mutating endpoints answer with a small status object, an empty body, or
/// occasionally plain text. None of that is an error.
fn decode_opaque(body: String) -> serde_json::Value {
    if body.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body))
}

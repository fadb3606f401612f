//! Configuration for the OPNsense bridge.
//!
//! A TOML file (platform config dir or an explicit path) layered under
//! `OPNBRIDGE_`-prefixed environment variables, credential resolution
//! (env var + keyring + plaintext), and translation into the runtime
//! `BridgeConfig` / `TransportConfig` the engine and client consume.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use opnbridge_api::{ApiCredentials, OpnClient, TlsMode, TransportConfig};
use opnbridge_core::{BridgeConfig, GatewayConfig, RuleSwitch, SensorKind, StatusMethod};

/// Keyring service name; entries are `{host}/api-secret`.
pub const KEYRING_SERVICE: &str = "opnbridge";
pub const ENV_PREFIX: &str = "OPNBRIDGE_";

/// Section names older configs used, mapped to their current key.
const LEGACY_SECTIONS: &[(&str, &str)] = &[
    ("certificate Settings", "certificates"),
    ("Gateways", "gateways"),
];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{field}'")]
    Missing { field: &'static str },

    #[error("no API secret found for host '{host}'")]
    NoCredentials { host: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("could not build API client: {0}")]
    Client(#[from] opnbridge_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Label for this firewall in logs and output.
    #[serde(default = "default_name")]
    pub name: String,

    /// Firewall host, optionally with port (e.g. `192.168.1.1:8443`).
    pub host: Option<String>,

    pub api_key: Option<String>,

    /// API secret (plaintext; prefer keyring or `api_secret_env`).
    pub api_secret: Option<String>,

    /// Environment variable holding the API secret.
    pub api_secret_env: Option<String>,

    #[serde(default)]
    pub certificates: Certificates,

    /// Commit filter changes after every toggle.
    #[serde(default)]
    pub apply_after_toggle: bool,

    #[serde(default)]
    pub status_method: StatusMethod,

    /// Milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Milliseconds.
    #[serde(default = "default_status_ttl")]
    pub status_ttl: u64,

    /// Seconds between rule polls. 0 disables polling.
    #[serde(default)]
    pub poll_interval: u64,

    #[serde(default)]
    pub switches: Vec<SwitchEntry>,

    #[serde(default)]
    pub gateways: GatewaySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: None,
            api_key: None,
            api_secret: None,
            api_secret_env: None,
            certificates: Certificates::default(),
            apply_after_toggle: false,
            status_method: StatusMethod::default(),
            request_timeout: default_request_timeout(),
            status_ttl: default_status_ttl(),
            poll_interval: 0,
            switches: Vec::new(),
            gateways: GatewaySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Certificates {
    /// Verify the firewall's certificate. Off by default: firewalls ship self-signed.
    #[serde(default)]
    pub verify_tls: bool,

    /// Extra CA certificate (PEM) to trust when verifying.
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
}

/// One rule exposed as a switch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchEntry {
    #[serde(default = "default_switch_name")]
    pub name: String,

    #[serde(default, alias = "ruleUuid")]
    pub rule_uuid: Option<String>,

    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds; values below 5 are raised to 5.
    #[serde(default = "default_gateway_poll_interval")]
    pub poll_interval: u64,

    /// `contact` or `occupancy`.
    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,

    /// Only expose these gateway names. Empty exposes all.
    #[serde(default)]
    pub include: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: default_gateway_poll_interval(),
            sensor_type: default_sensor_type(),
            include: Vec::new(),
        }
    }
}

fn default_name() -> String {
    "OPNsense".into()
}
fn default_request_timeout() -> u64 {
    15_000
}
fn default_status_ttl() -> u64 {
    3_000
}
fn default_switch_name() -> String {
    RuleSwitch::DEFAULT_NAME.into()
}
fn default_gateway_poll_interval() -> u64 {
    30
}
fn default_sensor_type() -> String {
    "occupancy".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "opnbridge", "opnbridge").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("opnbridge");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from file + environment.
///
/// An explicit `path` must exist. Without one, the platform default is
/// used if present and skipped otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let explicit = path.is_some();
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    match read_table(&path) {
        Ok(table) => {
            debug!(path = %path.display(), "loaded config file");
            figment = figment.merge(Serialized::defaults(table));
        }
        Err(ConfigError::NotFound { .. }) if !explicit => {
            debug!(path = %path.display(), "no config file, using defaults");
        }
        Err(e) => return Err(e),
    }

    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

/// Parse a TOML file, renaming legacy section names to current keys.
fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io(e),
    })?;

    let mut table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for (legacy, current) in LEGACY_SECTIONS {
        if let Some(section) = table.remove(*legacy) {
            table.entry(*current).or_insert(section);
        }
    }
    Ok(table)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the API secret: `api_secret_env` variable, then the system
/// keyring, then the plaintext value.
pub fn resolve_api_secret(cfg: &Config, host: &str) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref env_name) = cfg.api_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
        debug!(var = %env_name, "api_secret_env is set but the variable is not");
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{host}/api-secret")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = cfg.api_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials { host: host.into() })
}

// ── Translation to runtime config ───────────────────────────────────

/// Everything needed to construct a client and a bridge.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub bridge: BridgeConfig,
    pub transport: TransportConfig,
    pub credentials: ApiCredentials,
}

impl Resolved {
    /// Build the API client for `https://{host}`.
    pub fn client(&self) -> Result<OpnClient, ConfigError> {
        Ok(OpnClient::for_host(
            &self.bridge.host,
            Some(self.credentials.clone()),
            &self.transport,
        )?)
    }
}

/// Validate the config and resolve credentials.
pub fn resolve(cfg: &Config) -> Result<Resolved, ConfigError> {
    let host = required(cfg.host.as_deref(), "host")?;
    let key = required(cfg.api_key.as_deref(), "api_key")?;
    let secret = resolve_api_secret(cfg, host)?;

    Ok(Resolved {
        name: cfg.name.clone(),
        bridge: to_bridge_config(cfg)?,
        transport: to_transport_config(cfg),
        credentials: ApiCredentials {
            key: key.to_owned(),
            secret,
        },
    })
}

/// Engine settings. Switches without a rule uuid are skipped with a warning.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let host = required(cfg.host.as_deref(), "host")?;

    let mut seen = HashSet::new();
    let mut switches = Vec::with_capacity(cfg.switches.len());
    for entry in &cfg.switches {
        let Some(rule_uuid) = entry.rule_uuid.as_deref().map(str::trim).filter(|u| !u.is_empty())
        else {
            warn!(switch = %entry.name, "switch has no rule_uuid, skipping");
            continue;
        };
        if !seen.insert(rule_uuid.to_owned()) {
            warn!(switch = %entry.name, rule = rule_uuid, "rule already configured, skipping duplicate");
            continue;
        }
        switches.push(RuleSwitch {
            rule_uuid: rule_uuid.to_owned(),
            name: entry.name.clone(),
            invert: entry.invert,
            status_method: cfg.status_method,
            apply_after_toggle: cfg.apply_after_toggle,
        });
    }

    Ok(BridgeConfig {
        host: host.to_owned(),
        switches,
        status_ttl: millis_or_default("status_ttl", cfg.status_ttl, default_status_ttl()),
        poll_interval: Duration::from_secs(cfg.poll_interval),
        gateways: to_gateway_config(&cfg.gateways),
        ..BridgeConfig::default()
    })
}

fn to_gateway_config(settings: &GatewaySettings) -> GatewayConfig {
    let sensor_kind = SensorKind::from_str(settings.sensor_type.trim()).unwrap_or_else(|_| {
        warn!(sensor_type = %settings.sensor_type, "unknown sensor_type, using occupancy");
        SensorKind::Occupancy
    });
    let include = (!settings.include.is_empty())
        .then(|| settings.include.iter().cloned().collect::<HashSet<_>>());

    GatewayConfig {
        enabled: settings.enabled,
        poll_interval: Duration::from_secs(settings.poll_interval),
        sensor_kind,
        include,
    }
}

/// TLS mode and timeout for the HTTP client.
pub fn to_transport_config(cfg: &Config) -> TransportConfig {
    let certs = &cfg.certificates;
    let tls = if !certs.verify_tls {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca) = certs.ca_path {
        TlsMode::CustomCa(ca.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        timeout: millis_or_default(
            "request_timeout",
            cfg.request_timeout,
            default_request_timeout(),
        ),
    }
}

/// Zero means "unset" for millisecond settings.
fn millis_or_default(field: &str, value: u64, default: u64) -> Duration {
    if value == 0 {
        warn!(field, default_ms = default, "zero is not a valid duration, using default");
        Duration::from_millis(default)
    } else {
        Duration::from_millis(value)
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { field })
}

#![allow(clippy::unwrap_used)]
// Config loading tests. Every test that reads the environment runs inside
// a figment `Jail`, which serializes them and restores env and cwd.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use opnbridge_api::TlsMode;
use opnbridge_config::{ConfigError, load_config, resolve, to_bridge_config};
use opnbridge_core::{SensorKind, StatusMethod};

const FULL_CONFIG: &str = r#"
name = "Home firewall"
host = "192.168.1.1:8443"
api_key = "key"
api_secret = "plain-secret"
apply_after_toggle = true
status_method = "searchRule"
request_timeout = 5000
status_ttl = 1500
poll_interval = 20

[[switches]]
name = "Kids WiFi"
rule_uuid = "r1"

[[switches]]
name = "Block Guests"
ruleUuid = "r2"
invert = true

[[switches]]
name = "Forgot the uuid"

["certificate Settings"]
verify_tls = true
ca_path = "/etc/ssl/fw.pem"

[Gateways]
enabled = true
poll_interval = 2
sensor_type = "contact"
include = ["WAN_DHCP"]
"#;

fn jailed<F>(f: F)
where
    F: FnOnce(&mut Jail) -> Result<(), String>,
{
    Jail::expect_with(|jail| f(jail).map_err(figment::Error::from));
}

#[test]
fn test_full_config_translates() {
    jailed(|jail| {
        jail.create_file("opnbridge.toml", FULL_CONFIG)
            .map_err(|e| e.to_string())?;
        let cfg = load_config(Some(Path::new("opnbridge.toml"))).map_err(|e| e.to_string())?;
        let resolved = resolve(&cfg).map_err(|e| e.to_string())?;

        assert_eq!(resolved.name, "Home firewall");
        assert_eq!(resolved.credentials.key, "key");
        assert_eq!(resolved.credentials.secret.expose_secret(), "plain-secret");
        assert_eq!(resolved.transport.tls, TlsMode::CustomCa("/etc/ssl/fw.pem".into()));
        assert_eq!(resolved.transport.timeout, Duration::from_millis(5000));

        let bridge = &resolved.bridge;
        assert_eq!(bridge.host, "192.168.1.1:8443");
        assert_eq!(bridge.status_ttl, Duration::from_millis(1500));
        assert_eq!(bridge.poll_interval, Duration::from_secs(20));

        let uuids: Vec<&str> = bridge.switches.iter().map(|s| s.rule_uuid.as_str()).collect();
        assert_eq!(uuids, ["r1", "r2"]);
        assert!(bridge.switches[1].invert);
        assert!(bridge.switches.iter().all(|s| s.apply_after_toggle));
        assert!(bridge.switches.iter().all(|s| s.status_method == StatusMethod::SearchRule));

        let gw = &bridge.gateways;
        assert!(gw.enabled);
        assert_eq!(gw.sensor_kind, SensorKind::Contact);
        assert_eq!(gw.effective_poll_interval(), Duration::from_secs(5));
        assert!(gw.includes("WAN_DHCP"));
        assert!(!gw.includes("WAN2"));
        Ok(())
    });
}

#[test]
fn test_minimal_config_uses_defaults() {
    jailed(|jail| {
        jail.create_file(
            "opnbridge.toml",
            "host = \"fw.lan\"\n[[switches]]\nrule_uuid = \"r1\"\n",
        )
        .map_err(|e| e.to_string())?;
        let cfg = load_config(Some(Path::new("opnbridge.toml"))).map_err(|e| e.to_string())?;
        let bridge = to_bridge_config(&cfg).map_err(|e| e.to_string())?;

        assert_eq!(bridge.switches[0].name, "OPNsense Rule");
        assert!(!bridge.switches[0].apply_after_toggle);
        assert_eq!(bridge.status_ttl, Duration::from_secs(3));
        assert_eq!(bridge.poll_interval, Duration::ZERO);
        assert!(!bridge.gateways.enabled);
        assert_eq!(bridge.gateways.sensor_kind, SensorKind::Occupancy);
        assert_eq!(bridge.gateways.include, None);
        assert_eq!(
            opnbridge_config::to_transport_config(&cfg).tls,
            TlsMode::DangerAcceptInvalid
        );
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    jailed(|jail| {
        jail.create_file("opnbridge.toml", "host = \"fw.lan\"\napi_key = \"file-key\"\n")
            .map_err(|e| e.to_string())?;
        jail.set_env("OPNBRIDGE_API_KEY", "env-key");
        jail.set_env("OPNBRIDGE_GATEWAYS__ENABLED", "true");
        jail.set_env("OPNBRIDGE_POLL_INTERVAL", "15");

        let cfg = load_config(Some(Path::new("opnbridge.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(cfg.api_key.as_deref(), Some("env-key"));
        assert_eq!(cfg.host.as_deref(), Some("fw.lan"));
        assert!(cfg.gateways.enabled);
        assert_eq!(cfg.gateways.poll_interval, 30);
        assert_eq!(cfg.poll_interval, 15);
        Ok(())
    });
}

#[test]
fn test_secret_env_var_wins_over_plaintext() {
    jailed(|jail| {
        jail.create_file(
            "opnbridge.toml",
            "host = \"fw.lan\"\napi_key = \"key\"\napi_secret = \"plain\"\napi_secret_env = \"FW_SECRET\"\n",
        )
        .map_err(|e| e.to_string())?;
        jail.set_env("FW_SECRET", "from-env");

        let cfg = load_config(Some(Path::new("opnbridge.toml"))).map_err(|e| e.to_string())?;
        let resolved = resolve(&cfg).map_err(|e| e.to_string())?;
        assert_eq!(resolved.credentials.secret.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn test_missing_api_key_is_fatal() {
    jailed(|jail| {
        jail.create_file("opnbridge.toml", "host = \"fw.lan\"\napi_secret = \"s\"\n")
            .map_err(|e| e.to_string())?;
        let cfg = load_config(Some(Path::new("opnbridge.toml"))).map_err(|e| e.to_string())?;
        let err = resolve(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "api_key" }));
        assert_eq!(err.to_string(), "missing required setting 'api_key'");
        Ok(())
    });
}

#[test]
fn test_explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn test_malformed_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "host = \n").unwrap();

    let err = load_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.toml"));
}

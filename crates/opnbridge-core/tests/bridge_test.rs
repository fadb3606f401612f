#![allow(clippy::unwrap_used)]
// Lifecycle tests: polling, start and shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opnbridge_core::{Bridge, BridgeConfig, GatewayConfig, RuleSwitch};

use common::{RecordingPresenter, bridge_for, client_for, fast_retry};

#[tokio::test]
async fn test_poll_pushes_presented_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/firewall/filter/getRule/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rule": {"enabled": "1"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/firewall/filter/getRule/r2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rule": {"enabled": "1"}})))
        .mount(&server)
        .await;

    let mut inverted = RuleSwitch::new("r2", "Block Guests");
    inverted.invert = true;
    let presenter = Arc::new(RecordingPresenter::default());
    let bridge = bridge_for(
        &server,
        vec![RuleSwitch::new("r1", "Kids WiFi"), inverted],
        presenter.clone(),
    );

    assert_eq!(bridge.poll_rules_once().await, 2);
    assert_eq!(presenter.current("r1"), Some(true));
    assert_eq!(presenter.current("r2"), Some(false));
    assert_eq!(bridge.rules().cache().get_fresh("r2"), Some(true));
}

#[tokio::test]
async fn test_failed_poll_leaves_presentation_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let presenter = Arc::new(RecordingPresenter::default());
    let bridge = bridge_for(&server, vec![RuleSwitch::new("r1", "x")], presenter.clone());
    bridge.presenter().set_on("r1", true);

    assert_eq!(bridge.poll_rules_once().await, 0);
    assert_eq!(presenter.history().len(), 1);
    assert_eq!(presenter.current("r1"), Some(true));
}

#[tokio::test]
async fn test_start_reconciles_gateways_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/routes/gateway/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "WAN", "status": "none" }]
        })))
        .mount(&server)
        .await;

    let config = BridgeConfig {
        host: "fw.lan".into(),
        retry: fast_retry(),
        gateways: GatewayConfig {
            enabled: true,
            poll_interval: Duration::from_secs(60),
            ..GatewayConfig::default()
        },
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(
        config,
        client_for(&server),
        Arc::new(RecordingPresenter::default()),
    );
    let mut tracked = bridge.gateways().watch();

    bridge.start().await;
    tokio::time::timeout(Duration::from_secs(5), tracked.wait_for(|snap| !snap.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert!(bridge.gateways().get("WAN").is_some());

    bridge.shutdown().await;
    assert!(bridge.is_stopped());
}

#[tokio::test]
async fn test_stopped_bridge_schedules_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rule": {"enabled": "1"}})))
        .expect(0)
        .mount(&server)
        .await;

    let config = BridgeConfig {
        host: "fw.lan".into(),
        switches: vec![RuleSwitch::new("r1", "x")],
        poll_interval: Duration::from_millis(20),
        gateways: GatewayConfig {
            enabled: true,
            ..GatewayConfig::default()
        },
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(
        config,
        client_for(&server),
        Arc::new(RecordingPresenter::default()),
    );

    bridge.stop();
    bridge.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    bridge.shutdown().await;
}

#[tokio::test]
async fn test_stop_ends_running_rule_poller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/firewall/filter/getRule/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rule": {"enabled": "1"}})))
        .mount(&server)
        .await;

    let config = BridgeConfig {
        host: "fw.lan".into(),
        switches: vec![RuleSwitch::new("r1", "x")],
        poll_interval: Duration::from_millis(20),
        retry: fast_retry(),
        ..BridgeConfig::default()
    };
    let presenter = Arc::new(RecordingPresenter::default());
    let bridge = Bridge::new(config, client_for(&server), presenter.clone());

    bridge.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    bridge.stop();
    bridge.shutdown().await;

    let polled = server.received_requests().await.unwrap().len();
    assert!(polled > 0, "poller never ran");
    assert_eq!(presenter.current("r1"), Some(true));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), polled);

    // Stop is final.
    bridge.start().await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), polled);
}

#[tokio::test]
async fn test_legacy_id_tracks_name() {
    let server = MockServer::start().await;
    let presenter = Arc::new(RecordingPresenter::default());
    let bridge = bridge_for(&server, vec![RuleSwitch::new("r1", "Kids WiFi")], presenter);
    let switch = bridge.switch("r1").unwrap();

    let renamed = RuleSwitch::new("r1", "Block Kids");
    assert_ne!(bridge.switch_legacy_id(switch), bridge.switch_legacy_id(&renamed));
    assert_ne!(bridge.switch_legacy_id(switch), bridge.switch_id(switch));
}

#[tokio::test]
async fn test_switch_ids_are_stable_across_renames() {
    let server = MockServer::start().await;
    let presenter = Arc::new(RecordingPresenter::default());
    let bridge = bridge_for(&server, vec![RuleSwitch::new("r1", "Kids WiFi")], presenter);

    let renamed = RuleSwitch::new("r1", "Block Kids");
    assert_eq!(bridge.switch_id(bridge.switch("r1").unwrap()), bridge.switch_id(&renamed));
}

// Shared fixtures for the core integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use wiremock::MockServer;

use opnbridge_api::{ApiCredentials, OpnClient};
use opnbridge_core::{
    Bridge, BridgeConfig, RetryPolicy, RuleStateService, RuleSwitch, StatusCache, SwitchPresenter,
};

/// Presenter that remembers every push.
#[derive(Default)]
pub struct RecordingPresenter {
    current: Mutex<HashMap<String, bool>>,
    history: Mutex<Vec<(String, bool)>>,
}

impl RecordingPresenter {
    pub fn history(&self) -> Vec<(String, bool)> {
        self.history.lock().unwrap().clone()
    }

    pub fn current(&self, rule_uuid: &str) -> Option<bool> {
        self.current.lock().unwrap().get(rule_uuid).copied()
    }
}

impl SwitchPresenter for RecordingPresenter {
    fn set_on(&self, rule_uuid: &str, on: bool) {
        self.current.lock().unwrap().insert(rule_uuid.to_owned(), on);
        self.history.lock().unwrap().push((rule_uuid.to_owned(), on));
    }

    fn last_observed(&self, rule_uuid: &str) -> Option<bool> {
        self.current(rule_uuid)
    }
}

pub fn client_for(server: &MockServer) -> OpnClient {
    let creds = ApiCredentials {
        key: "key".into(),
        secret: "secret".to_string().into(),
    };
    OpnClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Some(creds),
    )
}

/// Retry policy with short delays so failure paths stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
    }
}

pub fn service_for(server: &MockServer, ttl: Duration) -> RuleStateService {
    RuleStateService::new(
        Arc::new(client_for(server)),
        StatusCache::new(ttl),
        fast_retry(),
    )
}

pub fn bridge_for(
    server: &MockServer,
    switches: Vec<RuleSwitch>,
    presenter: Arc<RecordingPresenter>,
) -> Bridge {
    let config = BridgeConfig {
        host: "fw.lan".into(),
        switches,
        retry: fast_retry(),
        ..BridgeConfig::default()
    };
    Bridge::new(config, client_for(server), presenter)
}

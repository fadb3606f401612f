// Firewall filter endpoints
//
// Rule lookup, search, toggle, and the apply/commit call. Toggle and apply
// answer with small status objects whose shape varies by firmware; they
// are returned as raw JSON for logging only.

use serde_json::Value;
use tracing::debug;

use crate::client::OpnClient;
use crate::error::Error;
use crate::models::{RuleLookup, SearchRuleRequest, SearchRuleResponse};

impl OpnClient {
    /// Fetch a single rule by uuid.
    ///
    /// `GET /api/firewall/filter/getRule/{uuid}`
    pub async fn get_rule(&self, rule_uuid: &str) -> Result<RuleLookup, Error> {
        debug!(rule = rule_uuid, "fetching rule");
        self.get(&format!("/api/firewall/filter/getRule/{rule_uuid}"))
            .await
    }

    /// Search rules by phrase (unpaginated).
    ///
    /// `POST /api/firewall/filter/searchRule`
    pub async fn search_rules(&self, phrase: &str) -> Result<SearchRuleResponse, Error> {
        debug!(phrase, "searching rules");
        self.post(
            "/api/firewall/filter/searchRule",
            &SearchRuleRequest::for_phrase(phrase),
        )
        .await
    }

    /// Flip a rule's enabled flag. The endpoint toggles; it does not set.
    ///
    /// `POST /api/firewall/filter/toggleRule/{uuid}`
    pub async fn toggle_rule(&self, rule_uuid: &str) -> Result<Value, Error> {
        debug!(rule = rule_uuid, "toggling rule");
        self.post_opaque(
            &format!("/api/firewall/filter/toggleRule/{rule_uuid}"),
            None::<&()>,
        )
        .await
    }

    /// Commit pending filter changes to the running ruleset.
    ///
    /// `POST /api/firewall/filter/apply`
    pub async fn apply_filter(&self) -> Result<Value, Error> {
        debug!("applying filter changes");
        self.post_opaque(
            "/api/firewall/filter/apply",
            Some(&serde_json::Map::<String, Value>::new()),
        )
        .await
    }
}

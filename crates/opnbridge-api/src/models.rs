// Wire types for the firewall filter endpoints.
//
// The `enabled` flag arrives as "1"/"0", 1/0, or true/false depending on
// firmware and endpoint, so it is kept as a raw JSON value here. Deciding
// what a value means is the engine's job, not the transport's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `GET /api/firewall/filter/getRule/{uuid}`: `{ "rule": { "enabled": ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleLookup {
    #[serde(default)]
    pub rule: Option<Value>,
}

impl RuleLookup {
    /// The raw `rule.enabled` value.
    ///
    /// `None` means the field (or the whole rule object) is absent; a JSON
    /// `null` is returned as `Some(Value::Null)` so callers can tell the two apart.
    pub fn enabled(&self) -> Option<&Value> {
        self.rule.as_ref()?.get("enabled")
    }
}

/// Body of `POST /api/firewall/filter/searchRule`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRuleRequest {
    pub current: u32,
    pub row_count: i32,
    pub sort: serde_json::Map<String, Value>,
    pub search_phrase: String,
}

impl SearchRuleRequest {
    /// Unpaginated search for a single phrase (usually the rule uuid).
    pub fn for_phrase(phrase: impl Into<String>) -> Self {
        Self {
            current: 1,
            row_count: -1,
            sort: serde_json::Map::new(),
            search_phrase: phrase.into(),
        }
    }
}

/// Response of `searchRule`: `{ "rows": [...] }`. A missing or null `rows` is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRuleResponse {
    #[serde(default)]
    rows: Option<Vec<RuleRow>>,
}

impl SearchRuleResponse {
    pub fn rows(&self) -> &[RuleRow] {
        self.rows.as_deref().unwrap_or_default()
    }
}

/// One row of a rule search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleRow {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub enabled: Option<Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enabled_distinguishes_missing_from_null() {
        let missing: RuleLookup = serde_json::from_value(json!({"rule": {}})).unwrap();
        assert!(missing.enabled().is_none());

        let null: RuleLookup = serde_json::from_value(json!({"rule": {"enabled": null}})).unwrap();
        assert_eq!(null.enabled(), Some(&Value::Null));

        let no_rule: RuleLookup = serde_json::from_value(json!({})).unwrap();
        assert!(no_rule.enabled().is_none());
    }

    #[test]
    fn search_request_uses_camel_case() {
        let body = serde_json::to_value(SearchRuleRequest::for_phrase("r1")).unwrap();
        assert_eq!(
            body,
            json!({"current": 1, "rowCount": -1, "sort": {}, "searchPhrase": "r1"})
        );
    }

    #[test]
    fn null_rows_are_empty() {
        let resp: SearchRuleResponse = serde_json::from_value(json!({"rows": null})).unwrap();
        assert!(resp.rows().is_empty());
    }
}

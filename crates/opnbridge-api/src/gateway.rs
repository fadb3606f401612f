// Gateway listing endpoints
//
// Two views of the same gateways: the live status endpoint (with delay/loss
// metrics) and the routing settings search (configuration only). Firmware
// versions wrap the row array under different keys, so rows stay raw JSON.

use serde_json::Value;

use crate::client::OpnClient;
use crate::error::Error;

const STATUS_PATH: &str = "/api/routes/gateway/status";
const SEARCH_PATH: &str = "/api/routing/settings/searchGateway";

/// Keys the status endpoint has been seen to wrap its rows under.
const STATUS_ROW_KEYS: &[&str] = &["items", "rows", "data", "gateways"];
/// Keys the settings search wraps its rows under.
const SEARCH_ROW_KEYS: &[&str] = &["rows", "data"];

impl OpnClient {
    /// Live gateway status rows.
    ///
    /// `GET /api/routes/gateway/status`
    pub async fn gateway_status(&self) -> Result<Vec<Value>, Error> {
        let payload = self.get_opaque(STATUS_PATH).await?;
        extract_rows(payload, STATUS_ROW_KEYS).ok_or(Error::UnexpectedPayload {
            endpoint: STATUS_PATH,
        })
    }

    /// Configured gateway rows (may lack live metrics).
    ///
    /// `GET /api/routing/settings/searchGateway`
    pub async fn search_gateways(&self) -> Result<Vec<Value>, Error> {
        let payload = self.get_opaque(SEARCH_PATH).await?;
        extract_rows(payload, SEARCH_ROW_KEYS).ok_or(Error::UnexpectedPayload {
            endpoint: SEARCH_PATH,
        })
    }
}

/// Pull the row array out of a listing payload.
///
/// A bare array is the rows. An object yields the first listed key holding an
/// array, or no rows if none does. Anything else (null, text) is unrecognized.
fn extract_rows(payload: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match payload {
        Value::Array(rows) => Some(rows),
        Value::Object(mut map) => Some(
            keys.iter()
                .find_map(|k| match map.remove(*k) {
                    Some(Value::Array(rows)) => Some(rows),
                    _ => None,
                })
                .unwrap_or_default(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array_is_rows() {
        let rows = extract_rows(json!([{"name": "WAN"}]), STATUS_ROW_KEYS);
        assert_eq!(rows.map(|r| r.len()), Some(1));
    }

    #[test]
    fn wrapped_rows_follow_key_precedence() {
        let payload = json!({"status": "ok", "rows": [{"name": "A"}], "items": [{"name": "B"}, {"name": "C"}]});
        let rows = extract_rows(payload, STATUS_ROW_KEYS).unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "B");
    }

    #[test]
    fn object_without_rows_is_empty() {
        assert_eq!(
            extract_rows(json!({"status": "ok"}), STATUS_ROW_KEYS),
            Some(vec![])
        );
    }

    #[test]
    fn text_payload_is_unrecognized() {
        assert_eq!(extract_rows(json!("<html>"), SEARCH_ROW_KEYS), None);
        assert_eq!(extract_rows(Value::Null, SEARCH_ROW_KEYS), None);
    }
}

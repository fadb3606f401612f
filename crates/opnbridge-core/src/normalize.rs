// ── Gateway status normalization ──
//
// Maps a heterogeneous gateway status row to a single online/offline
// verdict. Firmware versions report state through different fields, so
// the rules below are tried in order and the first one that recognizes
// its field decides. A row no rule recognizes is online.

use serde_json::Value;

/// One way of reading a gateway's online state from a status row.
#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub name: &'static str,
    resolve: fn(&Value) -> Option<bool>,
}

impl StatusRule {
    pub fn resolve(&self, row: &Value) -> Option<bool> {
        (self.resolve)(row)
    }
}

/// Precedence order: translated status, raw status, packet loss.
pub const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        name: "status_translated",
        resolve: from_translated,
    },
    StatusRule {
        name: "status",
        resolve: from_status,
    },
    StatusRule {
        name: "loss",
        resolve: from_loss,
    },
];

/// Outcome of normalizing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub online: bool,
    /// Name of the deciding rule, or `"default"`.
    pub rule: &'static str,
}

pub fn normalize(row: &Value) -> Verdict {
    STATUS_RULES
        .iter()
        .find_map(|rule| {
            rule.resolve(row).map(|online| Verdict {
                online,
                rule: rule.name,
            })
        })
        .unwrap_or(Verdict {
            online: true,
            rule: "default",
        })
}

// ── Field readers ────────────────────────────────────────────────────

/// Field as text. Falsy values (missing, null, false, 0, "") read as empty.
fn text(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|x| x.abs() > 0.0) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_owned(),
        _ => String::new(),
    }
}

/// Field as trimmed lowercase text.
fn token(row: &Value, key: &str) -> String {
    text(row, key).trim().to_ascii_lowercase()
}

fn from_translated(row: &Value) -> Option<bool> {
    match token(row, "status_translated").as_str() {
        "online" => Some(true),
        "offline" => Some(false),
        _ => None,
    }
}

fn from_status(row: &Value) -> Option<bool> {
    match token(row, "status").as_str() {
        "none" | "up" => Some(true),
        "down" | "alarm" | "unreachable" => Some(false),
        _ => None,
    }
}

fn from_loss(row: &Value) -> Option<bool> {
    let raw = match row.get("loss") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    let cleaned = raw.replacen('%', "", 1).replacen('~', "", 1);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    let loss: f64 = cleaned.parse().ok().filter(|n: &f64| !n.is_nan())?;
    Some(loss.abs() < f64::EPSILON)
}

// ── Identity and metadata ────────────────────────────────────────────

/// Gateway name: first non-empty of name, gateway, devname, tag, description.
pub fn gateway_name(row: &Value) -> Option<String> {
    ["name", "gateway", "devname", "tag", "description"]
        .iter()
        .map(|key| text(row, key))
        .find(|name| !name.is_empty())
}

/// A display field where `~` means "not set".
pub fn optional_field(row: &Value, key: &str) -> Option<String> {
    let value = text(row, key);
    (!value.is_empty() && value != "~").then_some(value)
}

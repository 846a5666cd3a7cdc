//! Reply normalization: raw provider text in, canonical [`ChatReply`] out.
//!
//! Providers are inconsistent about JSON: some honour the forced-JSON flag, some wrap the
//! object in a code fence, some chat around it, some truncate it. `normalize_reply` runs a
//! fixed cascade and always returns non-empty text. It is pure and never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Returned when nothing usable survives the cascade.
pub const UNPARSEABLE_PLACEHOLDER: &str = "Sorry, I could not understand the response.";

/// Fields that carry the reply text, in priority order.
const TEXT_FIELDS: [&str; 3] = ["text", "response", "message"];

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid fence regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The unit returned to the caller. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

impl ChatReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
        }
    }
}

/// Run the parsing cascade over `raw`.
pub fn normalize_reply(raw: &str) -> ChatReply {
    let unfenced = strip_fences(raw);
    let trimmed = unfenced.trim();

    // Whole payload is one object.
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(reply) = reply_from_object(&obj) {
            return reply;
        }
        let text = Value::Object(obj).to_string();
        tracing::debug!(target: "parley::response", "object without text field; using it verbatim");
        return ChatReply::text_only(text);
    }

    if let Some(first_open) = trimmed.find('{') {
        // First balanced object that parses wins; an unclosed `{` moves the scan on.
        let mut open = first_open;
        loop {
            if let Some(close) = balanced_object_end(trimmed, open) {
                if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&trimmed[open..=close]) {
                    if let Some(reply) = reply_from_object(&obj) {
                        return reply;
                    }
                    let before = strip_braces(&trimmed[..open]);
                    let after = strip_braces(&trimmed[close + 1..]);
                    tracing::debug!(target: "parley::response", "embedded object without text field; using prose");
                    let text = [before, after]
                        .into_iter()
                        .find(|s| !s.is_empty())
                        .unwrap_or_else(|| Value::Object(obj).to_string());
                    return ChatReply::text_only(text);
                }
            }
            match trimmed[open + 1..].find('{') {
                Some(next) => open += 1 + next,
                None => break,
            }
        }

        // Truncated or invalid object: keep the prose before it.
        let before = strip_braces(&trimmed[..first_open]);
        if !before.is_empty() {
            tracing::debug!(target: "parley::response", "unparseable object; using preceding prose");
            return ChatReply::text_only(before);
        }
    }

    let stripped = strip_braces(trimmed);
    if stripped.is_empty() {
        tracing::debug!(target: "parley::response", "empty reply after cascade");
        ChatReply::text_only(UNPARSEABLE_PLACEHOLDER)
    } else {
        ChatReply::text_only(stripped)
    }
}

/// `s` without braces or backticks, trimmed.
fn strip_braces(s: &str) -> String {
    let kept: String = s.chars().filter(|c| !matches!(c, '{' | '}' | '`')).collect();
    kept.trim().to_string()
}

fn strip_fences(raw: &str) -> String {
    FENCE_RE.replace_all(raw, "").into_owned()
}

/// Byte index of the `}` that closes the object opened at `open`, ignoring braces
/// inside JSON strings.
fn balanced_object_end(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[open..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn reply_from_object(obj: &Map<String, Value>) -> Option<ChatReply> {
    let text = TEXT_FIELDS.iter().find_map(|field| {
        obj.get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })?;
    Some(ChatReply {
        text: text.to_string(),
        intent: intent_from_object(obj),
    })
}

/// `intent` as object or string; otherwise `type` with `value`/`topic`; otherwise `topic`.
fn intent_from_object(obj: &Map<String, Value>) -> Option<Intent> {
    match obj.get("intent") {
        Some(Value::Object(inner)) => {
            if let Some(kind) = inner.get("type").and_then(scalar_to_string) {
                return Some(Intent {
                    kind,
                    value: inner.get("value").and_then(scalar_to_string),
                });
            }
        }
        Some(other) => {
            if let Some(kind) = scalar_to_string(other) {
                return Some(Intent { kind, value: None });
            }
        }
        None => {}
    }

    let value = obj
        .get("value")
        .and_then(scalar_to_string)
        .or_else(|| obj.get("topic").and_then(scalar_to_string));
    if let Some(kind) = obj.get("type").and_then(scalar_to_string) {
        return Some(Intent { kind, value });
    }
    obj.get("topic").and_then(scalar_to_string).map(|topic| Intent {
        kind: "topic".to_string(),
        value: Some(topic),
    })
}

fn scalar_to_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!s.is_empty()).then_some(s)
}

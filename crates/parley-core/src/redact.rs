//! Credential redaction for anything that ends up in logs or error messages.

use once_cell::sync::Lazy;
use regex::Regex;

static GEMINI_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_-]{20,}").expect("valid gemini key regex"));
static PREFIXED_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(sk|gsk)[-_][A-Za-z0-9_-]{16,}").expect("valid prefixed key regex"));
static QUERY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&](?:key|api_key)=)[^&\s]+").expect("valid query key regex"));
static BEARER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Bearer\s+[A-Za-z0-9._-]{16,}").expect("valid bearer regex"));
static GENERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(api[_-]?key|token|secret)["']?\s*[:=]\s*["']?[A-Za-z0-9_-]{16,}["']?"#)
        .expect("valid generic key regex")
});

/// Replace API keys, bearer tokens and `key=` query parameters with `REDACTED`.
pub fn redact_secrets(content: &str) -> String {
    let content = QUERY_KEY_RE.replace_all(content, "${1}REDACTED");
    let content = GEMINI_KEY_RE.replace_all(&content, "REDACTED");
    let content = PREFIXED_KEY_RE.replace_all(&content, "${1}-REDACTED");
    let content = BEARER_RE.replace_all(&content, "Bearer REDACTED");
    let content = GENERIC_RE.replace_all(&content, "$1: REDACTED");
    content.into_owned()
}

/// Shorten an upstream error body for logging.
pub fn log_snippet(content: &str, max_chars: usize) -> String {
    let redacted = redact_secrets(content);
    if redacted.chars().count() <= max_chars {
        return redacted;
    }
    let mut out: String = redacted.chars().take(max_chars).collect();
    out.push('…');
    out
}

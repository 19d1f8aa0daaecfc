use once_cell::sync::Lazy;
use regex::Regex;

// Greedy spans: first opening bracket to the last closing one, so prose
// around the payload and nested structures inside it are both handled.
static JSON_ARRAY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());

static JSON_OBJECT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

/// Widest `[...]` span in the text, if any.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    JSON_ARRAY_PATTERN.find(text).map(|m| m.as_str())
}

/// Widest `{...}` span in the text, if any.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT_PATTERN.find(text).map(|m| m.as_str())
}

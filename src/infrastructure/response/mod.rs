use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalises raw oracle text before any JSON is extracted from it.
///
/// Models behind the relay wrap payloads in markdown fences and occasionally
/// leak reasoning tags; both have to go before parsing is attempted.
pub fn clean_oracle_text(response: &str) -> String {
    let mut cleaned = response.to_string();

    cleaned = THINK_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    cleaned = strip_code_fence(&cleaned);

    cleaned = MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string();

    cleaned.trim().to_string()
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    if let Some(stripped) = trimmed.strip_prefix("```") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_unwraps_json_fence() {
        let input = "```json\n[{\"id\": 1}]\n```";
        assert_eq!(clean_oracle_text(input), "[{\"id\": 1}]");
    }

    #[test]
    fn test_clean_unwraps_bare_fence() {
        let input = "```\n[1, 2, 3]\n```";
        assert_eq!(clean_oracle_text(input), "[1, 2, 3]");
    }

    #[test]
    fn test_clean_strips_think_tags() {
        let input = "<think>planning the quiz</think>[{\"id\": 1}]";
        assert_eq!(clean_oracle_text(input), "[{\"id\": 1}]");
    }

    #[test]
    fn test_clean_strips_self_closing_think_tag() {
        let input = "<think />The explanation";
        assert_eq!(clean_oracle_text(input), "The explanation");
    }

    #[test]
    fn test_clean_strips_reasoning_tags() {
        let input = "<reasoning>scores</reasoning>{\"isCorrect\": true}";
        assert_eq!(clean_oracle_text(input), "{\"isCorrect\": true}");
    }

    #[test]
    fn test_clean_collapses_newline_runs() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_oracle_text(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn test_clean_preserves_plain_text() {
        let input = "Photosynthesis converts light energy into chemical energy.";
        assert_eq!(clean_oracle_text(input), input);
    }
}

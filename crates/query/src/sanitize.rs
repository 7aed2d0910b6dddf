//! Input sanitizing

use turf_advisor_config::constants::limits::MAX_QUESTION_CHARS;
use unicode_segmentation::UnicodeSegmentation;

use crate::{QueryError, Result};

/// Clean user input before anything else sees it.
///
/// Control characters become spaces, whitespace runs collapse to one space,
/// and the result is cut to [`MAX_QUESTION_CHARS`] graphemes.
pub fn sanitize_question(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return Err(QueryError::EmptyQuestion);
    }

    if collapsed.graphemes(true).count() <= MAX_QUESTION_CHARS {
        return Ok(collapsed);
    }

    let truncated: String = collapsed.graphemes(true).take(MAX_QUESTION_CHARS).collect();
    tracing::debug!(limit = MAX_QUESTION_CHARS, "Question truncated");
    Ok(truncated.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_and_controls() {
        assert_eq!(
            sanitize_question("  heritage\trate\n\n for\u{0007}  greens ").unwrap(),
            "heritage rate for greens"
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(sanitize_question(""), Err(QueryError::EmptyQuestion));
        assert_eq!(sanitize_question(" \n\t\u{0000} "), Err(QueryError::EmptyQuestion));
    }

    #[test]
    fn test_long_input_truncated() {
        let long = "a".repeat(MAX_QUESTION_CHARS + 500);
        assert_eq!(sanitize_question(&long).unwrap().len(), MAX_QUESTION_CHARS);
    }

    #[test]
    fn test_multibyte_truncation_keeps_valid_text() {
        let long = "é".repeat(MAX_QUESTION_CHARS + 10);
        let out = sanitize_question(&long).unwrap();
        assert_eq!(out.chars().count(), MAX_QUESTION_CHARS);
    }
}

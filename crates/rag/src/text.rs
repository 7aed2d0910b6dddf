//! Small text helpers shared by scoring, filtering and context assembly

use unicode_segmentation::UnicodeSegmentation;

/// Lowercased word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// The first `max_chars` characters of `text`, on a char boundary
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Whether any of `needles` occurs in `haystack` (both assumed lowercase)
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// First needle found in `haystack`
pub fn first_in<'a>(haystack: &str, needles: &[&'a str]) -> Option<&'a str> {
    needles.iter().copied().find(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_respects_char_boundaries() {
        assert_eq!(head("héllo", 2), "hé");
        assert_eq!(head("abc", 10), "abc");
        assert_eq!(head("", 3), "");
    }

    #[test]
    fn test_tokenize_splits_hyphens() {
        assert_eq!(tokenize("Take-all PATCH"), vec!["take", "all", "patch"]);
    }
}

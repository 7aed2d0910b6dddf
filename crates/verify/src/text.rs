//! Small text helpers shared by the checkers

pub(crate) fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Slice of `text` reaching `radius` bytes either side of `start..end`,
/// widened to the nearest char boundaries
pub(crate) fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let mut lo = start.saturating_sub(radius);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + radius).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// Byte offsets of every occurrence of `needle`
pub(crate) fn positions(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack.match_indices(needle).map(|(i, _)| i).collect()
}

pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_respects_char_boundaries() {
        let text = "apply at 85°F then heritage at 0.4 oz";
        let pos = text.find("heritage").unwrap();
        let w = window(text, pos, pos + 8, 9);
        assert!(w.contains("heritage"));
        assert!(w.starts_with('°') || w.starts_with('F') || w.starts_with('5'));
    }

    #[test]
    fn test_positions_and_title() {
        assert_eq!(positions("a heritage, b heritage", "heritage"), vec![2, 14]);
        assert_eq!(title_case("banner maxx"), "Banner Maxx");
    }
}

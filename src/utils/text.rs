// src/utils/text.rs

//! Plain-text helpers for HTML-bearing fields.

use scraper::Html;
use unicode_segmentation::UnicodeSegmentation;

/// Remove markup from an HTML fragment and collapse whitespace.
pub fn strip_markup(raw: &str) -> String {
    if !raw.contains('<') {
        return normalize_whitespace(raw);
    }
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    normalize_whitespace(&text)
}

/// Truncate to at most `max_len` grapheme clusters, marking the cut with `...`.
pub fn truncate_graphemes(text: &str, max_len: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max_len).collect();
    if graphemes.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<div><p>Hello</p> <i>world</i></div>"), "Hello world");
        assert_eq!(strip_markup("  plain\n text "), "plain text");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("abcdef", 3), "abc...");
        assert_eq!(truncate_graphemes("abc", 3), "abc");
        assert_eq!(truncate_graphemes("電子學公告", 2), "電子...");
    }
}

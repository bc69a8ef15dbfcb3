use regex::{Regex, RegexBuilder};

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Case-insensitive literal matcher for `query`, or `None` when there is nothing to match.
pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Wraps every non-overlapping occurrence of `query` in `<mark>` tags.
pub fn highlight(text: &str, query: &str) -> String {
    highlight_with(text, query, MARK_OPEN, MARK_CLOSE)
}

pub fn highlight_with(text: &str, query: &str, open: &str, close: &str) -> String {
    let Some(regex) = build_highlight_regex(query) else {
        return text.to_string();
    };
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in regex.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        out.push_str(open);
        out.push_str(found.as_str());
        out.push_str(close);
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_all_occurrences_preserving_case() {
        assert_eq!(
            highlight("Milk and milk", "milk"),
            "<mark>Milk</mark> and <mark>milk</mark>"
        );
    }

    #[test]
    fn escapes_metacharacters() {
        assert_eq!(highlight("cost (a+b)?", "(a+b)?"), "cost <mark>(a+b)?</mark>");
        assert_eq!(highlight("a.c abc", "a.c"), "<mark>a.c</mark> abc");
    }

    #[test]
    fn empty_query_is_identity() {
        assert_eq!(highlight("anything", ""), "anything");
        assert!(build_highlight_regex("").is_none());
    }

    #[test]
    fn matches_do_not_overlap() {
        assert_eq!(highlight_with("aaa", "aa", "[", "]"), "[aa]a");
    }
}

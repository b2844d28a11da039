// =============================================================================
// extractors/mod.rs — THE PATTERN MINES
// =============================================================================
//
// This module is the command center for everything we dig out of a filing's
// rendered body text: tickers, explicit effective-date phrases, delaying
// amendment language, and prospectus name/ticker table rows.
//
// One design rule governs the whole directory: extraction is an ORDERED
// LIST OF STRATEGIES with a uniform (value, method-tag) return contract,
// evaluated in a fixed order. No ad hoc branching, no "try this regex and
// see what happens." Every value that leaves this module carries the name
// of the strategy that produced it, so when two strategies disagree the
// downstream tie-break rules can do their job in the open.
//
// Securities lawyers write the same fact forty different ways. We are not
// a natural-language-understanding system and do not pretend to be one;
// we are a bounded, explainable set of patterns, and when none of them
// match we say "unknown" with a straight face.
// =============================================================================

pub mod dates;
pub mod delaying;
pub mod name_rows;
pub mod ticker;

/// Collapse runs of whitespace into single spaces. Prospectus text arrives
/// with line wraps in the middle of sentences; every regex in this
/// directory assumes this normalization has already happened.
pub fn normalize_spacing(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = true;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Tokens that look like tickers but never are. "THE FUND (THE 'FUND')"
/// has burned enough extraction pipelines that this list is loadbearing.
const TICKER_STOPWORDS: &[&str] = &[
    "THE", "AND", "FOR", "WITH", "ETF", "FUND", "RISK", "USD", "MEMBER",
];

/// Is this token a plausible ticker symbol? Length-bounded, at least one
/// letter, and not a stopword that happens to be short and shouty.
pub fn valid_ticker(tok: &str, min_len: usize, max_len: usize) -> bool {
    let t = tok.trim().to_uppercase();
    if t.len() < min_len || t.len() > max_len {
        return false;
    }
    if TICKER_STOPWORDS.contains(&t.as_str()) {
        return false;
    }
    t.chars().any(|c| c.is_ascii_alphabetic())
}

/// Byte offsets of every case-insensitive occurrence of `needle` in
/// `haystack`. Both sides are lowercased once; memchr does the scanning,
/// because scanning a 400-page prospectus with a naive loop is a crime
/// against silicon.
pub fn find_occurrences(haystack_lower: &str, needle: &str) -> Vec<usize> {
    let needle_lower = needle.to_lowercase();
    if needle_lower.is_empty() {
        return Vec::new();
    }
    memchr::memmem::find_iter(haystack_lower.as_bytes(), needle_lower.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_wraps_and_tabs() {
        assert_eq!(
            normalize_spacing("Tuttle  Capital\n2X\tLong AI ETF "),
            "Tuttle Capital 2X Long AI ETF"
        );
    }

    #[test]
    fn ticker_validation_rejects_stopwords_and_numbers() {
        assert!(valid_ticker("QQQX", 1, 6));
        assert!(valid_ticker("Bx", 1, 6));
        assert!(!valid_ticker("ETF", 1, 6));
        assert!(!valid_ticker("2024", 1, 6)); // no letters
        assert!(!valid_ticker("TOOLONGX", 1, 6));
        assert!(!valid_ticker("", 1, 6));
    }

    #[test]
    fn occurrence_scan_is_case_insensitive() {
        let hay = "the tuttle capital fund and TUTTLE CAPITAL again".to_lowercase();
        let hits = find_occurrences(&hay, "Tuttle Capital");
        assert_eq!(hits.len(), 2);
    }
}

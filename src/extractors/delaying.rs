// =============================================================================
// extractors/delaying.rs — THE DELAYING-AMENDMENT DETECTOR
// =============================================================================
//
// A registrant who is not ready to go effective files "delaying amendment"
// language: a citation to Rule 473 or Rule 485(a), or prose about delaying
// the effective date. The presence of ANY of these phrases means the
// automatic waiting-period clock does NOT apply, which is why the resolver
// consults this flag before handing out its LOW-confidence default dates.
//
// This is a pure multi-pattern membership test, which is exactly what
// Aho-Corasick was born to do: every phrase checked simultaneously in a
// single pass. Using an automaton built for antivirus engines to spot the
// phrase "delaying amendment" in a mutual fund filing is, frankly, on
// brand for this codebase.
// =============================================================================

use aho_corasick::AhoCorasick;
use std::sync::LazyLock;

/// The phrases that postpone effectiveness. Compiled once, case-insensitive.
static DELAYING_PHRASES: &[&str] = &[
    "delaying amendment",
    "delay its effective date",
    "delay the effective date",
    "rule 485(a)",
    "rule 473",
    "designates a new effective date",
];

static DELAYING_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(DELAYING_PHRASES)
        .expect("delaying-phrase automaton failed to build")
});

/// Does this filing contain delaying-amendment language?
pub fn detect_delaying_amendment(body: &str) -> bool {
    // SIMD pre-filter before waking the automaton. Every phrase contains
    // either "delay", "473", or "485(a)", modulo case.
    let bytes = body.as_bytes();
    let has_potential = memchr::memmem::find(bytes, b"delay").is_some()
        || memchr::memmem::find(bytes, b"Delay").is_some()
        || memchr::memmem::find(bytes, b"DELAY").is_some()
        || memchr::memmem::find(bytes, b"473").is_some()
        || memchr::memmem::find(bytes, b"485(a)").is_some()
        || memchr::memmem::find(bytes, b"485(A)").is_some()
        || memchr::memmem::find(bytes, b"designat").is_some()
        || memchr::memmem::find(bytes, b"Designat").is_some();

    if !has_potential {
        return false;
    }

    DELAYING_AUTOMATON.is_match(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_citations_are_detected() {
        assert!(detect_delaying_amendment(
            "This filing is made pursuant to Rule 485(a) under the Securities Act."
        ));
        assert!(detect_delaying_amendment(
            "The Registrant has filed a delaying amendment pursuant to RULE 473."
        ));
    }

    #[test]
    fn delay_prose_is_detected_case_insensitively() {
        assert!(detect_delaying_amendment(
            "The Registrant hereby elects to DELAY THE EFFECTIVE DATE of this registration."
        ));
    }

    #[test]
    fn innocent_text_does_not_trip_the_flag() {
        assert!(!detect_delaying_amendment(
            "The Fund seeks to track the performance of an index of large-cap equities."
        ));
        // Mentions delays, but not OUR delays.
        assert!(!detect_delaying_amendment(
            "Shipping delays may affect physically settled commodities."
        ));
    }
}

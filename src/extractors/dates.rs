// =============================================================================
// extractors/dates.rs — THE EFFECTIVE-DATE PHRASE LIBRARY
// =============================================================================
//
// Filings state their effective date in prose, and the prose comes in a
// small number of recurring shapes. Each shape below is one strategy:
// a regex plus the source tag it produces. The list is evaluated IN ORDER
// and the first match wins, which is how the resolver's priority ladder
// reaches into this module.
//
//   1. PARAGRAPH-CITATION — the Rule 485 facing-page checkbox language:
//      "... on November 7, 2025 pursuant to paragraph (b)". The filer
//      literally checked a box naming a date. As explicit as it gets.
//   2. DESIGNATION-PROSE — extension-of-time language: "designating
//      November 7, 2025 as the new effective date".
//   3. EXPLICIT-STATEMENT — the general forms: "will become effective on
//      ...", "effective on or about ...", and the numeric "effective on
//      11/7/2025" variant.
//
// Anything this module cannot match is simply not matched. Guessing a
// date is worse than admitting ignorance, and the resolver downstream has
// an UNKNOWN rung for exactly that.
// =============================================================================

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::{DateFind, DateSource};

/// The ordered strategy table: (source tag, pattern). Group 1 of every
/// pattern is the date text. First match wins.
static DATE_STRATEGIES: LazyLock<Vec<(DateSource, Regex)>> = LazyLock::new(|| {
    vec![
        (
            DateSource::ParagraphCitation,
            Regex::new(
                r"(?i)\bon\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})\s*,?\s*pursuant\s+to\s+paragraph\s+\(b\)",
            )
            .expect("paragraph-citation regex is invalid somehow"),
        ),
        (
            DateSource::DesignationProse,
            Regex::new(
                r"(?i)designat(?:es?|ing)\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})\s+as\s+the\s+new\s+effective\s+date",
            )
            .expect("designation-prose regex is invalid somehow"),
        ),
        (
            DateSource::ExplicitStatement,
            Regex::new(
                r"(?i)(?:shall\s+become|will\s+become|becomes?|will\s+be)\s+effective\s+(?:on|as\s+of)\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})",
            )
            .expect("explicit-statement regex is invalid somehow"),
        ),
        (
            DateSource::ExplicitStatement,
            Regex::new(r"(?i)effective\s+on\s+or\s+about\s+([A-Za-z]+\s+\d{1,2},\s+\d{4})")
                .expect("on-or-about regex is invalid somehow"),
        ),
        (
            DateSource::ExplicitStatement,
            Regex::new(r"(?i)effective\s+(?:on|as\s+of)\s+(\d{1,2}/\d{1,2}/\d{2,4})")
                .expect("numeric-date regex is invalid somehow"),
        ),
    ]
});

/// Run the strategy table over normalized body text. Returns the first
/// strategy's parse, or None when the filing keeps its plans to itself.
pub fn extract_date(body_norm: &str) -> Option<DateFind> {
    // Pre-filter: every pattern needs the word "effective" somewhere.
    // 400-page prospectuses that never say it get the fast exit.
    let bytes = body_norm.as_bytes();
    let has_effective = memchr::memmem::find(bytes, b"effective").is_some()
        || memchr::memmem::find(bytes, b"Effective").is_some()
        || memchr::memmem::find(bytes, b"EFFECTIVE").is_some();
    if !has_effective {
        return None;
    }

    for (source, re) in DATE_STRATEGIES.iter() {
        if let Some(caps) = re.captures(body_norm) {
            if let Some(date) = parse_date_text(&caps[1]) {
                return Some(DateFind {
                    date,
                    source: *source,
                });
            }
            // Matched the shape but the date itself is nonsense
            // ("February 31, 2025" happens). Fall through to the next
            // strategy rather than abort.
        }
    }
    None
}

/// Parse the date formats that actually occur in filings: the long-form
/// "November 7, 2025" and the numeric "11/7/2025" (with a grudging nod
/// to two-digit years).
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%B %d, %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%m/%d/%y") {
        return Some(d);
    }
    None
}

// =============================================================================
// extractors/ticker.rs — THE TICKER DIVINATION CHAMBER
// =============================================================================
//
// Tickers are formally assigned at the class level and SHOULD arrive via
// the header's ticker tag. When they don't (early filings routinely omit
// them), we go digging in the prospectus body with two strategies, in
// strict priority order:
//
//   1. TITLE-PAREN — "Tuttle Capital 2X Long AI ETF (QQQX)". Anchored to
//      the exact fund name, so precision is excellent. Checked first.
//   2. LABEL-WINDOW — a "Ticker:" or "Trading Symbol:" label within a
//      bounded character window (default 600 chars) of a fund-name
//      occurrence. Decent recall, worse precision, hence second.
//
// Tie-break when a document offers multiple non-identical candidates for
// one fund: prefer the trailing-parenthetical match closest to the
// fund-name occurrence; if still tied, the first in document order. The
// rule is applied visibly (logged as an ambiguity), never silently.
// =============================================================================

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::config::Config;
use crate::error::ExtractionError;
use crate::models::{TickerFind, TickerMethod};

use super::{find_occurrences, valid_ticker};

/// "Ticker: XXXX" / "Trading Symbol - XXXX" label forms. The separator
/// set covers colon, hyphen, and the fancy dashes Word likes to insert.
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Ticker|Trading\s*Symbol)\s*[:\-–—]\s*([A-Za-z0-9]{1,6})\b")
        .expect("ticker label regex is invalid somehow")
});

/// One candidate ticker with enough provenance to run the tie-break.
#[derive(Debug, Clone)]
struct Candidate {
    ticker: String,
    method: TickerMethod,
    /// Byte offset of the match in the document, for document-order ties.
    offset: usize,
    /// Distance in characters from the anchoring fund-name occurrence.
    distance: usize,
}

/// Extract the best ticker for one fund name from normalized body text.
///
/// `body_norm` must be whitespace-normalized (see extractors::normalize_spacing);
/// `body_lower` is its lowercased twin, computed once per filing and shared
/// across every series so we don't lowercase a prospectus forty times.
pub fn extract_ticker(
    body_norm: &str,
    body_lower: &str,
    series_id: &str,
    series_name: &str,
    cfg: &Config,
    accession: &str,
) -> Option<TickerFind> {
    let name = super::normalize_spacing(series_name);
    if name.is_empty() {
        return None;
    }

    // Cheap pre-filter: if the fund name never appears, neither strategy
    // can anchor to anything.
    let occurrences = find_occurrences(body_lower, &name);
    if occurrences.is_empty() {
        return None;
    }

    // The strategies, in fixed priority order.
    let mut candidates = paren_candidates(body_norm, &name, cfg);
    if candidates.is_empty() {
        candidates = label_candidates(body_norm, &occurrences, cfg);
    }

    pick(candidates, accession, series_id)
}

/// Strategy 1: the trailing parenthetical anchored to the exact name.
fn paren_candidates(body_norm: &str, name: &str, cfg: &Config) -> Vec<Candidate> {
    // The name is data, not pattern, so it gets escaped wholesale.
    let pattern = format!(
        r"(?i){}\s*\(\s*([A-Za-z0-9]{{1,6}})\s*\)",
        regex::escape(name)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        // A name so hostile it breaks the escaped pattern. Give up on
        // this strategy for this fund, not on the filing.
        Err(_) => return Vec::new(),
    };

    re.captures_iter(body_norm)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            let tick = m.as_str().to_uppercase();
            if !valid_ticker(&tick, cfg.ticker_min_len, cfg.ticker_max_len) {
                return None;
            }
            Some(Candidate {
                ticker: tick,
                method: TickerMethod::TitleParen,
                offset: caps.get(0).map(|w| w.start()).unwrap_or(m.start()),
                // Anchored to the name itself, so distance is zero by
                // construction.
                distance: 0,
            })
        })
        .collect()
}

/// Strategy 2: a labeled ticker within the configured window of a
/// fund-name occurrence.
fn label_candidates(body_norm: &str, occurrences: &[usize], cfg: &Config) -> Vec<Candidate> {
    let window = cfg.ticker_label_window;
    let mut out = Vec::new();

    for &pos in occurrences {
        let start = pos.saturating_sub(window);
        let end = (pos + window).min(body_norm.len());
        let (start, end) = snap_to_char_boundaries(body_norm, start, end);
        let slice = &body_norm[start..end];

        for caps in LABEL_RE.captures_iter(slice) {
            let m = match caps.get(1) {
                Some(m) => m,
                None => continue,
            };
            let tick = m.as_str().to_uppercase();
            if !valid_ticker(&tick, cfg.ticker_min_len, cfg.ticker_max_len) {
                continue;
            }
            let abs = start + m.start();
            out.push(Candidate {
                ticker: tick,
                method: TickerMethod::LabelWindow,
                offset: abs,
                distance: abs.abs_diff(pos),
            });
        }
    }

    out
}

/// Apply the tie-break: nearest to the name first, then document order.
/// Ambiguity (multiple distinct tickers) is logged, never papered over.
fn pick(mut candidates: Vec<Candidate>, accession: &str, series_id: &str) -> Option<TickerFind> {
    if candidates.is_empty() {
        return None;
    }

    let distinct: std::collections::BTreeSet<&str> =
        candidates.iter().map(|c| c.ticker.as_str()).collect();
    if distinct.len() > 1 {
        let err = ExtractionError::AmbiguousExtraction {
            accession: accession.to_string(),
            series_id: series_id.to_string(),
            detail: format!("candidate tickers {:?}", distinct),
        };
        warn!(error = %err, "applying nearest-then-first tie-break");
    }

    candidates.sort_by_key(|c| (c.distance, c.offset));
    let best = candidates.into_iter().next()?;
    Some(TickerFind {
        ticker: best.ticker,
        method: best.method,
    })
}

/// Byte windows can land mid-UTF-8-codepoint. Nudge them onto boundaries
/// so slicing can't panic on a prospectus with a stray en dash.
fn snap_to_char_boundaries(s: &str, mut start: usize, mut end: usize) -> (usize, usize) {
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    while end > start && !s.is_char_boundary(end) {
        end -= 1;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(body: &str, name: &str) -> Option<TickerFind> {
        let cfg = Config::default();
        let norm = crate::extractors::normalize_spacing(body);
        let lower = norm.to_lowercase();
        extract_ticker(&norm, &lower, "S000086222", name, &cfg, "0000000000-00-000000")
    }

    #[test]
    fn trailing_parenthetical_is_found() {
        let got = run(
            "Prospectus for the Tuttle Capital 2X Long AI ETF (QQQX), a series of ETF Opportunities Trust.",
            "Tuttle Capital 2X Long AI ETF",
        )
        .unwrap();
        assert_eq!(got.ticker, "QQQX");
        assert_eq!(got.method, TickerMethod::TitleParen);
    }

    #[test]
    fn label_window_is_the_fallback() {
        let got = run(
            "Tuttle Capital 2X Long AI ETF. Principal listing exchange: Cboe. Ticker: QQQX. Summary follows.",
            "Tuttle Capital 2X Long AI ETF",
        )
        .unwrap();
        assert_eq!(got.ticker, "QQQX");
        assert_eq!(got.method, TickerMethod::LabelWindow);
    }

    #[test]
    fn paren_beats_label_when_both_present() {
        let got = run(
            "Tuttle Capital 2X Long AI ETF (QQQX). Elsewhere: Ticker: WRONG.",
            "Tuttle Capital 2X Long AI ETF",
        )
        .unwrap();
        assert_eq!(got.method, TickerMethod::TitleParen);
        assert_eq!(got.ticker, "QQQX");
    }

    #[test]
    fn stopword_parentheticals_are_rejected() {
        // "(the 'Fund')" style legalese must not become a ticker.
        let got = run(
            "Tuttle Capital 2X Long AI ETF (the Fund) seeks daily leveraged exposure.",
            "Tuttle Capital 2X Long AI ETF",
        );
        assert!(got.is_none());
    }

    #[test]
    fn label_outside_window_is_ignored() {
        let padding = "lorem ipsum dolor sit amet ".repeat(40); // > 600 chars
        let body = format!(
            "Tuttle Capital 2X Long AI ETF overview. {} Ticker: FARX.",
            padding
        );
        assert!(run(&body, "Tuttle Capital 2X Long AI ETF").is_none());
    }

    #[test]
    fn ambiguous_parens_resolve_to_first_in_document_order() {
        let got = run(
            "Tuttle Capital 2X Long AI ETF (QQQX) ... later reprint: Tuttle Capital 2X Long AI ETF (QQXJ)",
            "Tuttle Capital 2X Long AI ETF",
        )
        .unwrap();
        assert_eq!(got.ticker, "QQQX");
    }

    #[test]
    fn absent_fund_name_yields_nothing() {
        assert!(run("Completely unrelated document. Ticker: ABCD.", "Ghost Fund ETF").is_none());
    }

    #[test]
    fn line_wrapped_names_still_match_after_normalization() {
        let got = run(
            "Tuttle Capital\n2X Long AI ETF (QQQX)",
            "Tuttle Capital 2X Long AI ETF",
        )
        .unwrap();
        assert_eq!(got.ticker, "QQQX");
    }
}

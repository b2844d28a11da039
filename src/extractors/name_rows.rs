// =============================================================================
// extractors/name_rows.rs — THE PROSPECTUS TABLE SCRAPER
// =============================================================================
//
// Prospectus cover pages and fee tables list funds in two-column rows:
//
//     Tuttle Capital Daily 2X Long AI ETF          QQQX
//
// These rows are where a fund's NEW display name shows up first, often a
// filing or two before the legal header name catches up. We harvest every
// (name, ticker) row from the RAW body text (before whitespace collapsing,
// since the column gap IS the signal) and the pipeline later matches rows
// back to series by ticker.
//
// This is deliberately dumb: split each line on runs of 2+ spaces, check
// whether the last column is a plausible ticker, take the rest as the name.
// Dumb, bounded, explainable. The three virtues.
// =============================================================================

use super::valid_ticker;
use crate::config::Config;

/// One harvested row: a display name and the ticker printed beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NameRow {
    pub name: String,
    pub ticker: String,
}

/// Harvest (name, ticker) rows from raw (pre-normalization) body text.
pub fn extract_name_rows(body_raw: &str, cfg: &Config) -> Vec<NameRow> {
    let mut rows = Vec::new();

    for line in body_raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = split_on_column_gap(line);
        if parts.len() < 2 {
            continue;
        }

        let last = parts[parts.len() - 1].trim();
        if !last.chars().all(|c| c.is_ascii_alphanumeric())
            || !valid_ticker(last, cfg.ticker_min_len, cfg.ticker_max_len)
        {
            continue;
        }
        // Tickers print in caps. A lowercase final column is prose.
        if last.chars().any(|c| c.is_ascii_lowercase()) {
            continue;
        }

        let name = parts[..parts.len() - 1].join(" ").trim().to_string();
        // A real fund name has some meat on it. Two-token lines like
        // "Page 4" or "Item B" are table-of-contents noise.
        if name.len() < 8 || !name.chars().any(|c| c.is_ascii_alphabetic()) {
            continue;
        }

        rows.push(NameRow {
            name,
            ticker: last.to_uppercase(),
        });
    }

    rows
}

/// Split a line on runs of two or more spaces (the column gap).
fn split_on_column_gap(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = line;
    while let Some(idx) = rest.find("  ") {
        let (head, tail) = rest.split_at(idx);
        if !head.trim().is_empty() {
            parts.push(head.trim());
        }
        rest = tail.trim_start();
        if rest.is_empty() {
            break;
        }
    }
    if !rest.trim().is_empty() {
        parts.push(rest.trim());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_column_rows_are_harvested() {
        let body = "\
Fund Name                                         Ticker
Tuttle Capital Daily 2X Long AI ETF               QQQX
T-REX 2X Long NVDA Daily Target ETF               NVDX
";
        let rows = extract_name_rows(body, &Config::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Tuttle Capital Daily 2X Long AI ETF");
        assert_eq!(rows[0].ticker, "QQQX");
        assert_eq!(rows[1].ticker, "NVDX");
    }

    #[test]
    fn prose_lines_are_not_rows() {
        let body = "The Fund seeks daily investment results, before fees and expenses.";
        assert!(extract_name_rows(body, &Config::default()).is_empty());
    }

    #[test]
    fn stopword_and_lowercase_columns_are_rejected() {
        let body = "\
Principal Risks of Investing in the               Fund
Summary of fees payable by investors              below
";
        assert!(extract_name_rows(body, &Config::default()).is_empty());
    }

    #[test]
    fn short_toc_lines_are_rejected() {
        let body = "Item B                                            IV";
        assert!(extract_name_rows(body, &Config::default()).is_empty());
    }
}

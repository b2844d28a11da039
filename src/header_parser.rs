// =============================================================================
// header_parser.rs — THE SGML HEADER EXCAVATOR
// =============================================================================
//
// Every EDGAR submission carries a machine-readable SGML header, and buried
// inside it are the series/class registration blocks: the ONLY place where
// a fund's permanent identifiers appear in structured form. This parser is
// therefore the authoritative source for identity. Body text gets a vote
// on names and tickers; the header gets a veto.
//
// EDGAR's SGML is not XML. Scalar tags have no closing tag ("<SERIES-ID>S000086222"
// and then just... a newline), container tags do ("<SERIES>...</SERIES>"),
// and the same data appears under two container variants:
//
//   <SERIES>      inside EXISTING-SERIES-AND-CLASSES-CONTRACTS (referenced)
//   <NEW-SERIES>  inside NEW-SERIES-AND-CLASSES-CONTRACTS      (first registration)
//
// We parse line by line with a small state machine. No XML crate will save
// you here. Believe us, the thought was entertained.
//
// Failure mode: a filing with no parseable blocks yields an empty list.
// Some form types legitimately carry no series data, so absence is expected
// and must never abort the pipeline.
// =============================================================================

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::SeriesBlock;

/// The header-level EFFECTIVENESS DATE tag, e.g. "EFFECTIVENESS DATE: 20251107".
/// Rare, but when the SEC stamps a date into the header it outranks
/// everything the prose says.
static EFFECTIVENESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EFFECTIVENESS\s+DATE:\s*(\d{8})")
        .expect("effectiveness-date regex is invalid somehow")
});

/// Everything this parser can pull out of one filing's header.
#[derive(Debug, Clone, Default)]
pub struct HeaderParse {
    /// One record per class (or per classless series), in document order.
    pub blocks: Vec<SeriesBlock>,
    /// The EFFECTIVENESS DATE header tag, when present.
    pub effectiveness_date: Option<NaiveDate>,
    /// True when the header clearly contained series markup that we
    /// nonetheless failed to assemble into a single block. Recorded as
    /// MalformedInput by the pipeline; never fatal.
    pub malformed: bool,
}

/// In-flight state for one series block while we walk its lines.
#[derive(Debug, Default)]
struct PendingSeries {
    series_id: Option<String>,
    series_name: Option<String>,
    is_new: bool,
    classes: Vec<PendingClass>,
    in_class: bool,
}

#[derive(Debug, Default, Clone)]
struct PendingClass {
    class_id: Option<String>,
    class_name: Option<String>,
    ticker: Option<String>,
}

/// Parse one filing's raw SGML header.
pub fn parse_header(header_text: &str) -> HeaderParse {
    let mut out = HeaderParse::default();

    if header_text.trim().is_empty() {
        return out;
    }

    // SIMD pre-filter: if the bytes "SERIES-ID" never appear, there are no
    // series blocks and we can skip the line walk for everything but the
    // effectiveness tag. Most EFFECT notices take this exit.
    let has_series = memchr::memmem::find(header_text.as_bytes(), b"SERIES-ID").is_some();

    out.effectiveness_date = extract_effectiveness_date(header_text);

    if !has_series {
        return out;
    }

    let mut order = 0usize;
    let mut pending: Option<PendingSeries> = None;

    for raw_line in header_text.lines() {
        let line = raw_line.trim();

        match tag_of(line) {
            Some(("SERIES", _)) | Some(("NEW-SERIES", _)) => {
                // A new container opens. If the previous one never closed
                // (sloppy SGML happens), flush it rather than lose it.
                if let Some(p) = pending.take() {
                    flush_series(p, &mut out.blocks, &mut order);
                }
                pending = Some(PendingSeries {
                    is_new: line.starts_with("<NEW-SERIES"),
                    ..Default::default()
                });
            }
            Some(("/SERIES", _)) | Some(("/NEW-SERIES", _)) => {
                if let Some(p) = pending.take() {
                    flush_series(p, &mut out.blocks, &mut order);
                }
            }
            Some(("SERIES-ID", v)) => {
                if let Some(p) = pending.as_mut() {
                    p.series_id = clean_id(v, 'S');
                }
            }
            Some(("SERIES-NAME", v)) => {
                if let Some(p) = pending.as_mut() {
                    p.series_name = non_empty(v);
                }
            }
            Some(("CLASS-CONTRACT", _)) | Some(("NEW-CLASSES-CONTRACTS", _)) => {
                if let Some(p) = pending.as_mut() {
                    p.classes.push(PendingClass::default());
                    p.in_class = true;
                }
            }
            Some(("/CLASS-CONTRACT", _)) | Some(("/NEW-CLASSES-CONTRACTS", _)) => {
                if let Some(p) = pending.as_mut() {
                    p.in_class = false;
                }
            }
            Some(("CLASS-CONTRACT-ID", v)) => {
                if let Some(c) = current_class(&mut pending) {
                    c.class_id = clean_id(v, 'C');
                }
            }
            Some(("CLASS-CONTRACT-NAME", v)) => {
                if let Some(c) = current_class(&mut pending) {
                    c.class_name = non_empty(v);
                }
            }
            Some(("CLASS-CONTRACT-TICKER-SYMBOL", v)) => {
                if let Some(c) = current_class(&mut pending) {
                    c.ticker = non_empty(v).map(|t| t.to_uppercase());
                }
            }
            _ => {}
        }
    }

    // Header ended mid-block. Flush what we have.
    if let Some(p) = pending.take() {
        flush_series(p, &mut out.blocks, &mut order);
    }

    if out.blocks.is_empty() {
        // The bytes said series data was here, but nothing assembled.
        out.malformed = true;
        debug!("header contained SERIES-ID markup but no block parsed");
    }

    out
}

/// Split an SGML header line into (TAG, trailing value). Scalar tags carry
/// their value on the same line with no closing tag.
fn tag_of(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('<')?;
    let end = rest.find('>')?;
    Some((&rest[..end], rest[end + 1..].trim()))
}

fn current_class(pending: &mut Option<PendingSeries>) -> Option<&mut PendingClass> {
    let p = pending.as_mut()?;
    if !p.in_class {
        // Class tag outside a class container. Tolerate it by opening one;
        // EDGAR headers from the early 2010s actually do this.
        p.classes.push(PendingClass::default());
        p.in_class = true;
    }
    p.classes.last_mut()
}

/// Validate a permanent identifier: expected prefix letter plus digits.
fn clean_id(v: &str, prefix: char) -> Option<String> {
    let v = v.trim();
    let mut chars = v.chars();
    if chars.next() == Some(prefix) && chars.clone().all(|c| c.is_ascii_digit()) && v.len() > 1 {
        Some(v.to_string())
    } else {
        None
    }
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Emit one SeriesBlock per class (or one classless block), preserving
/// document order. Blocks without a series id are dropped: an identifier
/// is the one thing we refuse to infer.
fn flush_series(p: PendingSeries, blocks: &mut Vec<SeriesBlock>, order: &mut usize) {
    let (series_id, series_name) = match (p.series_id, p.series_name) {
        (Some(id), Some(name)) => (id, name),
        (Some(id), None) => (id, String::new()),
        _ => return,
    };

    if p.classes.is_empty() {
        blocks.push(SeriesBlock {
            series_id,
            series_name,
            class_id: None,
            class_name: None,
            ticker: None,
            is_new: p.is_new,
            order: *order,
        });
        *order += 1;
        return;
    }

    for c in p.classes {
        blocks.push(SeriesBlock {
            series_id: series_id.clone(),
            series_name: series_name.clone(),
            class_id: c.class_id,
            class_name: c.class_name,
            ticker: c.ticker,
            is_new: p.is_new,
            order: *order,
        });
        *order += 1;
    }
}

/// Pull the EFFECTIVENESS DATE tag out of the header, if the SEC stamped one.
fn extract_effectiveness_date(header_text: &str) -> Option<NaiveDate> {
    let caps = EFFECTIVENESS_RE.captures(header_text)?;
    NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING_HEADER: &str = "\
<SERIES-AND-CLASSES-CONTRACTS-DATA>
<EXISTING-SERIES-AND-CLASSES-CONTRACTS>
<SERIES>
<OWNER-CIK>0001771146
<SERIES-ID>S000086222
<SERIES-NAME>Tuttle Capital 2X Long AI ETF
<CLASS-CONTRACT>
<CLASS-CONTRACT-ID>C000097592
<CLASS-CONTRACT-NAME>Tuttle Capital 2X Long AI ETF
<CLASS-CONTRACT-TICKER-SYMBOL>qqqx
</CLASS-CONTRACT>
</SERIES>
</EXISTING-SERIES-AND-CLASSES-CONTRACTS>
</SERIES-AND-CLASSES-CONTRACTS-DATA>
";

    const NEW_HEADER: &str = "\
<SERIES-AND-CLASSES-CONTRACTS-DATA>
<NEW-SERIES-AND-CLASSES-CONTRACTS>
<NEW-SERIES>
<OWNER-CIK>0001771146
<SERIES-ID>S000090001
<SERIES-NAME>T-REX 2X Long SCCO Daily Target ETF
<CLASS-CONTRACT>
<CLASS-CONTRACT-ID>C000099001
<CLASS-CONTRACT-NAME>T-REX 2X Long SCCO Daily Target ETF
</CLASS-CONTRACT>
</NEW-SERIES>
</NEW-SERIES-AND-CLASSES-CONTRACTS>
</SERIES-AND-CLASSES-CONTRACTS-DATA>
";

    #[test]
    fn parses_existing_series_block_with_ticker() {
        let parsed = parse_header(EXISTING_HEADER);
        assert_eq!(parsed.blocks.len(), 1);
        let b = &parsed.blocks[0];
        assert_eq!(b.series_id, "S000086222");
        assert_eq!(b.series_name, "Tuttle Capital 2X Long AI ETF");
        assert_eq!(b.class_id.as_deref(), Some("C000097592"));
        // Ticker tag values are uppercased on the way in.
        assert_eq!(b.ticker.as_deref(), Some("QQQX"));
        assert!(!b.is_new);
        assert!(!parsed.malformed);
    }

    #[test]
    fn parses_new_series_block_and_marks_it_new() {
        let parsed = parse_header(NEW_HEADER);
        assert_eq!(parsed.blocks.len(), 1);
        let b = &parsed.blocks[0];
        assert_eq!(b.series_id, "S000090001");
        assert!(b.is_new);
        assert_eq!(b.ticker, None);
    }

    #[test]
    fn preserves_document_order_across_blocks() {
        let combined = format!("{}{}", EXISTING_HEADER, NEW_HEADER);
        let parsed = parse_header(&combined);
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.blocks[0].order, 0);
        assert_eq!(parsed.blocks[1].order, 1);
        assert_eq!(parsed.blocks[0].series_id, "S000086222");
        assert_eq!(parsed.blocks[1].series_id, "S000090001");
    }

    #[test]
    fn empty_or_seriesless_header_yields_empty_list_not_error() {
        assert!(parse_header("").blocks.is_empty());
        let parsed = parse_header("ACCESSION NUMBER: 0001213900-25-000001\nFORM TYPE: EFFECT\n");
        assert!(parsed.blocks.is_empty());
        assert!(!parsed.malformed);
    }

    #[test]
    fn garbage_series_markup_is_flagged_malformed() {
        // SERIES-ID bytes are present, but no well-formed block assembles.
        let parsed = parse_header("<SERIES-ID>XYZ123\n");
        assert!(parsed.blocks.is_empty());
        assert!(parsed.malformed);
    }

    #[test]
    fn extracts_header_effectiveness_date() {
        let hdr = "FORM TYPE: 485BXT\nEFFECTIVENESS DATE:\t\t20251107\n";
        let parsed = parse_header(hdr);
        assert_eq!(
            parsed.effectiveness_date,
            Some(NaiveDate::from_ymd_opt(2025, 11, 7).unwrap())
        );
    }

    #[test]
    fn unterminated_block_is_flushed_not_dropped() {
        let hdr = "\
<SERIES>
<SERIES-ID>S000012345
<SERIES-NAME>Orphaned Fund ETF
";
        let parsed = parse_header(hdr);
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].series_name, "Orphaned Fund ETF");
    }

    #[test]
    fn multiple_classes_fan_out_into_multiple_blocks() {
        let hdr = "\
<SERIES>
<SERIES-ID>S000055555
<SERIES-NAME>Two Class Fund
<CLASS-CONTRACT>
<CLASS-CONTRACT-ID>C000011111
<CLASS-CONTRACT-NAME>Institutional Class
</CLASS-CONTRACT>
<CLASS-CONTRACT>
<CLASS-CONTRACT-ID>C000022222
<CLASS-CONTRACT-NAME>Investor Class
<CLASS-CONTRACT-TICKER-SYMBOL>TWOCX
</CLASS-CONTRACT>
</SERIES>
";
        let parsed = parse_header(hdr);
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.blocks[0].class_id.as_deref(), Some("C000011111"));
        assert_eq!(parsed.blocks[1].ticker.as_deref(), Some("TWOCX"));
        assert_eq!(parsed.blocks[1].series_id, "S000055555");
    }
}

// =============================================================================
// reconciler.rs — THE FUND GENEALOGY DEPARTMENT
// =============================================================================
//
// Funds change names. Constantly. A "Tuttle Capital Daily 2X Long AI ETF"
// files three amendments and emerges as a "T-REX 2X Long AI Daily Target
// ETF" without ever ceasing to be the same fund, because the Series ID
// never changed. This module is where sightings of the same Series ID
// across many filings get stitched into one coherent biography.
//
// Rules of the department:
//
//   * Identity is the Series ID. Names are testimony, IDs are DNA.
//   * For each sighting, the best available name wins: the prospectus
//     body name (updates first), then the header class name, then the
//     header series name.
//   * Names are compared via a normalized key (casefolded, trademark
//     glyphs handled, parentheticals stripped, generic suffixes dropped);
//     the name STORED is the name as filed, original casing intact.
//   * Consecutive sightings of the same normalized name collapse into
//     one record. A name that actually changes closes the previous
//     record and opens a new one.
//   * Two names with NOTHING in common claiming one Series ID is an
//     identifier collision. We log it, flag the fund for human review,
//     and keep going, because best-effort state beats no state.
// =============================================================================

use chrono::NaiveDate;
use tracing::warn;

use crate::error::ExtractionError;
use crate::models::{NameOrigin, NameRecord, SeriesObservation};

/// One sighting of a series inside one filing, with enough filing
/// metadata to order it and cite it. The pipeline groups these by
/// series id before handing them over.
#[derive(Debug, Clone)]
pub struct SeriesSighting {
    pub accession: String,
    pub raw_form: String,
    pub filing_date: NaiveDate,
    pub observation: SeriesObservation,
}

/// The assembled biography of one series: its full name history plus
/// whether anything about it smelled wrong enough to flag.
#[derive(Debug, Clone, Default)]
pub struct NameHistory {
    /// Chronological records; the one with effective_to == None is current.
    pub records: Vec<NameRecord>,
    /// Set when an identifier collision was detected.
    pub flagged_for_review: bool,
}

impl NameHistory {
    /// The current display name, if any sighting carried a usable name.
    pub fn current_name(&self) -> Option<&str> {
        self.records.last().map(|r| r.name.as_str())
    }
}

/// Clean a fund name for display: trademark glyphs spelled out,
/// parenthetical asides removed, whitespace collapsed. Casing and
/// wording are otherwise preserved; this is a wash, not a rewrite.
pub fn clean_display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut paren_depth = 0usize;
    for ch in name.chars() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '\u{2122}' => {
                // ™ becomes a literal "TM" token, because half the filings
                // for the same fund spell it one way and half the other.
                if paren_depth == 0 {
                    out.push_str(" TM ");
                }
            }
            '\u{00AE}' => {} // ® adds nothing to identity
            c if paren_depth == 0 => out.push(c),
            _ => {}
        }
    }
    crate::extractors::normalize_spacing(&out)
}

/// The normalized comparison key for a fund name. Display-cleaned,
/// uppercased, and with trailing generic suffixes (ETF/FUND/TRUST)
/// dropped so "Foo ETF" and "Foo Fund" count as the same name.
/// NEVER stored as the name; keys are for equality, names are for humans.
pub fn comparison_key(name: &str) -> String {
    let cleaned = clean_display_name(name).to_uppercase();
    // The TM token carries zero identity; "Foo ETF" and "Foo ETF(tm)"
    // are the same fund in every filing we have ever seen.
    let mut tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|t| *t != "TM")
        .collect();
    while let Some(last) = tokens.last() {
        if matches!(*last, "ETF" | "FUND" | "TRUST") && tokens.len() > 1 {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

/// Pick the best name a sighting has to offer, with its origin.
/// Prospectus body names update a filing or two before the legal header
/// catches up, so they outrank both header names.
fn best_name(obs: &SeriesObservation) -> Option<(String, NameOrigin)> {
    if let Some(p) = obs.prospectus_name.as_deref() {
        let p = p.trim();
        if !p.is_empty() {
            return Some((p.to_string(), NameOrigin::Prospectus));
        }
    }
    if let Some(c) = obs.class_name.as_deref() {
        let c = c.trim();
        if !c.is_empty() {
            return Some((c.to_string(), NameOrigin::Header));
        }
    }
    let s = obs.series_name.trim();
    if !s.is_empty() {
        return Some((s.to_string(), NameOrigin::Header));
    }
    None
}

/// Do two normalized keys share any token at all? Zero overlap between
/// names claiming one Series ID is the collision signal.
fn share_any_token(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .any(|tok| b.split_whitespace().any(|other| tok == other))
}

/// Assemble the name history for one series from all of its sightings.
///
/// Sightings may arrive in any order; they are sorted here by
/// (filing date, accession, header order) so the output is deterministic
/// no matter how the parallel extraction phase interleaved them.
/// Running this twice over the same sightings produces identical records.
pub fn build_name_history(series_id: &str, mut sightings: Vec<SeriesSighting>) -> NameHistory {
    sightings.sort_by(|a, b| {
        (a.filing_date, a.accession.as_str(), a.observation.order)
            .cmp(&(b.filing_date, b.accession.as_str(), b.observation.order))
    });

    let mut history = NameHistory::default();

    for s in &sightings {
        let (raw_name, origin) = match best_name(&s.observation) {
            Some(n) => n,
            None => continue,
        };
        let name = clean_display_name(&raw_name);
        let key = comparison_key(&raw_name);
        if key.is_empty() {
            continue;
        }

        if let Some(last) = history.records.last_mut() {
            if last.normalized == key {
                // Same name restated. Nothing to record; the existing
                // record keeps its original effective_from.
                continue;
            }
            if !share_any_token(&last.normalized, &key) {
                let err = ExtractionError::IdentifierCollision {
                    series_id: series_id.to_string(),
                    existing: last.name.clone(),
                    incoming: name.clone(),
                };
                warn!(series_id = series_id, error = %err, "flagging series for review");
                history.flagged_for_review = true;
                // Recorded anyway: the flag asks a human to look, the
                // history still reflects what the filings actually said.
            }
            last.effective_to = Some(s.filing_date);
        }

        history.records.push(NameRecord {
            series_id: series_id.to_string(),
            name,
            normalized: key,
            effective_from: s.filing_date,
            effective_to: None,
            name_origin: origin,
            source_form: s.raw_form.clone(),
            source_accession: s.accession.clone(),
        });
    }

    history
}

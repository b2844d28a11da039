// =============================================================================
// rollup.rs — THE STATE MACHINE OF FUND DESTINY
// =============================================================================
//
// Given every filing that ever mentioned a series, what is the fund's
// status RIGHT NOW? This module answers that with a pure function: full
// history in, one SeriesState out. No incremental updates, no stored
// state to drift out of sync. Run it twice on the same pile of filings
// and you get byte-identical answers, which is the whole point.
//
// The status rules, checked in order:
//
//   1. Most recent status-relevant filing is an extension of time
//      => DELAYED. The launch is on hold until further notice.
//   2. Any post-effective amendment exists => EFFECTIVE. The fund is (or
//      was) live. The reported effective date is the EARLIEST resolvable
//      initial date, never the amendment's filing date.
//   3. Any status-relevant filing exists => PENDING. Paperwork is in,
//      clock may be ticking.
//   4. Nothing relevant => UNKNOWN, reported out loud.
//
// Order matters: a fund whose latest relevant filing is a 485BXT is
// DELAYED even if an old 485BPOS exists somewhere in its past, but a
// 485BPOS filed AFTER the extension supersedes the delay.
// =============================================================================

use chrono::NaiveDate;

use crate::models::{
    Confidence, DateSource, EffectiveDateFinding, FormType, SeriesObservation, SeriesState,
    SeriesStatus, TickerMethod,
};
use crate::reconciler::NameHistory;
use crate::registry;

/// Everything the rollup needs to know about one filing's view of one
/// series: the filing metadata, what the header said, and what the
/// effective-date resolver concluded.
#[derive(Debug, Clone)]
pub struct SeriesFiling {
    pub accession: String,
    pub raw_form: String,
    pub form: FormType,
    pub filing_date: NaiveDate,
    pub observation: SeriesObservation,
    pub finding: EffectiveDateFinding,
    /// True when the filing carried delaying-amendment language.
    /// Not consulted by the state machine (the resolver already folded
    /// it into the finding); carried through for the audit trail.
    pub delaying_amendment: bool,
}

/// Derive the current state of one series from its complete filing
/// history. Returns None only for an empty history, which the pipeline
/// never produces.
pub fn rollup_series(
    series_id: &str,
    trust_cik: &str,
    trust_name: &str,
    mut filings: Vec<SeriesFiling>,
    history: &NameHistory,
) -> Option<SeriesState> {
    if filings.is_empty() {
        return None;
    }

    // Deterministic chronology regardless of how the parallel phase
    // interleaved its output. Accession breaks same-day ties.
    filings.sort_by(|a, b| {
        (a.filing_date, a.accession.as_str()).cmp(&(b.filing_date, b.accession.as_str()))
    });

    let first = &filings[0];
    let latest = &filings[filings.len() - 1];

    let relevant: Vec<&SeriesFiling> =
        filings.iter().filter(|f| f.form.is_status_relevant()).collect();
    let latest_relevant = relevant.last().copied();
    let has_post_effective = relevant
        .iter()
        .any(|f| f.form == FormType::PostEffectiveAmendment);

    let (status, status_reason, date_pick) = match latest_relevant {
        Some(lr) if lr.form == FormType::ExtensionAmendment => {
            let pick = pick_delayed_date(lr, &filings);
            let reason = match pick {
                Some(f) if f.initial_effective_date.is_some() => format!(
                    "most recent relevant filing {} is an extension of time; new effective date designated",
                    lr.raw_form
                ),
                _ => format!(
                    "most recent relevant filing {} is an extension of time; no new effective date stated",
                    lr.raw_form
                ),
            };
            (SeriesStatus::Delayed, reason, pick)
        }
        Some(_) if has_post_effective => {
            let pick = earliest_initial(&filings);
            let reason = match pick {
                Some(_) => "post-effective amendment on record; earliest resolvable initial effective date reported".to_string(),
                None => "post-effective amendment on record; initial effective date unresolvable from available filings".to_string(),
            };
            (SeriesStatus::Effective, reason, pick)
        }
        Some(lr) => {
            let pick = best_initial(&filings);
            let reason = format!(
                "registration paperwork on file (latest relevant form {}); not yet effective",
                lr.raw_form
            );
            (SeriesStatus::Pending, reason, pick)
        }
        None => (
            SeriesStatus::Unknown,
            format!(
                "no status-relevant filings; latest form {} does not drive status",
                latest.raw_form
            ),
            None,
        ),
    };

    let (effective_date, effective_date_source, effective_date_confidence) = match date_pick {
        Some(f) => (f.initial_effective_date, f.source, f.confidence),
        None => (None, DateSource::Unknown, Confidence::None),
    };

    // Last material change: the latest such date any finding produced.
    let last_material_change_date = filings
        .iter()
        .filter_map(|f| f.finding.last_material_change_date)
        .max();

    let (ticker, ticker_method) = pick_ticker(&filings);

    let class_id = filings
        .iter()
        .rev()
        .find_map(|f| f.observation.class_id.clone());

    // Current name: the history's latest record; absent a history (no
    // usable names anywhere), fall back to the latest header name.
    let name = history
        .current_name()
        .map(|n| n.to_string())
        .unwrap_or_else(|| latest.observation.series_name.clone());
    let brand = registry::classify_brand(&name, trust_name);

    Some(SeriesState {
        series_id: series_id.to_string(),
        trust_cik: trust_cik.to_string(),
        trust_name: trust_name.to_string(),
        name,
        brand,
        class_id,
        ticker,
        ticker_method,
        status,
        status_reason,
        effective_date,
        effective_date_confidence,
        effective_date_source,
        last_material_change_date,
        latest_form: latest.raw_form.clone(),
        latest_filing_date: latest.filing_date,
        latest_accession: latest.accession.clone(),
        first_seen_date: first.filing_date,
        first_seen_form: first.raw_form.clone(),
        first_seen_accession: first.accession.clone(),
        flagged_for_review: history.flagged_for_review,
    })
}

/// EFFECTIVE: the earliest resolvable initial date across the whole
/// history. A fund launches once; later restatements don't move it.
fn earliest_initial<'a>(filings: &'a [SeriesFiling]) -> Option<&'a EffectiveDateFinding> {
    filings
        .iter()
        .filter(|f| f.finding.initial_effective_date.is_some())
        .min_by_key(|f| f.finding.initial_effective_date)
        .map(|f| &f.finding)
}

/// PENDING: the most trustworthy claim wins; among equals, the most
/// recent filing speaks for the fund's current plans.
fn best_initial<'a>(filings: &'a [SeriesFiling]) -> Option<&'a EffectiveDateFinding> {
    filings
        .iter()
        .filter(|f| f.finding.initial_effective_date.is_some())
        .max_by_key(|f| (f.finding.confidence, f.filing_date, f.accession.clone()))
        .map(|f| &f.finding)
}

/// DELAYED: the extension itself names the new date when it names one;
/// otherwise fall back to the best claim on record.
fn pick_delayed_date<'a>(
    extension: &'a SeriesFiling,
    filings: &'a [SeriesFiling],
) -> Option<&'a EffectiveDateFinding> {
    if extension.finding.initial_effective_date.is_some() {
        return Some(&extension.finding);
    }
    best_initial(filings)
}

/// Ticker precedence: the most recent header tag beats everything; body
/// extraction only speaks when no header ever carried the symbol.
fn pick_ticker(filings: &[SeriesFiling]) -> (Option<String>, Option<TickerMethod>) {
    for f in filings.iter().rev() {
        if let Some(t) = &f.observation.header_ticker {
            return (Some(t.clone()), Some(TickerMethod::HeaderTag));
        }
    }
    for f in filings.iter().rev() {
        if let Some(find) = &f.observation.body_ticker {
            return (Some(find.ticker.clone()), Some(find.method));
        }
    }
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::effective_date;
    use crate::models::{FilingExtraction, TickerFind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs() -> SeriesObservation {
        SeriesObservation {
            series_id: "S000086222".into(),
            series_name: "Tuttle Capital 2X Long AI ETF".into(),
            class_id: Some("C000097592".into()),
            class_name: Some("Tuttle Capital 2X Long AI ETF".into()),
            header_ticker: None,
            body_ticker: None,
            prospectus_name: None,
            order: 0,
        }
    }

    /// Build a SeriesFiling by running the real resolver, so these tests
    /// exercise the ladder and the state machine together.
    fn filing(accession: &str, raw_form: &str, filing_date: NaiveDate) -> SeriesFiling {
        let ex = FilingExtraction {
            accession: accession.to_string(),
            cik: "1771146".into(),
            raw_form: raw_form.to_string(),
            form: FormType::parse(raw_form),
            filing_date,
            header_effectiveness: None,
            body_date: None,
            delaying_amendment: false,
            series: Vec::new(),
            malformed_header: false,
        };
        let finding = effective_date::resolve(&ex, "S000086222", &Config::default());
        SeriesFiling {
            accession: accession.to_string(),
            raw_form: raw_form.to_string(),
            form: ex.form,
            filing_date,
            observation: obs(),
            finding,
            delaying_amendment: false,
        }
    }

    fn roll(filings: Vec<SeriesFiling>) -> SeriesState {
        rollup_series(
            "S000086222",
            "1771146",
            "ETF Opportunities Trust",
            filings,
            &NameHistory::default(),
        )
        .unwrap()
    }

    #[test]
    fn lone_registration_is_pending_with_projected_date() {
        let state = roll(vec![filing("0001-24-000001", "N-1A", date(2024, 1, 1))]);
        assert_eq!(state.status, SeriesStatus::Pending);
        assert_eq!(state.effective_date, Some(date(2024, 3, 16)));
        assert_eq!(state.effective_date_confidence, Confidence::Low);
        assert_eq!(state.effective_date_source, DateSource::WaitingPeriodDefault);
        assert_eq!(state.last_material_change_date, None);
    }

    #[test]
    fn post_effective_amendment_flips_to_effective_without_moving_launch_date() {
        let state = roll(vec![
            filing("0001-24-000001", "N-1A", date(2024, 1, 1)),
            filing("0001-24-000002", "485BPOS", date(2024, 6, 1)),
        ]);
        assert_eq!(state.status, SeriesStatus::Effective);
        // Earliest resolvable initial date, NOT the amendment's filing date.
        assert_eq!(state.effective_date, Some(date(2024, 3, 16)));
        assert_eq!(state.last_material_change_date, Some(date(2024, 6, 1)));
        assert_eq!(state.latest_form, "485BPOS");
    }

    #[test]
    fn latest_extension_means_delayed_with_designated_date() {
        let mut ext = filing("0001-25-000002", "485BXT", date(2025, 10, 30));
        ext.finding = EffectiveDateFinding {
            accession: ext.accession.clone(),
            series_id: "S000086222".into(),
            initial_effective_date: Some(date(2025, 11, 7)),
            last_material_change_date: None,
            source: DateSource::DesignationProse,
            confidence: Confidence::High,
        };
        let state = roll(vec![
            filing("0001-25-000001", "N-1A", date(2025, 1, 1)),
            ext,
        ]);
        assert_eq!(state.status, SeriesStatus::Delayed);
        assert_eq!(state.effective_date, Some(date(2025, 11, 7)));
        assert_eq!(state.effective_date_confidence, Confidence::High);
    }

    #[test]
    fn post_effective_filed_after_extension_supersedes_the_delay() {
        let state = roll(vec![
            filing("0001-25-000001", "N-1A", date(2025, 1, 1)),
            filing("0001-25-000002", "485BXT", date(2025, 3, 1)),
            filing("0001-25-000003", "485BPOS", date(2025, 6, 1)),
        ]);
        assert_eq!(state.status, SeriesStatus::Effective);
    }

    #[test]
    fn extension_after_post_effective_still_delays() {
        // Rule order: the extension being most recent wins over the
        // existence of an old 485BPOS.
        let state = roll(vec![
            filing("0001-24-000001", "485BPOS", date(2024, 6, 1)),
            filing("0001-25-000002", "485BXT", date(2025, 3, 1)),
        ]);
        assert_eq!(state.status, SeriesStatus::Delayed);
    }

    #[test]
    fn prospectus_only_history_is_unknown() {
        let state = roll(vec![filing("0001-24-000001", "497K", date(2024, 5, 1))]);
        assert_eq!(state.status, SeriesStatus::Unknown);
        assert_eq!(state.effective_date, None);
        assert_eq!(state.effective_date_confidence, Confidence::None);
    }

    #[test]
    fn rollup_is_a_pure_function_of_the_history() {
        let a = filing("0001-24-000001", "N-1A", date(2024, 1, 1));
        let b = filing("0001-24-000002", "485BXT", date(2024, 4, 1));
        let c = filing("0001-24-000003", "485BPOS", date(2024, 8, 1));
        let forward = roll(vec![a.clone(), b.clone(), c.clone()]);
        let shuffled = roll(vec![c, a, b]);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn header_ticker_outranks_body_ticker() {
        let mut early = filing("0001-24-000001", "N-1A", date(2024, 1, 1));
        early.observation.body_ticker = Some(TickerFind {
            ticker: "WRNG".into(),
            method: TickerMethod::LabelWindow,
        });
        let mut late = filing("0001-24-000002", "485BPOS", date(2024, 6, 1));
        late.observation.header_ticker = Some("QQQX".into());
        let state = roll(vec![early, late]);
        assert_eq!(state.ticker.as_deref(), Some("QQQX"));
        assert_eq!(state.ticker_method, Some(TickerMethod::HeaderTag));
    }

    #[test]
    fn body_ticker_fills_in_when_header_never_carried_one() {
        let mut f = filing("0001-24-000001", "N-1A", date(2024, 1, 1));
        f.observation.body_ticker = Some(TickerFind {
            ticker: "QQQX".into(),
            method: TickerMethod::TitleParen,
        });
        let state = roll(vec![f]);
        assert_eq!(state.ticker.as_deref(), Some("QQQX"));
        assert_eq!(state.ticker_method, Some(TickerMethod::TitleParen));
    }

    #[test]
    fn brand_is_classified_from_the_current_name() {
        let state = roll(vec![filing("0001-24-000001", "N-1A", date(2024, 1, 1))]);
        assert_eq!(state.brand, "Tuttle");
        assert_eq!(state.trust_name, "ETF Opportunities Trust");
    }
}

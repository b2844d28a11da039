// =============================================================================
// pipeline.rs — THE ASSEMBLY LINE
// =============================================================================
//
// The full batch run, in three phases:
//
//   PHASE 1 — EXTRACT (parallel). Every filing bundle is independent, so
//   rayon fans them out across cores. Each worker parses the SGML header,
//   runs the body-text strategy mines, and ships one immutable
//   FilingExtraction down a lock-free crossbeam channel. Duplicate
//   accessions are dropped at the door: the same filing showing up twice
//   in the input directory must not double its testimony.
//
//   PHASE 2 — RECONCILE (parallel per series). Extractions are regrouped
//   by permanent Series ID, each series' sightings get sorted into a
//   name history, every (filing, series) pair goes through the
//   effective-date ladder, and the rollup state machine renders a verdict.
//
//   PHASE 3 — EMIT. Three JSON documents, deterministically ordered:
//   fund status, name history, extraction audit. Plus the metrics
//   snapshot, because a batch job that doesn't report its own numbers
//   is a batch job you end up debugging at 2am.
//
// Nothing in here is fatal per-filing. A bundle that won't deserialize is
// logged and skipped; a header that won't parse flows through with a
// malformed flag. The batch finishes. Always.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::effective_date;
use crate::error::ExtractionError;
use crate::extractors::{self, name_rows, ticker};
use crate::header_parser;
use crate::metrics::MetricsCollector;
use crate::models::{
    ExtractionAudit, FilingBundle, FilingExtraction, NameRecord, SeriesObservation, SeriesState,
};
use crate::reconciler::{self, SeriesSighting};
use crate::registry::TrustRegistry;
use crate::rollup::{self, SeriesFiling};

/// Everything one run produces, before it hits disk.
#[derive(Debug)]
pub struct RunOutput {
    pub states: Vec<SeriesState>,
    pub name_records: Vec<NameRecord>,
    pub audits: Vec<ExtractionAudit>,
}

/// Admission control for the parallel phase: one voice per accession.
struct AdmissionGate {
    seen: Mutex<HashSet<String>>,
}

impl AdmissionGate {
    fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// True exactly once per accession, no matter how many workers ask.
    fn admit(&self, accession: &str) -> bool {
        self.seen.lock().insert(accession.to_string())
    }
}

/// Run the whole pipeline: load bundles, extract, reconcile, roll up.
pub fn run(cfg: &Config, registry: &TrustRegistry, metrics: &MetricsCollector) -> Result<RunOutput> {
    let bundles = load_bundles(&cfg.input_dir)?;
    info!(count = bundles.len(), "filing bundles loaded");

    // ═══════════════════════════════════════════
    // PHASE 1: PARALLEL EXTRACTION
    // ═══════════════════════════════════════════
    let gate = AdmissionGate::new();
    let (tx, rx) = crossbeam_channel::unbounded::<FilingExtraction>();

    bundles.par_iter().for_each_with(tx.clone(), |tx, bundle| {
        if !gate.admit(&bundle.accession) {
            debug!(accession = %bundle.accession, "duplicate accession skipped");
            metrics.increment_deduplicated();
            return;
        }
        let extraction = extract_filing(bundle, cfg, metrics);
        // The receiver outlives every sender; a send failure here would
        // mean the collector vanished, which cannot happen in this shape.
        let _ = tx.send(extraction);
    });
    drop(tx);

    let mut extractions: Vec<FilingExtraction> = rx.iter().collect();
    extractions.sort_by(|a, b| {
        (a.filing_date, a.accession.as_str()).cmp(&(b.filing_date, b.accession.as_str()))
    });
    info!(count = extractions.len(), "filings extracted");

    // ═══════════════════════════════════════════
    // PHASE 2: PER-SERIES RECONCILIATION
    // ═══════════════════════════════════════════
    let mut per_series: HashMap<String, Vec<SeriesFiling>> = HashMap::new();
    let mut series_cik: HashMap<String, String> = HashMap::new();
    let mut obs_seen: HashSet<String> = HashSet::new();

    for ex in &extractions {
        for obs in &ex.series {
            // Observation-level dedup: the same (filing, series, class,
            // name, ticker) tuple only testifies once.
            let key = format!(
                "{}|{}|{}|{}|{}",
                ex.accession,
                obs.series_id,
                obs.class_id.as_deref().unwrap_or(""),
                obs.series_name,
                obs.header_ticker.as_deref().unwrap_or("")
            );
            if !obs_seen.insert(key) {
                metrics.increment_deduplicated();
                continue;
            }

            let finding = effective_date::resolve(ex, &obs.series_id, cfg);
            metrics.increment_date_confidence(finding.confidence);

            // Extractions are date-sorted, so the last write per series
            // is the most recent filer's CIK.
            series_cik.insert(obs.series_id.clone(), ex.cik.clone());
            per_series
                .entry(obs.series_id.clone())
                .or_default()
                .push(SeriesFiling {
                    accession: ex.accession.clone(),
                    raw_form: ex.raw_form.clone(),
                    form: ex.form.clone(),
                    filing_date: ex.filing_date,
                    observation: obs.clone(),
                    finding,
                    delaying_amendment: ex.delaying_amendment,
                });
        }
    }

    let mut series_ids: Vec<String> = per_series.keys().cloned().collect();
    series_ids.sort();
    info!(count = series_ids.len(), "distinct series observed");

    let results: Vec<(SeriesState, Vec<NameRecord>)> = series_ids
        .par_iter()
        .filter_map(|sid| {
            let filings = per_series.get(sid)?.clone();
            let cik = series_cik.get(sid).cloned().unwrap_or_default();
            let trust_name = registry.trust_name(&cik);

            let sightings: Vec<SeriesSighting> = filings
                .iter()
                .map(|f| SeriesSighting {
                    accession: f.accession.clone(),
                    raw_form: f.raw_form.clone(),
                    filing_date: f.filing_date,
                    observation: f.observation.clone(),
                })
                .collect();
            let history = reconciler::build_name_history(sid, sightings);
            if history.records.len() > 1 {
                for _ in 1..history.records.len() {
                    metrics.increment_name_changes();
                }
            }
            if history.flagged_for_review {
                metrics.increment_collisions();
            }

            let state = rollup::rollup_series(sid, &cik, &trust_name, filings, &history)?;
            Some((state, history.records))
        })
        .collect();

    // ═══════════════════════════════════════════
    // PHASE 3: DETERMINISTIC ASSEMBLY
    // ═══════════════════════════════════════════
    let mut states = Vec::with_capacity(results.len());
    let mut name_records = Vec::new();
    for (state, records) in results {
        states.push(state);
        name_records.extend(records);
    }
    states.sort_by(|a, b| a.series_id.cmp(&b.series_id));
    name_records.sort_by(|a, b| {
        (a.series_id.as_str(), a.effective_from, a.source_accession.as_str())
            .cmp(&(b.series_id.as_str(), b.effective_from, b.source_accession.as_str()))
    });

    let audits = build_audits(&per_series);

    Ok(RunOutput {
        states,
        name_records,
        audits,
    })
}

/// Extract everything extractable from one filing bundle. Pure with
/// respect to the bundle; all shared state is the metrics collector.
pub fn extract_filing(
    bundle: &FilingBundle,
    cfg: &Config,
    metrics: &MetricsCollector,
) -> FilingExtraction {
    metrics.increment_filings();

    let header = header_parser::parse_header(&bundle.header_text);
    if header.malformed {
        let err = ExtractionError::MalformedInput {
            accession: bundle.accession.clone(),
            detail: "series markup present but no block parsed".into(),
        };
        warn!(error = %err, "header degraded to empty parse");
        metrics.increment_malformed_headers();
    }

    let body_norm = extractors::normalize_spacing(&bundle.body_text);
    let body_lower = body_norm.to_lowercase();

    let delaying_amendment = extractors::delaying::detect_delaying_amendment(&body_norm);
    if delaying_amendment {
        metrics.increment_delaying_amendments();
    }
    let body_date = extractors::dates::extract_date(&body_norm);

    // Prospectus name/ticker table rows come from the RAW text; the
    // column gaps the scraper keys on do not survive normalization.
    let rows = name_rows::extract_name_rows(&bundle.body_text, cfg);

    let series = header
        .blocks
        .iter()
        .map(|block| {
            metrics.increment_observations();

            let header_ticker = block.ticker.clone();
            if header_ticker.is_some() {
                metrics.increment_ticker_method(crate::models::TickerMethod::HeaderTag);
            }

            // Body extraction only runs when the header came up empty.
            // The header tag is authoritative; arguing with it wastes cores.
            let body_ticker = if header_ticker.is_none() {
                let find = ticker::extract_ticker(
                    &body_norm,
                    &body_lower,
                    &block.series_id,
                    &block.series_name,
                    cfg,
                    &bundle.accession,
                );
                if let Some(f) = &find {
                    metrics.increment_ticker_method(f.method);
                }
                find
            } else {
                None
            };

            // Attach the prospectus display name by ticker equality:
            // a table row wearing this fund's symbol is talking about
            // this fund, whatever it chooses to call it.
            let known_ticker = header_ticker
                .as_deref()
                .or(body_ticker.as_ref().map(|f| f.ticker.as_str()));
            let prospectus_name = known_ticker.and_then(|t| {
                rows.iter()
                    .find(|r| r.ticker == t)
                    .map(|r| r.name.clone())
            });

            SeriesObservation {
                series_id: block.series_id.clone(),
                series_name: block.series_name.clone(),
                class_id: block.class_id.clone(),
                class_name: block.class_name.clone(),
                header_ticker,
                body_ticker,
                prospectus_name,
                order: block.order,
            }
        })
        .collect();

    FilingExtraction {
        accession: bundle.accession.clone(),
        cik: bundle.cik.clone(),
        raw_form: bundle.form.clone(),
        form: crate::models::FormType::parse(&bundle.form),
        filing_date: bundle.filing_date,
        header_effectiveness: header.effectiveness_date,
        body_date,
        delaying_amendment,
        series,
        malformed_header: header.malformed,
    }
}

/// One audit row per (filing, series): what was found, by which strategy.
fn build_audits(per_series: &HashMap<String, Vec<SeriesFiling>>) -> Vec<ExtractionAudit> {
    let mut audits: Vec<ExtractionAudit> = per_series
        .values()
        .flatten()
        .map(|f| {
            let (ticker_found, ticker_method) = match (&f.observation.header_ticker, &f.observation.body_ticker) {
                (Some(t), _) => (Some(t.clone()), Some(crate::models::TickerMethod::HeaderTag)),
                (None, Some(find)) => (Some(find.ticker.clone()), Some(find.method)),
                (None, None) => (None, None),
            };
            ExtractionAudit {
                id: uuid::Uuid::new_v4(),
                accession: f.accession.clone(),
                series_id: f.observation.series_id.clone(),
                ticker_found,
                ticker_method,
                date_found: f
                    .finding
                    .initial_effective_date
                    .or(f.finding.last_material_change_date),
                date_method: f.finding.source,
                delaying_amendment_flag: f.delaying_amendment,
            }
        })
        .collect();
    audits.sort_by(|a, b| {
        (a.accession.as_str(), a.series_id.as_str()).cmp(&(b.accession.as_str(), b.series_id.as_str()))
    });
    audits
}

/// Load every *.json filing bundle under the input directory. Files that
/// refuse to deserialize are logged and skipped; the batch goes on.
pub fn load_bundles(input_dir: &Path) -> Result<Vec<FilingBundle>> {
    let mut bundles = Vec::new();
    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("reading input directory {}", input_dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", input_dir.display()))?;
        let path = entry.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable bundle skipped");
                continue;
            }
        };
        match serde_json::from_str::<FilingBundle>(&raw) {
            Ok(bundle) => bundles.push(bundle),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "undeserializable bundle skipped");
            }
        }
    }

    // Deterministic processing order regardless of directory iteration.
    bundles.sort_by(|a, b| {
        (a.filing_date, a.accession.as_str()).cmp(&(b.filing_date, b.accession.as_str()))
    });
    Ok(bundles)
}

/// Write the three output documents plus the metrics snapshot.
pub fn write_outputs(
    cfg: &Config,
    output: &RunOutput,
    metrics: &MetricsCollector,
) -> Result<()> {
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating output directory {}", cfg.output_dir.display()))?;

    write_json(&cfg.output_dir.join("fund_status.json"), &output.states)?;
    write_json(&cfg.output_dir.join("name_history.json"), &output.name_records)?;
    write_json(&cfg.output_dir.join("extraction_audit.json"), &output.audits)?;
    write_json(&cfg.output_dir.join("run_metrics.json"), &metrics.snapshot())?;

    info!(
        dir = %cfg.output_dir.display(),
        funds = output.states.len(),
        name_records = output.name_records.len(),
        audit_rows = output.audits.len(),
        "output documents written"
    );
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, SeriesStatus, TickerMethod};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header_for(series_id: &str, name: &str, ticker: Option<&str>) -> String {
        let ticker_line = ticker
            .map(|t| format!("<CLASS-CONTRACT-TICKER-SYMBOL>{}\n", t))
            .unwrap_or_default();
        format!(
            "<SERIES>\n<SERIES-ID>{}\n<SERIES-NAME>{}\n<CLASS-CONTRACT>\n<CLASS-CONTRACT-ID>C000097592\n<CLASS-CONTRACT-NAME>{}\n{}</CLASS-CONTRACT>\n</SERIES>\n",
            series_id, name, name, ticker_line
        )
    }

    fn bundle(
        accession: &str,
        form: &str,
        filing_date: NaiveDate,
        header: &str,
        body: &str,
    ) -> FilingBundle {
        FilingBundle {
            accession: accession.to_string(),
            cik: "1771146".into(),
            form: form.to_string(),
            filing_date,
            header_text: header.to_string(),
            body_text: body.to_string(),
        }
    }

    /// Stage the bundles in a throwaway input directory and run the
    /// full pipeline over them.
    fn run_on(bundles: Vec<FilingBundle>) -> RunOutput {
        let cfg = Config::default();
        let metrics = MetricsCollector::new();
        let registry = TrustRegistry::builtin();

        let dir = std::env::temp_dir().join(format!("etp-launch-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        for b in &bundles {
            let path = dir.join(format!("{}.json", b.accession));
            fs::write(&path, serde_json::to_string(b).unwrap()).unwrap();
        }

        let cfg = Config {
            input_dir: dir.clone(),
            ..cfg
        };
        let out = run(&cfg, &registry, &metrics).unwrap();
        let _ = fs::remove_dir_all(&dir);
        out
    }

    #[test]
    fn registration_then_amendment_yields_effective_fund() {
        let out = run_on(vec![
            bundle(
                "0001-24-000001",
                "N-1A",
                date(2024, 1, 1),
                &header_for("S000086222", "Tuttle Capital 2X Long AI ETF", None),
                "Prospectus for the Tuttle Capital 2X Long AI ETF (QQQX). No dates stated.",
            ),
            bundle(
                "0001-24-000002",
                "485BPOS",
                date(2024, 6, 1),
                &header_for("S000086222", "Tuttle Capital 2X Long AI ETF", Some("QQQX")),
                "Updated prospectus text.",
            ),
        ]);

        assert_eq!(out.states.len(), 1);
        let s = &out.states[0];
        assert_eq!(s.status, SeriesStatus::Effective);
        // Launch date is the N-1A's projected date, not the 485BPOS filing date.
        assert_eq!(s.effective_date, Some(date(2024, 3, 16)));
        assert_eq!(s.effective_date_confidence, Confidence::Low);
        assert_eq!(s.last_material_change_date, Some(date(2024, 6, 1)));
        // Header ticker from the later filing wins.
        assert_eq!(s.ticker.as_deref(), Some("QQQX"));
        assert_eq!(s.ticker_method, Some(TickerMethod::HeaderTag));
        assert_eq!(s.trust_name, "ETF Opportunities Trust");
        assert_eq!(s.brand, "Tuttle");
    }

    #[test]
    fn extension_with_designated_date_reports_delayed() {
        let out = run_on(vec![
            bundle(
                "0001-25-000001",
                "N-1A",
                date(2025, 1, 1),
                &header_for("S000090001", "T-REX 2X Long SCCO Daily Target ETF", None),
                "The Registrant hereby files a delaying amendment pursuant to Rule 473.",
            ),
            bundle(
                "0001-25-000002",
                "485BXT",
                date(2025, 10, 30),
                &header_for("S000090001", "T-REX 2X Long SCCO Daily Target ETF", None),
                "The Registrant is designating November 7, 2025 as the new effective date.",
            ),
        ]);

        let s = &out.states[0];
        assert_eq!(s.status, SeriesStatus::Delayed);
        assert_eq!(s.effective_date, Some(date(2025, 11, 7)));
        assert_eq!(s.effective_date_confidence, Confidence::High);
        assert_eq!(s.brand, "T-REX");
    }

    #[test]
    fn prospectus_rename_shows_up_in_name_history() {
        let body_with_table = "\
Fund Name                                         Ticker
T-REX 2X Long AI Daily Target ETF                 QQQX
";
        let out = run_on(vec![
            bundle(
                "0001-24-000001",
                "N-1A",
                date(2024, 1, 1),
                &header_for("S000086222", "Tuttle Capital Daily 2X Long AI ETF", Some("QQQX")),
                "Initial prospectus.",
            ),
            bundle(
                "0001-25-000002",
                "485APOS",
                date(2025, 3, 1),
                &header_for("S000086222", "Tuttle Capital Daily 2X Long AI ETF", Some("QQQX")),
                body_with_table,
            ),
        ]);

        let records: Vec<_> = out
            .name_records
            .iter()
            .filter(|r| r.series_id == "S000086222")
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Tuttle Capital Daily 2X Long AI ETF");
        assert_eq!(records[0].effective_to, Some(date(2025, 3, 1)));
        assert_eq!(records[1].name, "T-REX 2X Long AI Daily Target ETF");
        assert_eq!(records[1].effective_to, None);
        // The rolled-up state wears the new name and the new brand.
        assert_eq!(out.states[0].name, "T-REX 2X Long AI Daily Target ETF");
        assert_eq!(out.states[0].brand, "T-REX");
    }

    #[test]
    fn duplicate_accessions_do_not_double_testify() {
        let b = bundle(
            "0001-24-000001",
            "N-1A",
            date(2024, 1, 1),
            &header_for("S000086222", "Tuttle Capital 2X Long AI ETF", None),
            "Plain body.",
        );
        // Same accession under a different file name.
        let twin = b.clone();

        let cfg = Config::default();
        let metrics = MetricsCollector::new();
        let registry = TrustRegistry::builtin();
        let dir = std::env::temp_dir().join(format!("etp-launch-test-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.json"), serde_json::to_string(&b).unwrap()).unwrap();
        fs::write(dir.join("b.json"), serde_json::to_string(&twin).unwrap()).unwrap();
        let cfg = Config {
            input_dir: dir.clone(),
            ..cfg
        };
        let out = run(&cfg, &registry, &metrics).unwrap();
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(out.audits.len(), 1);
        assert_eq!(metrics.snapshot().observations_deduplicated, 1);
    }

    #[test]
    fn malformed_header_filing_flows_through_without_series() {
        let out = run_on(vec![bundle(
            "0001-24-000001",
            "485BPOS",
            date(2024, 6, 1),
            "<SERIES-ID>GARBAGE\n",
            "Body text.",
        )]);
        // No series could be identified, so no state is produced, but
        // the run itself succeeds.
        assert!(out.states.is_empty());
    }

    #[test]
    fn audit_rows_cite_strategy_and_flag() {
        let out = run_on(vec![bundle(
            "0001-24-000001",
            "N-1A",
            date(2024, 1, 1),
            &header_for("S000086222", "Tuttle Capital 2X Long AI ETF", None),
            "Prospectus for the Tuttle Capital 2X Long AI ETF (QQQX).",
        )]);
        assert_eq!(out.audits.len(), 1);
        let a = &out.audits[0];
        assert_eq!(a.ticker_found.as_deref(), Some("QQQX"));
        assert_eq!(a.ticker_method, Some(TickerMethod::TitleParen));
        assert_eq!(a.date_found, Some(date(2024, 3, 16)));
    }
}

// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - Because if you can't measure it, it didn't happen
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters for everything. Lock-free because the extraction phase
// hammers these from every rayon worker at once and a mutex here would
// be the slowest thing in the building.
//
// This is a batch pipeline, so instead of an HTTP endpoint the snapshot
// gets serialized to JSON alongside the output documents and logged at
// the end of the run. We still keep:
// - Atomic counters (no locks, no mutexes, PURE ATOMICS)
// - Per-strategy breakdowns for tickers and dates
// - Throughput calculations
// - JSON serialization of every metric

use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use std::time::Instant;

/// The metrics snapshot - what gets serialized to JSON
#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub filings_processed: u64,
    pub filings_malformed_header: u64,
    pub series_observations: u64,
    pub observations_deduplicated: u64,
    pub tickers_from_header: u64,
    pub tickers_from_title_paren: u64,
    pub tickers_from_label_window: u64,
    pub dates_high_confidence: u64,
    pub dates_medium_confidence: u64,
    pub dates_low_confidence: u64,
    pub dates_unresolved: u64,
    pub delaying_amendments: u64,
    pub name_changes_recorded: u64,
    pub collisions_flagged: u64,
    pub elapsed_seconds: u64,
    pub filings_per_minute: f64,
    pub status: String,
}

/// Thread-safe atomic metrics collector
/// Every counter is atomic because mutexes are for the weak
pub struct MetricsCollector {
    filings_processed: AtomicU64,
    filings_malformed_header: AtomicU64,
    series_observations: AtomicU64,
    observations_deduplicated: AtomicU64,
    tickers_from_header: AtomicU64,
    tickers_from_title_paren: AtomicU64,
    tickers_from_label_window: AtomicU64,
    dates_high_confidence: AtomicU64,
    dates_medium_confidence: AtomicU64,
    dates_low_confidence: AtomicU64,
    dates_unresolved: AtomicU64,
    delaying_amendments: AtomicU64,
    name_changes_recorded: AtomicU64,
    collisions_flagged: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            filings_processed: AtomicU64::new(0),
            filings_malformed_header: AtomicU64::new(0),
            series_observations: AtomicU64::new(0),
            observations_deduplicated: AtomicU64::new(0),
            tickers_from_header: AtomicU64::new(0),
            tickers_from_title_paren: AtomicU64::new(0),
            tickers_from_label_window: AtomicU64::new(0),
            dates_high_confidence: AtomicU64::new(0),
            dates_medium_confidence: AtomicU64::new(0),
            dates_low_confidence: AtomicU64::new(0),
            dates_unresolved: AtomicU64::new(0),
            delaying_amendments: AtomicU64::new(0),
            name_changes_recorded: AtomicU64::new(0),
            collisions_flagged: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_filings(&self) {
        self.filings_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_headers(&self) {
        self.filings_malformed_header.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_observations(&self) {
        self.series_observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deduplicated(&self) {
        self.observations_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ticker_method(&self, method: crate::models::TickerMethod) {
        use crate::models::TickerMethod::*;
        match method {
            HeaderTag => { self.tickers_from_header.fetch_add(1, Ordering::Relaxed); }
            TitleParen => { self.tickers_from_title_paren.fetch_add(1, Ordering::Relaxed); }
            LabelWindow => { self.tickers_from_label_window.fetch_add(1, Ordering::Relaxed); }
        }
    }

    pub fn increment_date_confidence(&self, confidence: crate::models::Confidence) {
        use crate::models::Confidence::*;
        match confidence {
            High => { self.dates_high_confidence.fetch_add(1, Ordering::Relaxed); }
            Medium => { self.dates_medium_confidence.fetch_add(1, Ordering::Relaxed); }
            Low => { self.dates_low_confidence.fetch_add(1, Ordering::Relaxed); }
            None => { self.dates_unresolved.fetch_add(1, Ordering::Relaxed); }
        }
    }

    pub fn increment_delaying_amendments(&self) {
        self.delaying_amendments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_name_changes(&self) {
        self.name_changes_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_collisions(&self) {
        self.collisions_flagged.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all metrics (lock-free reads)
    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.start_time.elapsed().as_secs();
        let filings = self.filings_processed.load(Ordering::Relaxed);
        let filings_per_minute = if elapsed > 0 {
            (filings as f64 / elapsed as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            filings_processed: filings,
            filings_malformed_header: self.filings_malformed_header.load(Ordering::Relaxed),
            series_observations: self.series_observations.load(Ordering::Relaxed),
            observations_deduplicated: self.observations_deduplicated.load(Ordering::Relaxed),
            tickers_from_header: self.tickers_from_header.load(Ordering::Relaxed),
            tickers_from_title_paren: self.tickers_from_title_paren.load(Ordering::Relaxed),
            tickers_from_label_window: self.tickers_from_label_window.load(Ordering::Relaxed),
            dates_high_confidence: self.dates_high_confidence.load(Ordering::Relaxed),
            dates_medium_confidence: self.dates_medium_confidence.load(Ordering::Relaxed),
            dates_low_confidence: self.dates_low_confidence.load(Ordering::Relaxed),
            dates_unresolved: self.dates_unresolved.load(Ordering::Relaxed),
            delaying_amendments: self.delaying_amendments.load(Ordering::Relaxed),
            name_changes_recorded: self.name_changes_recorded.load(Ordering::Relaxed),
            collisions_flagged: self.collisions_flagged.load(Ordering::Relaxed),
            elapsed_seconds: elapsed,
            filings_per_minute,
            status: "operational".to_string(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, TickerMethod};

    #[test]
    fn counters_land_in_the_right_buckets() {
        let m = MetricsCollector::new();
        m.increment_filings();
        m.increment_filings();
        m.increment_ticker_method(TickerMethod::TitleParen);
        m.increment_date_confidence(Confidence::High);
        m.increment_date_confidence(Confidence::None);

        let snap = m.snapshot();
        assert_eq!(snap.filings_processed, 2);
        assert_eq!(snap.tickers_from_title_paren, 1);
        assert_eq!(snap.tickers_from_header, 0);
        assert_eq!(snap.dates_high_confidence, 1);
        assert_eq!(snap.dates_unresolved, 1);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snap = MetricsCollector::new().snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("filings_processed"));
        assert!(json.contains("operational"));
    }
}

// =============================================================================
// config.rs — THE GRAND CONFIGURATION CATHEDRAL
// =============================================================================
//
// Every system needs configuration, but not every system needs THIS MUCH
// configuration. We have knobs for knobs. Character windows for character
// windows. Waiting periods for waiting periods.
//
// All values can be overridden via environment variables prefixed with
// ETP_LAUNCH_, because hardcoding configuration is how you end up on the
// front page of Hacker News for the wrong reasons.
//
// Default values have been carefully chosen through a rigorous process of
// "that's what the securities regulations actually say" and "600 characters
// is how far a ticker ever strays from its fund name in the wild."
// =============================================================================

use std::env;
use std::path::PathBuf;

/// The Grand Configuration Struct. Every tunable parameter in the entire
/// engine lives here. Think of it as the cockpit of the reconciliation
/// pipeline, except instead of weapons systems you're controlling how
/// suspicious we are of tickers named "THE".
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // I/O DIRECTORIES
    // The fetch/cache collaborator drops filing bundles here; we drop
    // rolled-up truth there. No sockets were harmed in this exchange.
    // =========================================================================

    /// Directory of cached filing bundles (one JSON file per filing),
    /// produced by the external fetch layer. Default: ./filings
    pub input_dir: PathBuf,

    /// Directory where the engine writes its three output documents
    /// (fund status, name history, extraction audit). Default: ./outputs
    pub output_dir: PathBuf,

    // =========================================================================
    // TEXT EXTRACTOR PARAMETERS
    // =========================================================================

    /// How far (in characters) a "Ticker:" / "Trading Symbol:" label may
    /// sit from a fund-name occurrence and still count as belonging to it.
    /// Default: 600. Empirically, prospectus cover pages never put the
    /// label further away than this; beyond it you start stealing the
    /// neighboring fund's ticker.
    pub ticker_label_window: usize,

    /// Minimum and maximum length of a plausible ticker symbol.
    /// Defaults: 1 and 6. NYSE Arca does not list "QQQQQQQ".
    pub ticker_min_len: usize,
    pub ticker_max_len: usize,

    // =========================================================================
    // EFFECTIVE-DATE RESOLVER PARAMETERS
    // The regulatory waiting periods. These come straight from the rules:
    // Rule 485(a) gives open-end fund amendments a 75-day automatic clock,
    // and S-1/S-3 style registrations conventionally run 60 days.
    // =========================================================================

    /// Automatic effectiveness offset for N-1A / 485APOS filings, in days.
    pub n1a_waiting_days: i64,

    /// Automatic effectiveness offset for S-1 / S-3 registrations, in days.
    pub shelf_waiting_days: i64,

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    /// Number of rayon worker threads for the extraction phase.
    /// 0 means "let rayon figure it out", which it is very good at.
    pub extraction_threads: usize,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    /// "Sensible" here meaning "will work out of the box without any env
    /// vars but will also respect your wishes if you set them."
    pub fn from_env() -> Self {
        // Try to load .env file if it exists. Fail silently if it doesn't,
        // because not everyone has their life together enough to create one.
        let _ = dotenvy::dotenv();

        Config {
            input_dir: PathBuf::from(env_or_default("ETP_LAUNCH_INPUT_DIR", "filings")),
            output_dir: PathBuf::from(env_or_default("ETP_LAUNCH_OUTPUT_DIR", "outputs")),

            ticker_label_window: env_or_default("ETP_LAUNCH_TICKER_WINDOW", "600")
                .parse()
                .unwrap_or(600),
            ticker_min_len: env_or_default("ETP_LAUNCH_TICKER_MIN_LEN", "1")
                .parse()
                .unwrap_or(1),
            ticker_max_len: env_or_default("ETP_LAUNCH_TICKER_MAX_LEN", "6")
                .parse()
                .unwrap_or(6),

            n1a_waiting_days: env_or_default("ETP_LAUNCH_N1A_WAIT_DAYS", "75")
                .parse()
                .unwrap_or(75),
            shelf_waiting_days: env_or_default("ETP_LAUNCH_SHELF_WAIT_DAYS", "60")
                .parse()
                .unwrap_or(60),

            extraction_threads: env_or_default("ETP_LAUNCH_EXTRACTION_THREADS", "0")
                .parse()
                .unwrap_or(0),
        }
    }
}

impl Default for Config {
    /// The defaults without consulting the environment. Used by tests,
    /// which should not care what's in your shell.
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("filings"),
            output_dir: PathBuf::from("outputs"),
            ticker_label_window: 600,
            ticker_min_len: 1,
            ticker_max_len: 6,
            n1a_waiting_days: 75,
            shelf_waiting_days: 60,
            extraction_threads: 0,
        }
    }
}

/// Helper function to read an environment variable with a default fallback.
/// Because unwrap_or on env::var is ugly and we have standards.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_regulations() {
        let cfg = Config::default();
        assert_eq!(cfg.n1a_waiting_days, 75);
        assert_eq!(cfg.shelf_waiting_days, 60);
        assert_eq!(cfg.ticker_label_window, 600);
    }
}

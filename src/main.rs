// ███████╗████████╗██████╗     ██╗      █████╗ ██╗   ██╗███╗   ██╗ ██████╗██╗  ██╗
// ██╔════╝╚══██╔══╝██╔══██╗    ██║     ██╔══██╗██║   ██║████╗  ██║██╔════╝██║  ██║
// █████╗     ██║   ██████╔╝    ██║     ███████║██║   ██║██╔██╗ ██║██║     ███████║
// ██╔══╝     ██║   ██╔═══╝     ██║     ██╔══██║██║   ██║██║╚██╗██║██║     ██╔══██║
// ██║        ██║   ██║         ███████╗██║  ██║╚██████╔╝██║ ╚████║╚██████╗██║  ██║
// ╚═╝        ╚═╝   ╚═╝         ╚══════╝╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═══╝ ╚═════╝╚═╝  ╚═╝
//
// E N G I N E
//
// The most overkill ETP launch-tracking engine ever conceived.
// Rust + Rayon + Crossbeam + SIMD Substring Search + Atomic Metrics
// All to figure out when a leveraged single-stock ETF starts trading.

mod config;
mod effective_date;
mod error;
mod extractors;
mod header_parser;
mod metrics;
mod models;
mod pipeline;
mod reconciler;
mod registry;
mod rollup;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::registry::TrustRegistry;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║   ███████╗████████╗██████╗     ██╗      █████╗ ██╗   ██╗███╗   ██╗ ██████╗██╗  ██╗
    ║   ██╔════╝╚══██╔══╝██╔══██╗    ██║     ██╔══██╗██║   ██║████╗  ██║██╔════╝██║  ██║
    ║   █████╗     ██║   ██████╔╝    ██║     ███████║██║   ██║██╔██╗ ██║██║     ███████║
    ║   ██╔══╝     ██║   ██╔═══╝     ██║     ██╔══██║██║   ██║██║╚██╗██║██║     ██╔══██║
    ║   ██║        ██║   ██║         ███████╗██║  ██║╚██████╔╝██║ ╚████║╚██████╗██║  ██║
    ║   ╚═╝        ╚═╝   ╚═╝         ╚══════╝╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═══╝ ╚═════╝╚═╝  ╚═╝
    ║                                                                  ║
    ║        ⚡ ETP LAUNCH RECONCILIATION ENGINE ⚡                    ║
    ║                                                                  ║
    ║   Input:      Cached SEC EDGAR filing bundles (JSON)             ║
    ║   Identity:   Permanent Series IDs, names are just wardrobe      ║
    ║   Extraction: SIMD-Accelerated Substring + Regex Strategy Mines  ║
    ║   Dates:      Six-Rung Priority Ladder with Confidence Grades    ║
    ║   Channels:   Lock-Free Crossbeam, Rayon Worker Pool             ║
    ║                                                                  ║
    ║   "A fund can change its name four times. Its soul is the ID."   ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    println!("{}", banner);
}

fn main() -> Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .init();

    print_banner();

    info!("📈 ETP LAUNCH ENGINE initializing...");

    let config = Config::from_env();
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "✅ Configuration loaded"
    );

    if config.extraction_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.extraction_threads)
            .build_global()?;
        info!(threads = config.extraction_threads, "✅ Rayon pool sized explicitly");
    } else {
        info!("✅ Rayon pool sized automatically");
    }

    let registry = TrustRegistry::builtin();
    info!(trusts = registry.len(), "✅ Trust registry online");

    let metrics = MetricsCollector::new();
    info!("✅ Metrics collector initialized");

    info!("🚀 Starting batch run...");
    let output = pipeline::run(&config, &registry, &metrics)?;
    pipeline::write_outputs(&config, &output, &metrics)?;

    let snapshot = metrics.snapshot();
    info!("═══════════════════════════════════════════════════════");
    info!("  🟢 BATCH COMPLETE");
    info!("  📄 {} filings processed", snapshot.filings_processed);
    info!("  🧬 {} funds rolled up", output.states.len());
    info!("  📇 {} name records", output.name_records.len());
    info!(
        "  📅 dates: {} high / {} medium / {} low / {} unresolved",
        snapshot.dates_high_confidence,
        snapshot.dates_medium_confidence,
        snapshot.dates_low_confidence,
        snapshot.dates_unresolved
    );
    if snapshot.collisions_flagged > 0 {
        warn!(
            "  🚩 {} series flagged for human review",
            snapshot.collisions_flagged
        );
    }
    info!("═══════════════════════════════════════════════════════");

    Ok(())
}

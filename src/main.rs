//! churnroi: batch retention-ROI report generation
//!
//! Loads a scored customer table, sweeps both models, selects the more
//! profitable one, compares single and segment-specific thresholds and writes
//! the report CSV files.

use anyhow::Result;
use churnroi::{pipeline, Args};
use clap::Parser;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let outcome = pipeline::run(&args)?;

    println!(
        "Recommended: {} at threshold {:.2} (net ROI {:.2})",
        outcome.recommended_model, outcome.optimal_threshold, outcome.net_roi
    );
    println!(
        "Segment-specific thresholds: {:.2} / {:.2}, improvement {:.2}",
        outcome.comparison.high_value_optimal.threshold,
        outcome.comparison.low_value_optimal.threshold,
        outcome.comparison.improvement
    );
    println!("Reports written to: {}", args.output_dir.display());

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

//! `trackeval` binary: compare a predicted track file against ground truth.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | PASS: no misses, false positives or identity switches |
//! | 1    | FAIL: at least one defect |
//! | 2    | Input or configuration error; nothing was scored |
//!
//! # Usage
//!
//! ```bash
//! trackeval expected.json actual.json
//! trackeval expected.json actual.json --iou-threshold 0.5
//! trackeval expected.json actual.json --strategy nearest-key --key-tolerance 1e-4
//! RUST_LOG=debug trackeval expected.json actual.json --verbose
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trackeval::config::{DEFAULT_IOU_THRESHOLD, DEFAULT_KEY_TOLERANCE};
use trackeval::{evaluate_files, EvalConfig, MatchingStrategy, RunSummary};

const EXIT_INPUT_ERROR: u8 = 2;

/// Compare predicted tracks against ground truth, penalizing identity switches.
#[derive(Parser, Debug)]
#[command(name = "trackeval", version, about, long_about = None)]
struct Args {
    /// Ground-truth JSON file.
    ground_truth: PathBuf,

    /// Predicted JSON file.
    predicted: PathBuf,

    /// A pair matches only when its IoU is strictly above this value.
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou_threshold: f64,

    /// Matching strategy.
    #[arg(long, value_enum, default_value_t = MatchingStrategy::Optimal)]
    strategy: MatchingStrategy,

    /// Maximum (x, y, w, h) distance for nearest-key matching.
    #[arg(long, default_value_t = DEFAULT_KEY_TOLERANCE)]
    key_tolerance: f64,

    /// Print the summary as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// List every frame with a defect.
    #[arg(long, short = 'v', default_value_t = false)]
    verbose: bool,

    /// Log level used when RUST_LOG is unset: trace, debug, info, warn, error.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(summary) => ExitCode::from(summary.verdict().exit_code() as u8),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_INPUT_ERROR)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let config = EvalConfig::new(args.iou_threshold)
        .with_strategy(args.strategy)
        .with_key_tolerance(args.key_tolerance);

    let summary = evaluate_files(&args.ground_truth, &args.predicted, config).with_context(|| {
        format!(
            "comparing {} against {}",
            args.predicted.display(),
            args.ground_truth.display()
        )
    })?;

    if args.json {
        let report = serde_json::json!({
            "verdict": summary.verdict(),
            "summary": &summary,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", summary.report(args.verbose));
    }

    Ok(summary)
}

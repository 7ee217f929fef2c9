//! Batch implied volatility and Greeks for a tree of option-chain CSV files.
//!
//! # Usage
//!
//! ```bash
//! # Process every <root>/<set>/<underlying>.csv
//! chain-greeks data/chains
//!
//! # Override the risk-free rate and show skipped entries
//! chain-greeks data/chains --rate 0.02 --verbose
//!
//! # Load parameters from a file
//! chain-greeks data/chains --config config/default.toml
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, Level};

use chain_greeks::{BatchConfig, BatchResult, BatchScanner, BlackScholesPricer, RunSummary};

/// Append implied volatility and Greeks to historical option chains.
#[derive(Parser)]
#[command(name = "chain-greeks")]
#[command(about = "Append implied volatility and Greeks to option-chain CSV files")]
#[command(version)]
struct Cli {
    /// Root directory containing one subdirectory per data set
    root: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Risk-free rate override (0.01 = 1%)
    #[arg(long)]
    rate: Option<f64>,

    /// Log skipped entries
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> BatchResult<BatchConfig> {
    let mut config = match &cli.config {
        Some(path) => BatchConfig::from_file(path)?,
        None => BatchConfig::default(),
    };
    if let Some(rate) = cli.rate {
        config = config.with_rate(rate);
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> BatchResult<RunSummary> {
    let config = load_config(cli)?;
    let pricer = BlackScholesPricer::default();
    BatchScanner::new(&pricer, &config).run(&cli.root)
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(&cli) {
        Ok(summary) => {
            info!(
                "Done: {} directories, {} files processed, {} skipped, {} rows written",
                summary.directories,
                summary.files_processed,
                summary.files_skipped,
                summary.rows_written
            );
        }
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

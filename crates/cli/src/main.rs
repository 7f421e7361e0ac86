//! Kubernetes Scheduling Analyzer CLI
//!
//! A command-line tool for analyzing cluster-scheduling experiment
//! runs: fragmentation scoring, pod-fit estimation, scheduling-latency
//! statistics and multi-run comparison.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{analyze, compare};

/// Kubernetes Scheduling Analyzer CLI
#[derive(Parser)]
#[command(name = "ksa")]
#[command(author, version, about = "CLI for the Kubernetes Scheduling Analyzer", long_about = None)]
pub struct Cli {
    /// Run directory to analyze (expects its inputs under data/)
    #[arg(long, env = "KSA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Run directories to compare
    #[arg(long, num_args = 1..)]
    pub compare: Vec<PathBuf>,

    /// Render charts: the event timeline for --data-dir, per-metric
    /// comparison charts for --compare
    #[arg(long)]
    pub plot: bool,

    /// Output directory for comparison artifacts
    #[arg(long, default_value = "./results/comparison")]
    pub output_dir: PathBuf,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if !cli.compare.is_empty() {
        if cli.plot {
            compare::compare_with_charts(&cli.compare, &cli.output_dir, cli.format)?;
        } else {
            compare::compare_run_reports(&cli.compare, cli.format)?;
        }
    } else if let Some(data_dir) = &cli.data_dir {
        if cli.plot {
            analyze::plot_run(data_dir)?;
        } else {
            analyze::analyze_run(data_dir, cli.format)?;
        }
    } else {
        bail!("nothing to do: pass --data-dir <run> or --compare <run>...");
    }

    Ok(())
}

//! Single-run analysis command

use std::path::Path;

use analyzer_lib::{Report, RunAnalysis};
use anyhow::{Context, Result};
use colored::Colorize;

use crate::output::{self, OutputFormat};

/// Analyze one experiment run: load, persist cleaned data, write the
/// report and print a summary
pub fn analyze_run(data_dir: &Path, format: OutputFormat) -> Result<()> {
    let mut analysis = RunAnalysis::new(data_dir);
    analysis
        .load_data()
        .with_context(|| format!("failed to load run data from {}", data_dir.display()))?;
    analysis
        .save_data(None)
        .context("failed to write cleaned data tables")?;
    let report = analysis.make_report().context("failed to build report")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            print_report(&report);
            output::print_success(&format!(
                "report written to {}",
                analysis.report_path().display()
            ));
        }
    }
    Ok(())
}

/// Render the pod event timeline chart for one run
pub fn plot_run(data_dir: &Path) -> Result<()> {
    let mut analysis = RunAnalysis::new(data_dir);
    analysis
        .load_data()
        .with_context(|| format!("failed to load run data from {}", data_dir.display()))?;
    let path = analysis
        .plot_timeline()
        .context("failed to render event timeline")?;
    output::print_success(&format!("timeline chart written to {}", path.display()));
    Ok(())
}

fn print_report(report: &Report) {
    println!("{}", format!("Run: {}", report.run_name).bold());
    println!("{}", "=".repeat(50));

    println!("{}", "Fragmentation".bold());
    println!("{}", "-".repeat(50));
    let frag = &report.fragmentation;
    for (name, mean, max, cv, auc) in [
        (
            "CPU",
            frag.cpu_fragmentation_mean,
            frag.cpu_fragmentation_max,
            frag.cpu_fragmentation_cv,
            frag.cpu_fragmentation_auc,
        ),
        (
            "Memory",
            frag.memory_fragmentation_mean,
            frag.memory_fragmentation_max,
            frag.memory_fragmentation_cv,
            frag.memory_fragmentation_auc,
        ),
        (
            "Combined",
            frag.combined_fragmentation_mean,
            frag.combined_fragmentation_max,
            frag.combined_fragmentation_cv,
            frag.combined_fragmentation_auc,
        ),
    ] {
        println!(
            "{:<10} mean {}  max {}  cv {}  auc {}",
            name,
            output::format_score(mean),
            output::format_score(max),
            output::format_score(cv),
            output::format_score(auc)
        );
    }
    println!();

    println!(
        "{} {}",
        "Average pod fit:".bold(),
        format!("{:.2}", report.avg_pod_fit).cyan()
    );

    if let Some(scheduling) = &report.scheduling {
        println!();
        println!("{}", "Scheduling".bold());
        println!("{}", "-".repeat(50));
        if let Some(pending) = &scheduling.pending {
            println!(
                "Pending:   mean {}  max {}  ({} pods)",
                output::format_millis(pending.mean_ms),
                output::format_millis(pending.max_ms),
                pending.count
            );
        }
        if let Some(running) = &scheduling.running {
            println!(
                "Running:   mean {}  max {}  ({} pods)",
                output::format_millis(running.mean_ms),
                output::format_millis(running.max_ms),
                running.count
            );
        }
        if let Some(queue) = &scheduling.queue {
            println!(
                "Queue:     mean length {:.2}  max {:.0}  over {:.0}s",
                queue.mean_length, queue.max_length, queue.duration_seconds
            );
        }
    }
    println!();
}

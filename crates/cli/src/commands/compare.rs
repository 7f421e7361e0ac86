//! Multi-run comparison commands

use std::path::{Path, PathBuf};

use analyzer_lib::{compare_fragmentation, compare_reports, Report};
use anyhow::{bail, Context, Result};
use tabled::Tabled;

use crate::output::{self, OutputFormat};

/// Row for the per-run report table
#[derive(Tabled, serde::Serialize)]
struct ReportRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "CPU Frag (mean)")]
    cpu_mean: String,
    #[tabled(rename = "Mem Frag (mean)")]
    memory_mean: String,
    #[tabled(rename = "Combined (mean)")]
    combined_mean: String,
    #[tabled(rename = "Combined (AUC)")]
    combined_auc: String,
    #[tabled(rename = "Avg Pod Fit")]
    avg_pod_fit: String,
}

/// Row for the full fragmentation statistics table
#[derive(Tabled, serde::Serialize)]
struct MetricRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Std")]
    std: String,
    #[tabled(rename = "CV")]
    cv: String,
    #[tabled(rename = "AUC")]
    auc: String,
}

/// Compare persisted reports side by side, generating missing ones
pub fn compare_run_reports(run_dirs: &[PathBuf], format: OutputFormat) -> Result<()> {
    let reports = compare_reports(run_dirs).context("failed to collect run reports")?;
    if reports.is_empty() {
        bail!("no reports could be collected from the given run directories");
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        OutputFormat::Table => {
            let rows: Vec<ReportRow> = reports.iter().map(report_row).collect();
            output::print_table(&rows, format);
        }
    }
    Ok(())
}

/// Re-run the fragmentation pipeline for every run and write charts,
/// a summary CSV and print the statistics table
pub fn compare_with_charts(
    run_dirs: &[PathBuf],
    output_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let summary = compare_fragmentation(run_dirs, output_dir)
        .context("failed to compare fragmentation across runs")?;

    match format {
        OutputFormat::Json => {
            let entries: serde_json::Map<String, serde_json::Value> = summary
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            let rows: Vec<MetricRow> = summary
                .rows
                .iter()
                .map(|row| MetricRow {
                    run: row.run_name.clone(),
                    metric: row.metric.to_string(),
                    mean: output::format_score(row.mean),
                    max: output::format_score(row.max),
                    std: output::format_score(row.std),
                    cv: output::format_score(row.cv),
                    auc: output::format_score(row.auc),
                })
                .collect();
            output::print_table(&rows, format);

            let improvements: Vec<&(String, f64)> = summary
                .entries
                .iter()
                .filter(|(k, _)| k.ends_with("_improvement_percentage"))
                .collect();
            if !improvements.is_empty() {
                println!();
                for (key, value) in improvements {
                    output::print_info(&format!("{}: {:.2}%", key, value));
                }
            }
            output::print_success(&format!(
                "charts and summary written to {}",
                output_dir.display()
            ));
        }
    }
    Ok(())
}

fn report_row(report: &Report) -> ReportRow {
    let frag = &report.fragmentation;
    ReportRow {
        run: report.run_name.clone(),
        cpu_mean: output::format_score(frag.cpu_fragmentation_mean),
        memory_mean: output::format_score(frag.memory_fragmentation_mean),
        combined_mean: output::format_score(frag.combined_fragmentation_mean),
        combined_auc: output::format_score(frag.combined_fragmentation_auc),
        avg_pod_fit: format!("{:.2}", report.avg_pod_fit),
    }
}

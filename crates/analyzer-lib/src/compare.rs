//! Multi-run comparison
//!
//! Runs the full pipeline independently over several experiment
//! directories and produces side-by-side statistics, pairwise
//! improvement percentages, one summary CSV and one overlay chart per
//! metric. A simpler variant collects the runs' persisted reports,
//! generating missing ones on demand.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::analysis::RunAnalysis;
use crate::error::Result;
use crate::fragmentation::Metric;
use crate::models::Report;
use crate::plot::{self, MetricSeries};
use crate::stats;

/// One run's reduction of one fragmentation metric
#[derive(Debug, Clone)]
pub struct RunMetricSummary {
    pub run_name: String,
    pub metric: &'static str,
    pub mean: f64,
    pub max: f64,
    pub std: f64,
    pub cv: f64,
    pub auc: f64,
}

/// Flat comparison summary preserving insertion order
///
/// Keys follow `{run}_{metric}_{stat}` and
/// `{run1}_vs_{run2}_{metric}_improvement_percentage`.
#[derive(Debug, Clone, Default)]
pub struct ComparisonSummary {
    pub entries: Vec<(String, f64)>,
    pub rows: Vec<RunMetricSummary>,
}

impl ComparisonSummary {
    fn push(&mut self, key: String, value: f64) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Write the summary as a single-row CSV, keys as the header
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.entries.iter().map(|(k, _)| k.as_str()))?;
        writer.write_record(self.entries.iter().map(|(_, v)| v.to_string()))?;
        writer.flush()?;
        Ok(())
    }
}

/// Compare fragmentation across runs, writing charts and a summary CSV
///
/// Each run directory is processed to completion before the next
/// begins; a failing run fails the whole comparison (partial-failure
/// tolerance exists only in [`compare_reports`]).
pub fn compare_fragmentation(run_dirs: &[PathBuf], output_dir: &Path) -> Result<ComparisonSummary> {
    let mut runs = Vec::new();
    for run_dir in run_dirs {
        let mut analysis = RunAnalysis::new(run_dir);
        analysis.load_data()?;
        let mut series = analysis.fragmentation().clone();
        series.round_all(2);
        runs.push((analysis.run_name().to_string(), series));
    }

    let mut summary = ComparisonSummary::default();
    for metric in Metric::ALL {
        for (run_name, series) in &runs {
            let values = series.metric(metric);
            let elapsed = series.elapsed_seconds();
            let mean = stats::mean(values);
            let max = stats::max(values);
            let std = stats::sample_std(values);
            let cv = stats::safe_cv(std, mean);
            let auc = stats::trapezoid(values, &elapsed);

            summary.push(format!("{}_{}_mean", run_name, metric), mean);
            summary.push(format!("{}_{}_max", run_name, metric), max);
            summary.push(format!("{}_{}_std", run_name, metric), std);
            summary.push(format!("{}_{}_cv", run_name, metric), cv);
            summary.push(format!("{}_{}_auc", run_name, metric), auc);

            summary.rows.push(RunMetricSummary {
                run_name: run_name.clone(),
                metric: metric.as_str(),
                mean,
                max,
                std,
                cv,
                auc,
            });
        }
    }

    // Pairwise improvement of run i's mean relative to run j's, each
    // unordered pair once.
    for (i, (run1, _)) in runs.iter().enumerate() {
        for (run2, _) in runs.iter().skip(i + 1) {
            for metric in Metric::ALL {
                let mean1 = summary
                    .get(&format!("{}_{}_mean", run1, metric))
                    .unwrap_or(0.0);
                let mean2 = summary
                    .get(&format!("{}_{}_mean", run2, metric))
                    .unwrap_or(0.0);
                if mean1 > 0.0 {
                    let improvement = (mean1 - mean2) / mean1 * 100.0;
                    summary.push(
                        format!("{}_vs_{}_{}_improvement_percentage", run1, run2, metric),
                        improvement,
                    );
                }
            }
        }
    }

    std::fs::create_dir_all(output_dir)?;
    for metric in Metric::ALL {
        let series: Vec<MetricSeries> = runs
            .iter()
            .map(|(run_name, frag)| MetricSeries {
                run_name: run_name.clone(),
                elapsed: frag.elapsed_seconds(),
                values: frag.metric(metric).to_vec(),
                mean: summary
                    .get(&format!("{}_{}_mean", run_name, metric))
                    .unwrap_or(0.0),
                auc: summary
                    .get(&format!("{}_{}_auc", run_name, metric))
                    .unwrap_or(0.0),
            })
            .collect();
        let chart_path = output_dir.join(format!("{}.png", metric));
        plot::render_comparison_chart(metric, &series, &chart_path)?;
    }

    let csv_path = output_dir.join("summary_statistics.csv");
    summary.write_csv(&csv_path)?;
    info!(
        runs = runs.len(),
        output = %output_dir.display(),
        "comparison summary written"
    );
    Ok(summary)
}

/// Collect each run's persisted report, generating missing ones
///
/// A run whose report cannot be generated is logged and skipped; the
/// batch continues. Reading an existing but malformed report file
/// still fails hard.
pub fn compare_reports(run_dirs: &[PathBuf]) -> Result<Vec<Report>> {
    let mut reports = Vec::new();
    for run_dir in run_dirs {
        let report_path = run_dir.join("report").join("report.json");
        if !report_path.exists() {
            warn!(path = %report_path.display(), "report file does not exist, creating");
            let mut analysis = RunAnalysis::new(run_dir);
            match analysis.load_data().and_then(|_| analysis.make_report()) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(run_dir = %run_dir.display(), %err, "failed to generate report, skipping");
                }
            }
            continue;
        }

        let content = std::fs::read_to_string(&report_path)?;
        let report: Report = serde_json::from_str(&content)?;
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_run(parent: &Path, name: &str, cpu_values: &[(i64, f64, f64)]) -> PathBuf {
        let run_dir = parent.join(name);
        let data = run_dir.join("data");
        fs::create_dir_all(&data).unwrap();

        let mut usage = String::from("timestamp,cpu,memory\n");
        let mut usage_b = String::from("timestamp,cpu,memory\n");
        for (secs, a, b) in cpu_values {
            let ts = format!("2024-01-01T00:00:{:02}Z", secs);
            usage.push_str(&format!("{},{},{}\n", ts, a, 1_073_741_824u64));
            usage_b.push_str(&format!("{},{},{}\n", ts, b, 1_073_741_824u64));
        }
        fs::write(data.join("node-a_usage.csv"), usage).unwrap();
        fs::write(data.join("node-b_usage.csv"), usage_b).unwrap();
        fs::write(
            data.join("node-a_free.csv"),
            "timestamp,cpu,memory\n2024-01-01T00:00:00Z,5000,8589934592\n",
        )
        .unwrap();
        fs::write(
            data.join("pod_pending_durations.csv"),
            "pod_name,pending_time_milliseconds\npod-a,120\n",
        )
        .unwrap();
        fs::write(
            data.join("pod_queue_length.csv"),
            "timestamp,length\n2024-01-01T00:00:00Z,1\n2024-01-01T00:00:10Z,3\n",
        )
        .unwrap();
        fs::write(
            data.join("pod_running_durations.csv"),
            "running_time_milliseconds\n900\n",
        )
        .unwrap();
        fs::write(
            data.join("event_timeline.csv"),
            "timestamp,pod,event_type,node,request_cpu,request_memory,value\n\
             2024-01-01T00:00:00Z,pod-a,ADDED,node-a,500m,1000Mi,\n",
        )
        .unwrap();
        run_dir
    }

    #[test]
    fn test_compare_fragmentation_summary_keys() {
        let parent = TempDir::new().unwrap();
        let balanced = write_run(parent.path(), "balanced", &[(0, 10.0, 10.0), (10, 10.0, 10.0)]);
        let skewed = write_run(parent.path(), "skewed", &[(0, 1.0, 20.0), (10, 2.0, 30.0)]);
        let output = parent.path().join("comparison");

        let summary =
            compare_fragmentation(&[balanced, skewed], &output).unwrap();

        assert_eq!(summary.get("balanced_cpu_fragmentation_mean"), Some(0.0));
        let skewed_mean = summary.get("skewed_cpu_fragmentation_mean").unwrap();
        assert!(skewed_mean > 0.0);

        // balanced mean is 0, so no improvement entry for that direction
        assert!(summary
            .get("balanced_vs_skewed_cpu_fragmentation_improvement_percentage")
            .is_none());

        assert!(output.join("summary_statistics.csv").exists());
        assert!(output.join("cpu_fragmentation.png").exists());
        assert!(output.join("memory_fragmentation.png").exists());
        assert!(output.join("combined_fragmentation.png").exists());
    }

    #[test]
    fn test_improvement_percentage() {
        let parent = TempDir::new().unwrap();
        let worse = write_run(parent.path(), "worse", &[(0, 1.0, 3.0), (10, 1.0, 3.0)]);
        let better = write_run(parent.path(), "better", &[(0, 2.0, 2.0), (10, 2.0, 2.0)]);
        let output = parent.path().join("comparison");

        let summary = compare_fragmentation(&[worse, better], &output).unwrap();

        let mean1 = summary.get("worse_cpu_fragmentation_mean").unwrap();
        let mean2 = summary.get("better_cpu_fragmentation_mean").unwrap();
        let improvement = summary
            .get("worse_vs_better_cpu_fragmentation_improvement_percentage")
            .unwrap();
        assert!((improvement - (mean1 - mean2) / mean1 * 100.0).abs() < 1e-9);
        assert!((improvement - 100.0).abs() < 1e-9, "better run has zero CV");
    }

    #[test]
    fn test_compare_reports_generates_and_skips() {
        let parent = TempDir::new().unwrap();
        let good = write_run(parent.path(), "good", &[(0, 10.0, 10.0)]);
        let broken = parent.path().join("broken"); // no data directory

        let reports = compare_reports(&[good.clone(), broken]).unwrap();
        assert_eq!(reports.len(), 1, "broken run is skipped");
        assert_eq!(reports[0].run_name, "good");
        assert!(good.join("report").join("report.json").exists());

        // second pass reads the persisted report
        let again = compare_reports(&[good]).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].run_name, "good");
    }
}

//! Per-run analysis orchestration
//!
//! `RunAnalysis` owns everything loaded for one experiment run: the
//! aligned resource tables, the pod lifecycle inputs and the lazily
//! computed fragmentation series. Each instance is owned exclusively
//! by one analysis invocation; nothing is shared across runs.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::add_cluster_totals;
use crate::error::Result;
use crate::fragmentation::{calculate_fragmentation, FragmentationSeries};
use crate::loader;
use crate::models::{PendingRecord, PodEvent, QueueSample, Report, RunningRecord};
use crate::report;
use crate::table::TimeSeriesTable;

/// State of one analysis run over a run directory
///
/// The run directory is expected to hold its inputs under `data/`;
/// artifacts are written under `report/`.
#[derive(Debug, Default)]
pub struct RunAnalysis {
    run_dir: PathBuf,
    run_name: String,
    data_dir: PathBuf,
    output_dir: PathBuf,

    pub usage: TimeSeriesTable,
    pub ratios: TimeSeriesTable,
    pub free: TimeSeriesTable,
    pub pod_pending: Vec<PendingRecord>,
    pub pod_queue: Vec<QueueSample>,
    pub pod_running: Vec<RunningRecord>,
    pub timeline: Vec<PodEvent>,

    fragmentation: Option<FragmentationSeries>,
}

impl RunAnalysis {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        let run_dir = run_dir.into();
        let run_name = run_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let data_dir = run_dir.join("data");
        let output_dir = run_dir.join("report");
        Self {
            run_dir,
            run_name,
            data_dir,
            output_dir,
            ..Self::default()
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the persisted report for this run
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.json")
    }

    /// Load and align all inputs of the run
    ///
    /// Fails if the data directory is missing; per-class resource
    /// tables may come back empty without error.
    pub fn load_data(&mut self) -> Result<()> {
        let tables = loader::load_node_tables(&self.data_dir)?;
        self.usage = tables.usage;
        self.ratios = tables.ratios;
        self.free = tables.free;

        add_cluster_totals(&mut self.usage);
        add_cluster_totals(&mut self.free);

        self.pod_pending = loader::load_pending(&self.data_dir)?;
        self.pod_queue = loader::load_queue(&self.data_dir)?;
        self.pod_running = loader::load_running(&self.data_dir)?;
        self.timeline = loader::load_timeline(&self.data_dir)?;

        info!(
            run = %self.run_name,
            usage_rows = self.usage.len(),
            nodes_free_rows = self.free.len(),
            events = self.timeline.len(),
            "run data loaded"
        );
        Ok(())
    }

    /// Fragmentation series of this run, computed on first use
    pub fn fragmentation(&mut self) -> &FragmentationSeries {
        self.fragmentation
            .get_or_insert_with(|| calculate_fragmentation(&self.usage))
    }

    /// Build the report and persist it as `report/report.json`
    pub fn make_report(&mut self) -> Result<Report> {
        let indexes = report::fragmentation_indexes(self.fragmentation());
        let avg_pod_fit = report::calculate_avg_pod_fit(&self.timeline, &self.free)?;
        let scheduling =
            report::scheduling_stats(&self.pod_pending, &self.pod_queue, &self.pod_running);

        let report = Report {
            run_dir: self.run_dir.display().to_string(),
            run_name: self.run_name.clone(),
            fragmentation: indexes,
            avg_pod_fit,
            scheduling: if scheduling.is_empty() {
                None
            } else {
                Some(scheduling)
            },
        };

        std::fs::create_dir_all(&self.output_dir)?;
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(self.report_path(), json)?;
        info!(run = %self.run_name, path = %self.report_path().display(), "report written");
        Ok(report)
    }

    /// Re-serialize the cleaned tables into the report directory
    pub fn save_data(&self, output_dir: Option<&Path>) -> Result<()> {
        let out = output_dir.unwrap_or(&self.output_dir);
        std::fs::create_dir_all(out)?;

        self.usage.write_csv(&out.join("resource_usage.csv"))?;
        self.ratios.write_csv(&out.join("resource_usage_ratios.csv"))?;
        self.free.write_csv(&out.join("resource_free.csv"))?;

        write_records(
            &out.join("pod_pending_durations.csv"),
            &["pod_name", "pending_time_milliseconds"],
            &self.pod_pending,
        )?;
        write_records(
            &out.join("pod_queue_length.csv"),
            &["timestamp", "length"],
            &self.pod_queue,
        )?;
        write_records(
            &out.join("pod_running_durations.csv"),
            &["running_time_milliseconds"],
            &self.pod_running,
        )?;
        Ok(())
    }

    /// Render the pod event timeline chart into the report directory
    pub fn plot_timeline(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("pod_event_timeline.png");
        crate::plot::render_event_timeline(&self.timeline, &path)?;
        Ok(path)
    }
}

// csv only emits the header on the first serialize call, so an empty
// record list needs it written explicitly.
fn write_records<T: serde::Serialize>(path: &Path, headers: &[&str], records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record(headers)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_name_from_directory() {
        let analysis = RunAnalysis::new("/tmp/results/experiment2");
        assert_eq!(analysis.run_name(), "experiment2");
        assert_eq!(
            analysis.report_path(),
            PathBuf::from("/tmp/results/experiment2/report/report.json")
        );
    }

    #[test]
    fn test_load_missing_run_dir() {
        let mut analysis = RunAnalysis::new("/nonexistent/run");
        assert!(analysis.load_data().is_err());
    }
}

//! Resource fragmentation scoring
//!
//! Fragmentation is framed as uneven resource distribution across
//! nodes: at each instant the coefficient of variation of per-node
//! usage is the score. Low CV means the load is well balanced; high CV
//! means some nodes carry far more than others even when cluster-wide
//! totals look healthy, which is scheduling inefficiency that aggregate
//! utilization hides.

use chrono::{DateTime, Utc};

use crate::aggregate::matches_resource;
use crate::stats;
use crate::table::TimeSeriesTable;

/// The three fragmentation metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    Combined,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Combined];

    /// Column/report name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cpu => "cpu_fragmentation",
            Metric::Memory => "memory_fragmentation",
            Metric::Combined => "combined_fragmentation",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fragmentation time series, one sample per distinct usage timestamp
#[derive(Debug, Clone, Default)]
pub struct FragmentationSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub combined: Vec<f64>,
}

impl FragmentationSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn metric(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Cpu => &self.cpu,
            Metric::Memory => &self.memory,
            Metric::Combined => &self.combined,
        }
    }

    /// Seconds elapsed since the first sample, per sample
    pub fn elapsed_seconds(&self) -> Vec<f64> {
        match self.timestamps.first() {
            Some(&t0) => self
                .timestamps
                .iter()
                .map(|ts| (*ts - t0).num_milliseconds() as f64 / 1000.0)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Round every sample to the given number of decimal places
    pub fn round_all(&mut self, decimals: u32) {
        let scale = 10f64.powi(decimals as i32);
        for series in [&mut self.cpu, &mut self.memory, &mut self.combined] {
            for v in series.iter_mut() {
                *v = (*v * scale).round() / scale;
            }
        }
    }
}

/// Compute the fragmentation series for a usage table
///
/// Rows are grouped explicitly by timestamp so duplicate index entries
/// cannot skew a sample. Per group, non-`total` CPU and memory values
/// are taken; only strictly positive readings contribute (an inactive
/// or absent node is non-contributing, not a zero-utilization data
/// point). Combined fragmentation is the fixed 50/50 mean of the two.
pub fn calculate_fragmentation(usage: &TimeSeriesTable) -> FragmentationSeries {
    let cpu_columns: Vec<&[f64]> = usage
        .column_names()
        .filter(|name| matches_resource(name, "cpu"))
        .filter_map(|name| usage.column(name))
        .collect();
    let mem_columns: Vec<&[f64]> = usage
        .column_names()
        .filter(|name| matches_resource(name, "memory"))
        .filter_map(|name| usage.column(name))
        .collect();

    let mut series = FragmentationSeries::default();
    let index = usage.index();
    let mut row = 0;
    while row < index.len() {
        let ts = index[row];
        let mut end = row + 1;
        while end < index.len() && index[end] == ts {
            end += 1;
        }

        let cpu_values = positive_values(&cpu_columns, row, end);
        let mem_values = positive_values(&mem_columns, row, end);

        let cpu_frag = coefficient_of_variation(&cpu_values);
        let mem_frag = coefficient_of_variation(&mem_values);

        series.timestamps.push(ts);
        series.cpu.push(cpu_frag);
        series.memory.push(mem_frag);
        series.combined.push((cpu_frag + mem_frag) / 2.0);

        row = end;
    }
    series
}

/// Strictly positive cells of the given columns across a row range
fn positive_values(columns: &[&[f64]], start: usize, end: usize) -> Vec<f64> {
    columns
        .iter()
        .flat_map(|col| col[start..end].iter().copied())
        .filter(|v| *v > 0.0)
        .collect()
}

/// Population coefficient of variation, 0 below 2 values
///
/// With fewer than two positive readings there is no measurable
/// variability, so the score is defined as 0 rather than an error.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    stats::population_std(values) / stats::mean(values)
}

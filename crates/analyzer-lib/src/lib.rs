//! Analyzer library for cluster-scheduling experiments
//!
//! This crate provides the core functionality for:
//! - Loading and time-aligning per-node resource CSVs
//! - Cluster-wide aggregation (totals, elapsed time)
//! - Coefficient-of-variation fragmentation scoring
//! - Report reduction (fragmentation indexes, average pod fit,
//!   scheduling-latency statistics)
//! - Multi-run comparison and chart rendering

pub mod aggregate;
pub mod analysis;
pub mod compare;
pub mod error;
pub mod fragmentation;
pub mod loader;
pub mod models;
pub mod plot;
pub mod report;
pub mod stats;
pub mod table;

pub use analysis::RunAnalysis;
pub use compare::{compare_fragmentation, compare_reports, ComparisonSummary, RunMetricSummary};
pub use error::{AnalyzerError, Result};
pub use fragmentation::{calculate_fragmentation, FragmentationSeries, Metric};
pub use models::*;
pub use table::TimeSeriesTable;

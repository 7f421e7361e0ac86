//! Core data models for the analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `pod_pending_durations.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord {
    pub pod_name: String,
    pub pending_time_milliseconds: f64,
}

/// One row of `pod_queue_length.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSample {
    #[serde(deserialize_with = "crate::loader::de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub length: f64,
}

/// One row of `pod_running_durations.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningRecord {
    pub running_time_milliseconds: f64,
}

/// One row of `event_timeline.csv`
///
/// The event log is append-only at collection time and read-only here.
/// `event_type` is an open set (ADDED, DELETED, ...), so it stays a
/// plain string. Resource requests keep their Kubernetes quantity
/// syntax (`421m`, `1044Mi`) until the pod-fit calculation parses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodEvent {
    #[serde(deserialize_with = "crate::loader::de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub pod: String,
    pub event_type: String,
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub request_cpu: String,
    #[serde(default)]
    pub request_memory: String,
    #[serde(default)]
    pub value: String,
}

/// Scalar reductions of the fragmentation time series
///
/// Field names double as the report's JSON keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentationIndexes {
    pub cpu_fragmentation_mean: f64,
    pub memory_fragmentation_mean: f64,
    pub combined_fragmentation_mean: f64,

    pub cpu_fragmentation_max: f64,
    pub memory_fragmentation_max: f64,
    pub combined_fragmentation_max: f64,

    pub cpu_fragmentation_std: f64,
    pub memory_fragmentation_std: f64,
    pub combined_fragmentation_std: f64,

    pub cpu_fragmentation_cv: f64,
    pub memory_fragmentation_cv: f64,
    pub combined_fragmentation_cv: f64,

    pub cpu_fragmentation_auc: f64,
    pub memory_fragmentation_auc: f64,
    pub combined_fragmentation_auc: f64,
}

/// Mean/min/max/std over a set of durations, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationStats {
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub std_ms: f64,
    pub count: usize,
}

/// Scheduler queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub mean_length: f64,
    pub max_length: f64,
    pub duration_seconds: f64,
    /// Trapezoidal integral of queue length over elapsed seconds
    pub queue_time_product: f64,
}

/// Scheduling-latency section of the report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<DurationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<DurationStats>,
}

impl SchedulingStats {
    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && self.queue.is_none() && self.running.is_none()
    }
}

/// Terminal artifact of one analysis run, persisted as `report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_dir: String,
    pub run_name: String,
    pub fragmentation: FragmentationIndexes,
    pub avg_pod_fit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SchedulingStats>,
}

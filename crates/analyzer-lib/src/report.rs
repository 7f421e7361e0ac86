//! Report reductions
//!
//! Reduces the fragmentation time series and the pod event log into
//! the scalar metrics persisted in `report.json`: summary statistics
//! per fragmentation series, the average-pod-fit count, and the
//! scheduling-latency statistics.

use tracing::info;

use crate::error::{AnalyzerError, Result};
use crate::fragmentation::{FragmentationSeries, Metric};
use crate::models::{
    DurationStats, FragmentationIndexes, PendingRecord, PodEvent, QueueSample, QueueStats,
    RunningRecord, SchedulingStats,
};
use crate::stats;
use crate::table::TimeSeriesTable;

/// Parse a Kubernetes CPU quantity
///
/// A `m` suffix means the numeric prefix is already in millicores and
/// is stripped; otherwise the value is used as-is. Returns `None` for
/// anything non-numeric.
pub fn parse_cpu(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.strip_suffix('m').unwrap_or(raw).parse().ok()
}

/// Parse a Kubernetes memory quantity
///
/// A `Mi` suffix means the numeric prefix is already in MiB and is
/// stripped; otherwise the value is used as-is. Returns `None` for
/// anything non-numeric.
pub fn parse_mem(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    raw.strip_suffix("Mi").unwrap_or(raw).parse().ok()
}

/// Reduce the fragmentation series into its summary statistics
///
/// Per series: mean, max, sample standard deviation, coefficient of
/// variation (0 when the mean is not positive) and the trapezoidal
/// integral over elapsed seconds.
pub fn fragmentation_indexes(series: &FragmentationSeries) -> FragmentationIndexes {
    let elapsed = series.elapsed_seconds();
    let reduce = |metric: Metric| {
        let values = series.metric(metric);
        let mean = stats::mean(values);
        let std = stats::sample_std(values);
        (
            mean,
            stats::max(values),
            std,
            stats::safe_cv(std, mean),
            stats::trapezoid(values, &elapsed),
        )
    };

    let (cpu_mean, cpu_max, cpu_std, cpu_cv, cpu_auc) = reduce(Metric::Cpu);
    let (mem_mean, mem_max, mem_std, mem_cv, mem_auc) = reduce(Metric::Memory);
    let (comb_mean, comb_max, comb_std, comb_cv, comb_auc) = reduce(Metric::Combined);

    FragmentationIndexes {
        cpu_fragmentation_mean: cpu_mean,
        memory_fragmentation_mean: mem_mean,
        combined_fragmentation_mean: comb_mean,
        cpu_fragmentation_max: cpu_max,
        memory_fragmentation_max: mem_max,
        combined_fragmentation_max: comb_max,
        cpu_fragmentation_std: cpu_std,
        memory_fragmentation_std: mem_std,
        combined_fragmentation_std: comb_std,
        cpu_fragmentation_cv: cpu_cv,
        memory_fragmentation_cv: mem_cv,
        combined_fragmentation_cv: comb_cv,
        cpu_fragmentation_auc: cpu_auc,
        memory_fragmentation_auc: mem_auc,
        combined_fragmentation_auc: comb_auc,
    }
}

/// How many average-sized pods fit into the cluster's last free state
///
/// Each pod's request is taken from its earliest event regardless of
/// event type; unparsable requests are skipped. The fit is
/// `min(free_cpu / avg_cpu, free_mem / avg_mem)` against the last row
/// of the free table. Errors if no valid CPU or memory request remains
/// or the free table has no totals.
pub fn calculate_avg_pod_fit(events: &[PodEvent], free: &TimeSeriesTable) -> Result<f64> {
    let mut events: Vec<&PodEvent> = events.iter().collect();
    events.sort_by_key(|e| e.timestamp);

    let mut seen = std::collections::HashSet::new();
    let mut cpu_requests = Vec::new();
    let mut mem_requests = Vec::new();
    for event in events {
        if !seen.insert(event.pod.as_str()) {
            continue;
        }
        if let Some(cpu) = parse_cpu(&event.request_cpu) {
            cpu_requests.push(cpu);
        }
        if let Some(mem) = parse_mem(&event.request_memory) {
            mem_requests.push(mem);
        }
    }

    if cpu_requests.is_empty() || mem_requests.is_empty() {
        return Err(AnalyzerError::NoPodRequests);
    }

    let avg_cpu = stats::mean(&cpu_requests);
    let avg_mem = stats::mean(&mem_requests);

    let cluster_cpu = free
        .last_value("total_cpu")
        .ok_or(AnalyzerError::EmptyTable("free resource"))?;
    let cluster_mem = free
        .last_value("total_memory")
        .ok_or(AnalyzerError::EmptyTable("free resource"))?;

    let fit = (cluster_cpu / avg_cpu).min(cluster_mem / avg_mem);
    info!(
        avg_cpu_m = avg_cpu,
        avg_mem_mi = avg_mem,
        cluster_cpu_m = cluster_cpu,
        cluster_mem_mi = cluster_mem,
        fit,
        "average pod fit"
    );
    Ok(fit)
}

/// Scheduling-latency statistics over the pod lifecycle inputs
///
/// Sections whose input is empty are omitted.
pub fn scheduling_stats(
    pending: &[PendingRecord],
    queue: &[QueueSample],
    running: &[RunningRecord],
) -> SchedulingStats {
    let pending_ms: Vec<f64> = pending.iter().map(|r| r.pending_time_milliseconds).collect();
    let running_ms: Vec<f64> = running.iter().map(|r| r.running_time_milliseconds).collect();

    SchedulingStats {
        pending: duration_stats(&pending_ms),
        queue: queue_stats(queue),
        running: duration_stats(&running_ms),
    }
}

fn duration_stats(values_ms: &[f64]) -> Option<DurationStats> {
    if values_ms.is_empty() {
        return None;
    }
    Some(DurationStats {
        mean_ms: stats::mean(values_ms),
        min_ms: stats::min(values_ms),
        max_ms: stats::max(values_ms),
        std_ms: stats::sample_std(values_ms),
        count: values_ms.len(),
    })
}

fn queue_stats(samples: &[QueueSample]) -> Option<QueueStats> {
    // Samples are not guaranteed to arrive in timestamp order.
    let mut samples: Vec<&QueueSample> = samples.iter().collect();
    samples.sort_by_key(|s| s.timestamp);
    let first = samples.first()?;
    let lengths: Vec<f64> = samples.iter().map(|s| s.length).collect();
    let elapsed: Vec<f64> = samples
        .iter()
        .map(|s| (s.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0)
        .collect();
    let duration = elapsed.last().copied().unwrap_or(0.0);

    Some(QueueStats {
        mean_length: stats::mean(&lengths),
        max_length: stats::max(&lengths),
        duration_seconds: duration,
        queue_time_product: stats::trapezoid(&lengths, &elapsed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Frame, TimeSeriesTable};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(secs: i64, pod: &str, event_type: &str, cpu: &str, mem: &str) -> PodEvent {
        PodEvent {
            timestamp: ts(secs),
            pod: pod.to_string(),
            event_type: event_type.to_string(),
            node: "node-1".to_string(),
            request_cpu: cpu.to_string(),
            request_memory: mem.to_string(),
            value: String::new(),
        }
    }

    fn free_table(total_cpu: f64, total_memory: f64) -> TimeSeriesTable {
        TimeSeriesTable::merge(vec![Frame {
            index: vec![ts(0)],
            columns: vec![
                Column {
                    name: "total_cpu".into(),
                    values: vec![total_cpu],
                },
                Column {
                    name: "total_memory".into(),
                    values: vec![total_memory],
                },
            ],
        }])
    }

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu("421m"), Some(421.0));
        assert_eq!(parse_cpu("2.5"), Some(2.5));
        assert_eq!(parse_cpu(""), None);
        assert_eq!(parse_cpu("lots"), None);
    }

    #[test]
    fn test_parse_mem() {
        assert_eq!(parse_mem("1044Mi"), Some(1044.0));
        assert_eq!(parse_mem("512"), Some(512.0));
        assert_eq!(parse_mem("1Gi"), None);
    }

    #[test]
    fn test_avg_pod_fit_scenario() {
        // Average request (500m, 1000Mi); free (5000, 8000) => min(10, 8)
        let events = vec![
            event(0, "pod-a", "ADDED", "400m", "1000Mi"),
            event(1, "pod-b", "ADDED", "600m", "1000Mi"),
        ];
        let free = free_table(5000.0, 8000.0);
        let fit = calculate_avg_pod_fit(&events, &free).unwrap();
        assert!((fit - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_avg_pod_fit_dedups_earliest_event() {
        // The later, larger request for pod-a must be ignored
        let events = vec![
            event(5, "pod-a", "ADDED", "900m", "9000Mi"),
            event(0, "pod-a", "ADDED", "500m", "1000Mi"),
            event(1, "pod-b", "DELETED", "500m", "1000Mi"),
        ];
        let free = free_table(5000.0, 8000.0);
        let fit = calculate_avg_pod_fit(&events, &free).unwrap();
        assert!((fit - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_avg_pod_fit_no_valid_requests() {
        let events = vec![event(0, "pod-a", "ADDED", "??", "??")];
        let free = free_table(5000.0, 8000.0);
        let err = calculate_avg_pod_fit(&events, &free).unwrap_err();
        assert!(matches!(err, AnalyzerError::NoPodRequests));
    }

    #[test]
    fn test_avg_pod_fit_skips_unparsable_requests() {
        let events = vec![
            event(0, "pod-a", "ADDED", "nope", "1000Mi"),
            event(1, "pod-b", "ADDED", "500m", "1000Mi"),
        ];
        let free = free_table(5000.0, 8000.0);
        // pod-a contributes memory only; cpu average comes from pod-b
        let fit = calculate_avg_pod_fit(&events, &free).unwrap();
        assert!((fit - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_avg_pod_fit_missing_free_totals() {
        let events = vec![event(0, "pod-a", "ADDED", "500m", "1000Mi")];
        let empty = TimeSeriesTable::default();
        let err = calculate_avg_pod_fit(&events, &empty).unwrap_err();
        assert!(matches!(err, AnalyzerError::EmptyTable(_)));
    }

    #[test]
    fn test_fragmentation_indexes_flat_series() {
        let series = FragmentationSeries {
            timestamps: vec![ts(0), ts(10), ts(20)],
            cpu: vec![0.5, 0.5, 0.5],
            memory: vec![0.0, 0.0, 0.0],
            combined: vec![0.25, 0.25, 0.25],
        };
        let idx = fragmentation_indexes(&series);
        assert!((idx.cpu_fragmentation_mean - 0.5).abs() < 1e-9);
        assert_eq!(idx.cpu_fragmentation_std, 0.0);
        assert_eq!(idx.cpu_fragmentation_cv, 0.0);
        // constant 0.5 over 20 seconds
        assert!((idx.cpu_fragmentation_auc - 10.0).abs() < 1e-9);
        // mean of zero series gives cv 0, never a division error
        assert_eq!(idx.memory_fragmentation_cv, 0.0);
    }

    #[test]
    fn test_scheduling_stats_sections() {
        let pending = vec![
            PendingRecord {
                pod_name: "a".into(),
                pending_time_milliseconds: 100.0,
            },
            PendingRecord {
                pod_name: "b".into(),
                pending_time_milliseconds: 300.0,
            },
        ];
        let queue = vec![
            QueueSample {
                timestamp: ts(0),
                length: 2.0,
            },
            QueueSample {
                timestamp: ts(10),
                length: 4.0,
            },
        ];
        let stats = scheduling_stats(&pending, &queue, &[]);

        let p = stats.pending.unwrap();
        assert_eq!(p.mean_ms, 200.0);
        assert_eq!(p.min_ms, 100.0);
        assert_eq!(p.max_ms, 300.0);
        assert_eq!(p.count, 2);

        let q = stats.queue.unwrap();
        assert_eq!(q.max_length, 4.0);
        assert_eq!(q.duration_seconds, 10.0);
        assert!((q.queue_time_product - 30.0).abs() < 1e-9);

        assert!(stats.running.is_none(), "empty input omits the section");
    }

    #[test]
    fn test_queue_stats_unsorted_samples() {
        // Same samples in and out of timestamp order must agree
        let sorted = vec![
            QueueSample {
                timestamp: ts(0),
                length: 2.0,
            },
            QueueSample {
                timestamp: ts(5),
                length: 6.0,
            },
            QueueSample {
                timestamp: ts(10),
                length: 4.0,
            },
        ];
        let shuffled = vec![sorted[2].clone(), sorted[0].clone(), sorted[1].clone()];

        let a = scheduling_stats(&[], &sorted, &[]).queue.unwrap();
        let b = scheduling_stats(&[], &shuffled, &[]).queue.unwrap();

        assert_eq!(b.duration_seconds, 10.0);
        assert_eq!(a.duration_seconds, b.duration_seconds);
        assert!((a.queue_time_product - b.queue_time_product).abs() < 1e-9);
        assert!(b.queue_time_product > 0.0, "no negative elapsed spans");
    }
}

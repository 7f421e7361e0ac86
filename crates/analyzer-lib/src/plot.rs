//! Chart rendering
//!
//! PNG renderings of the pod event timeline and the per-metric
//! comparison charts, via plotters.

use plotters::prelude::*;
use std::path::Path;

use crate::error::{AnalyzerError, Result};
use crate::fragmentation::Metric;
use crate::models::PodEvent;

/// Fixed bar width for timeline events, in seconds
const BAR_WIDTH_SECS: f64 = 1.5;

fn plot_err<E: std::fmt::Display>(err: E) -> AnalyzerError {
    AnalyzerError::Plot(err.to_string())
}

/// Render the pod event timeline
///
/// ADDED events are drawn as bars extending upward, DELETED events
/// downward, at seconds since the first event; each pod keeps one
/// color. Other event types are not drawn. Errors if the log holds no
/// ADDED or DELETED events.
pub fn render_event_timeline(events: &[PodEvent], path: &Path) -> Result<()> {
    let events: Vec<&PodEvent> = events
        .iter()
        .filter(|e| e.event_type == "ADDED" || e.event_type == "DELETED")
        .collect();
    let first = events
        .iter()
        .map(|e| e.timestamp)
        .min()
        .ok_or(AnalyzerError::EmptyTable("event timeline"))?;
    let last = events
        .iter()
        .map(|e| e.timestamp)
        .max()
        .unwrap_or(first);
    let span = ((last - first).num_milliseconds() as f64 / 1000.0).max(1.0);

    let root = BitMapBackend::new(path, (1200, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pod Event Timeline", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-BAR_WIDTH_SECS..span * 1.05, -1.5f64..1.5f64)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Duration (seconds)")
        .y_desc("Event Type")
        .y_labels(3)
        .y_label_formatter(&|y: &f64| {
            if *y > 0.5 {
                "ADDED".to_string()
            } else if *y < -0.5 {
                "DELETED".to_string()
            } else {
                String::new()
            }
        })
        .draw()
        .map_err(plot_err)?;

    // Pods in order of first appearance, one color each.
    let mut pods: Vec<&str> = Vec::new();
    for event in &events {
        if !pods.contains(&event.pod.as_str()) {
            pods.push(&event.pod);
        }
    }

    for (i, pod) in pods.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let bars: Vec<Rectangle<(f64, f64)>> = events
            .iter()
            .filter(|e| e.pod == *pod)
            .map(|e| {
                let x = (e.timestamp - first).num_milliseconds() as f64 / 1000.0;
                let height = if e.event_type == "ADDED" { 1.0 } else { -1.0 };
                Rectangle::new(
                    [(x - BAR_WIDTH_SECS / 2.0, 0.0), (x + BAR_WIDTH_SECS / 2.0, height)],
                    color.filled(),
                )
            })
            .collect();
        chart
            .draw_series(bars)
            .map_err(plot_err)?
            .label(*pod)
            .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 8, y + 4)], color.filled()));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// One run's series for a comparison chart
pub struct MetricSeries {
    pub run_name: String,
    pub elapsed: Vec<f64>,
    pub values: Vec<f64>,
    pub mean: f64,
    pub auc: f64,
}

/// Render one metric's time series for every run, overlaid
///
/// The legend carries each run's mean and AUC so the chart stands on
/// its own.
pub fn render_comparison_chart(metric: Metric, runs: &[MetricSeries], path: &Path) -> Result<()> {
    let x_max = runs
        .iter()
        .filter_map(|r| r.elapsed.last().copied())
        .fold(0.0f64, f64::max)
        .max(1.0);
    let y_max = runs
        .iter()
        .flat_map(|r| r.values.iter().copied())
        .fold(0.0f64, f64::max)
        .max(1e-6);

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let title = title_case(metric.as_str());
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Comparison of {}", title), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max * 1.05, 0.0..y_max * 1.1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Elapsed (seconds)")
        .y_desc(title.clone())
        .draw()
        .map_err(plot_err)?;

    for (i, run) in runs.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points: Vec<(f64, f64)> = run
            .elapsed
            .iter()
            .copied()
            .zip(run.values.iter().copied())
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(plot_err)?
            .label(format!(
                "{} (Mean: {:.2}, AUC: {:.2})",
                run.run_name, run.mean, run.auc
            ))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// `cpu_fragmentation` -> `Cpu Fragmentation`
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn event(secs: i64, pod: &str, event_type: &str) -> PodEvent {
        PodEvent {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            pod: pod.to_string(),
            event_type: event_type.to_string(),
            node: String::new(),
            request_cpu: "100m".to_string(),
            request_memory: "128Mi".to_string(),
            value: String::new(),
        }
    }

    #[test]
    fn test_timeline_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timeline.png");
        let events = vec![
            event(0, "pod-a", "ADDED"),
            event(5, "pod-b", "ADDED"),
            event(30, "pod-a", "DELETED"),
            event(12, "pod-a", "MODIFIED"),
        ];
        render_event_timeline(&events, &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_timeline_requires_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timeline.png");
        let events = vec![event(0, "pod-a", "MODIFIED")];
        assert!(render_event_timeline(&events, &path).is_err());
    }

    #[test]
    fn test_comparison_chart_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpu_fragmentation.png");
        let runs = vec![
            MetricSeries {
                run_name: "baseline".to_string(),
                elapsed: vec![0.0, 10.0, 20.0],
                values: vec![0.1, 0.3, 0.2],
                mean: 0.2,
                auc: 4.5,
            },
            MetricSeries {
                run_name: "binpack".to_string(),
                elapsed: vec![0.0, 10.0, 20.0],
                values: vec![0.4, 0.5, 0.6],
                mean: 0.5,
                auc: 10.0,
            },
        ];
        render_comparison_chart(Metric::Cpu, &runs, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("cpu_fragmentation"), "Cpu Fragmentation");
    }
}

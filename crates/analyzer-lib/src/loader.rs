//! Loading and alignment of experiment run data
//!
//! A run directory holds per-node resource CSVs (`node-<name>_<class>.csv`
//! for the usage, ratio and free classes) plus auxiliary pod lifecycle
//! files. Nodes sample independently, so the per-node frames are
//! outer-joined on timestamp, forward-filled, renamed to
//! `{node_id}_{metric}` columns and unit-scaled. Loading is a pure
//! function of file contents.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::debug;

use crate::error::{AnalyzerError, Result};
use crate::models::{PendingRecord, PodEvent, QueueSample, RunningRecord};
use crate::table::{Column, Frame, TimeSeriesTable};

/// Memory unit scaling, bytes to GB
pub const SCALE_MEMORY_FACTOR: f64 = 1.0 / (1024.0 * 1024.0 * 1024.0);

/// Ratio unit scaling, fraction to percent
pub const SCALE_RATIO_FACTOR: f64 = 100.0;

/// Decimal places kept after unit scaling
const ROUND_DECIMALS: u32 = 2;

/// The three per-node resource tables of one run, aligned and scaled
#[derive(Debug, Clone, Default)]
pub struct NodeTables {
    pub usage: TimeSeriesTable,
    pub ratios: TimeSeriesTable,
    pub free: TimeSeriesTable,
}

/// Parse a timestamp cell
///
/// Accepts RFC 3339 as well as the space-separated form the collector
/// historically wrote; naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(AnalyzerError::Timestamp(raw.to_string()))
}

/// Serde adapter for timestamp fields in CSV records
pub fn de_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Load, align and scale the per-node resource tables
///
/// Fails if `data_dir` does not exist. A class with no matching files
/// yields an empty table.
pub fn load_node_tables(data_dir: &Path) -> Result<NodeTables> {
    if !data_dir.is_dir() {
        return Err(AnalyzerError::MissingDataDir(data_dir.to_path_buf()));
    }

    let mut files: Vec<std::path::PathBuf> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("node-") && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut ratio_frames = Vec::new();
    let mut usage_frames = Vec::new();
    let mut free_frames = Vec::new();

    for file in &files {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        // node id is the stem before the first underscore, with dashes
        // normalized so column names stay single-token.
        let node_id = name
            .trim_end_matches(".csv")
            .split('_')
            .next()
            .unwrap_or(name)
            .replace('-', "_");
        let frame = read_node_frame(file, &node_id)?;
        debug!(file = %file.display(), node = %node_id, rows = frame.index.len(), "loaded node frame");

        if name.contains("ratio") {
            ratio_frames.push(frame);
        } else if name.contains("free") {
            free_frames.push(frame);
        } else {
            usage_frames.push(frame);
        }
    }

    let mut ratios = TimeSeriesTable::merge(ratio_frames);
    let mut usage = TimeSeriesTable::merge(usage_frames);
    let mut free = TimeSeriesTable::merge(free_frames);

    ratios.forward_fill();
    usage.forward_fill();
    free.forward_fill();

    usage.scale_columns(|name| name.contains("memory"), SCALE_MEMORY_FACTOR);
    free.scale_columns(|name| name.contains("memory"), SCALE_MEMORY_FACTOR);
    ratios.scale_columns(|_| true, SCALE_RATIO_FACTOR);

    usage.round_all(ROUND_DECIMALS);
    free.round_all(ROUND_DECIMALS);
    ratios.round_all(ROUND_DECIMALS);

    Ok(NodeTables {
        usage,
        ratios,
        free,
    })
}

/// Parse one per-node CSV into a frame
///
/// Drops columns whose name contains `pods`, renames the rest to
/// `{node_id}_{metric}`, removes duplicate timestamps (first wins) and
/// sorts by timestamp. Empty cells become NaN; anything else must be
/// numeric.
fn read_node_frame(path: &Path, node_id: &str) -> Result<Frame> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let ts_pos = headers
        .iter()
        .position(|h| h == "timestamp")
        .ok_or_else(|| AnalyzerError::Timestamp(format!("{}: no timestamp column", path.display())))?;

    // (source column position, renamed column)
    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(pos, name)| *pos != ts_pos && !name.contains("pods"))
        .map(|(pos, name)| (pos, format!("{}_{}", node_id, name)))
        .collect();

    let mut rows: Vec<(DateTime<Utc>, Vec<f64>)> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let ts = parse_timestamp(record.get(ts_pos).unwrap_or_default())?;
        let mut values = Vec::with_capacity(kept.len());
        for (pos, _) in &kept {
            values.push(parse_cell(record.get(*pos).unwrap_or_default())?);
        }
        rows.push((ts, values));
    }

    // Duplicate timestamps: first occurrence wins.
    let mut seen = std::collections::HashSet::new();
    rows.retain(|(ts, _)| seen.insert(*ts));
    rows.sort_by_key(|(ts, _)| *ts);

    let index: Vec<DateTime<Utc>> = rows.iter().map(|(ts, _)| *ts).collect();
    let columns = kept
        .iter()
        .enumerate()
        .map(|(col, (_, name))| Column {
            name: name.clone(),
            values: rows.iter().map(|(_, values)| values[col]).collect(),
        })
        .collect();

    Ok(Frame { index, columns })
}

fn parse_cell(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .map_err(|_| AnalyzerError::Number(raw.to_string()))
}

/// Load `pod_pending_durations.csv`
pub fn load_pending(data_dir: &Path) -> Result<Vec<PendingRecord>> {
    read_records(&data_dir.join("pod_pending_durations.csv"))
}

/// Load `pod_queue_length.csv`
pub fn load_queue(data_dir: &Path) -> Result<Vec<QueueSample>> {
    read_records(&data_dir.join("pod_queue_length.csv"))
}

/// Load `pod_running_durations.csv`
pub fn load_running(data_dir: &Path) -> Result<Vec<RunningRecord>> {
    read_records(&data_dir.join("pod_running_durations.csv"))
}

/// Load `event_timeline.csv`, dropping duplicate timestamps (first wins)
pub fn load_timeline(data_dir: &Path) -> Result<Vec<PodEvent>> {
    let mut events: Vec<PodEvent> = read_records(&data_dir.join("event_timeline.csv"))?;
    let mut seen = std::collections::HashSet::new();
    events.retain(|e| seen.insert(e.timestamp));
    Ok(events)
}

fn read_records<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

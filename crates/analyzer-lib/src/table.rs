//! Aligned time-series tables
//!
//! The analyzer works on wide tables keyed by timestamp: one row per
//! sampling instant, one numeric column per (node, metric) pair. Nodes
//! sample independently, so merging their frames produces gaps; those
//! are represented as NaN and closed by forward-fill. Gaps before a
//! column's first observation stay NaN (a node that has not reported
//! yet has no known value).

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::Result;

/// A single named column of f64 cells, NaN marking a missing value
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// A frame as parsed from one input file, prior to alignment
///
/// Rows are keyed by timestamp; duplicate timestamps have already been
/// removed (first occurrence wins) and the index is sorted.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: Vec<DateTime<Utc>>,
    pub columns: Vec<Column>,
}

/// Wide table sharing one sorted timestamp index across all columns
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Column-wise outer join of per-node frames
    ///
    /// The resulting index is the sorted union of all frame indexes.
    /// Cells a frame has no row for become NaN. An empty frame list
    /// yields an empty table.
    pub fn merge(frames: Vec<Frame>) -> Self {
        if frames.is_empty() {
            return Self::default();
        }

        let mut index: Vec<DateTime<Utc>> =
            frames.iter().flat_map(|f| f.index.iter().copied()).collect();
        index.sort_unstable();
        index.dedup();

        let mut columns = Vec::new();
        for frame in &frames {
            // Map each frame row onto its position in the union index.
            let positions: Vec<usize> = frame
                .index
                .iter()
                .map(|ts| index.binary_search(ts).expect("union index contains all frame timestamps"))
                .collect();
            for col in &frame.columns {
                let mut values = vec![f64::NAN; index.len()];
                for (row, &pos) in positions.iter().enumerate() {
                    values[pos] = col.values[row];
                }
                columns.push(Column {
                    name: col.name.clone(),
                    values,
                });
            }
        }

        Self { index, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Append a column; its length must match the index
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.index.len());
        self.columns.push(Column {
            name: name.into(),
            values,
        });
    }

    /// Replace each NaN cell with the column's last known value
    ///
    /// Cells before a column's first observation remain NaN.
    pub fn forward_fill(&mut self) {
        for col in &mut self.columns {
            let mut last = f64::NAN;
            for v in &mut col.values {
                if v.is_nan() {
                    *v = last;
                } else {
                    last = *v;
                }
            }
        }
    }

    /// Multiply every column whose name satisfies `pred` by `factor`
    pub fn scale_columns<F: Fn(&str) -> bool>(&mut self, pred: F, factor: f64) {
        for col in &mut self.columns {
            if pred(&col.name) {
                for v in &mut col.values {
                    *v *= factor;
                }
            }
        }
    }

    /// Round every cell to the given number of decimal places
    pub fn round_all(&mut self, decimals: u32) {
        let scale = 10f64.powi(decimals as i32);
        for col in &mut self.columns {
            for v in &mut col.values {
                if !v.is_nan() {
                    *v = (*v * scale).round() / scale;
                }
            }
        }
    }

    /// Row-wise sum over columns whose name satisfies `pred`
    ///
    /// NaN cells contribute nothing to a row's sum.
    pub fn sum_columns<F: Fn(&str) -> bool>(&self, pred: F) -> Vec<f64> {
        let selected: Vec<&Column> = self.columns.iter().filter(|c| pred(&c.name)).collect();
        (0..self.index.len())
            .map(|row| {
                selected
                    .iter()
                    .map(|c| c.values[row])
                    .filter(|v| !v.is_nan())
                    .sum()
            })
            .collect()
    }

    /// Seconds elapsed since the first timestamp, per row
    pub fn elapsed_seconds(&self) -> Vec<f64> {
        match self.index.first() {
            Some(&t0) => self
                .index
                .iter()
                .map(|ts| (*ts - t0).num_milliseconds() as f64 / 1000.0)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Value of `name` in the last row, if present and not NaN
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.column(name)
            .and_then(|values| values.last().copied())
            .filter(|v| !v.is_nan())
    }

    /// Serialize as CSV with a `timestamp` first column
    ///
    /// Timestamps are written in RFC 3339; NaN cells become empty
    /// fields.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["timestamp".to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;
        for (row, ts) in self.index.iter().enumerate() {
            let mut record = vec![ts.to_rfc3339()];
            for col in &self.columns {
                let v = col.values[row];
                if v.is_nan() {
                    record.push(String::new());
                } else {
                    record.push(v.to_string());
                }
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

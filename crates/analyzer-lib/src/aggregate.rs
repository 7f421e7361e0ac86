//! Cluster-wide aggregation columns
//!
//! Derives `total_cpu`, `total_memory` and `elapsed_seconds` columns
//! from a per-node table. Columns are selected by case-insensitive
//! substring match on the name rather than a fixed schema, so any
//! number of nodes is tolerated.

use crate::table::TimeSeriesTable;

/// Add cluster totals and an elapsed-time column to a per-node table
///
/// `total_cpu` sums every column containing `cpu`, `total_memory`
/// every column containing `mem`; any pre-existing `total` column is
/// excluded from both sums. Totals are rounded to 2 decimals. Empty
/// tables are left untouched.
pub fn add_cluster_totals(table: &mut TimeSeriesTable) {
    if table.is_empty() {
        return;
    }

    let total_cpu = round2(table.sum_columns(|name| matches_resource(name, "cpu")));
    let total_memory = round2(table.sum_columns(|name| matches_resource(name, "mem")));
    let elapsed = table.elapsed_seconds();

    table.add_column("total_cpu", total_cpu);
    table.add_column("total_memory", total_memory);
    table.add_column("elapsed_seconds", elapsed);
}

/// Case-insensitive substring match excluding totals
pub fn matches_resource(column: &str, resource: &str) -> bool {
    let lower = column.to_lowercase();
    lower.contains(resource) && !lower.contains("total")
}

fn round2(mut values: Vec<f64>) -> Vec<f64> {
    for v in &mut values {
        if !v.is_nan() {
            *v = (*v * 100.0).round() / 100.0;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Frame, TimeSeriesTable};
    use chrono::{TimeZone, Utc};

    fn table(columns: Vec<(&str, Vec<f64>)>) -> TimeSeriesTable {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let index = (0..rows)
            .map(|i| Utc.timestamp_opt(1_700_000_000 + i as i64 * 15, 0).unwrap())
            .collect();
        TimeSeriesTable::merge(vec![Frame {
            index,
            columns: columns
                .into_iter()
                .map(|(name, values)| Column {
                    name: name.to_string(),
                    values,
                })
                .collect(),
        }])
    }

    #[test]
    fn test_totals_sum_matching_columns() {
        let mut t = table(vec![
            ("node_a_cpu", vec![1.0, 2.0]),
            ("node_b_CPU", vec![3.0, 4.0]),
            ("node_a_memory", vec![0.5, 0.5]),
            ("node_b_memory", vec![1.5, 2.5]),
        ]);
        add_cluster_totals(&mut t);

        assert_eq!(t.column("total_cpu").unwrap(), &[4.0, 6.0]);
        assert_eq!(t.column("total_memory").unwrap(), &[2.0, 3.0]);
        assert_eq!(t.column("elapsed_seconds").unwrap(), &[0.0, 15.0]);
    }

    #[test]
    fn test_existing_total_column_excluded() {
        let mut t = table(vec![
            ("node_a_cpu", vec![1.0]),
            ("total_cpu_prev", vec![100.0]),
        ]);
        add_cluster_totals(&mut t);
        assert_eq!(t.column("total_cpu").unwrap(), &[1.0]);
    }

    #[test]
    fn test_empty_table_untouched() {
        let mut t = TimeSeriesTable::default();
        add_cluster_totals(&mut t);
        assert!(t.column("total_cpu").is_none());
    }

    #[test]
    fn test_mem_matches_both_spellings() {
        assert!(matches_resource("node_a_memory", "mem"));
        assert!(matches_resource("node_a_mem_free", "mem"));
        assert!(!matches_resource("total_memory", "mem"));
    }
}

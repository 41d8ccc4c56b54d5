//! Splits the daily series into one table per calendar month.

use std::collections::BTreeMap;
use std::path::PathBuf;

use merge_core::error::{AggregationError, Result};
use merge_core::schema::DATE_COLUMN;
use merge_core::table::{Cell, OutputFormat, Table};
use merge_core::time_utils::year_month;

/// Daily rows belonging to one `(year, month)`, sorted by `date_utc`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPartition {
    pub year: i32,
    pub month: u32,
    pub table: Table,
}

impl MonthlyPartition {
    /// `YYYY-MM` label.
    pub fn period_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Path relative to the output root: `YYYY/MM/daily_averaged_YYYY-MM.<ext>`.
    pub fn relative_path(&self, format: OutputFormat) -> PathBuf {
        let stem = format!("daily_averaged_{}", self.period_key());
        PathBuf::from(format!("{:04}", self.year))
            .join(format!("{:02}", self.month))
            .join(format.file_name(&stem))
    }
}

/// Group daily rows by the calendar month of `date_utc`.
///
/// Partitions are returned in ascending `(year, month)` order; rows inside
/// each one are sorted ascending by day. Every input row lands in exactly
/// one partition.
///
/// # Errors
/// * [`AggregationError::UnattributedDay`] when a row has no `date_utc`.
/// * [`AggregationError::NoPartitions`] when the input has no rows.
pub fn split_monthly(daily: &Table) -> Result<Vec<MonthlyPartition>> {
    let day_idx = daily
        .column_index(DATE_COLUMN)
        .ok_or_else(|| AggregationError::MissingColumn(DATE_COLUMN.to_string()))?;

    let mut groups: BTreeMap<(i32, u32), Vec<Vec<Cell>>> = BTreeMap::new();
    for (row_no, row) in daily.rows().iter().enumerate() {
        let key = row[day_idx]
            .as_timestamp()
            .map(year_month)
            .ok_or(AggregationError::UnattributedDay { row: row_no })?;
        groups.entry(key).or_default().push(row.clone());
    }

    if groups.is_empty() {
        return Err(AggregationError::NoPartitions.into());
    }

    groups
        .into_iter()
        .map(|((year, month), rows)| -> Result<MonthlyPartition> {
            let mut table = daily.with_rows(rows)?;
            table.sort_by_timestamp(DATE_COLUMN)?;
            Ok(MonthlyPartition { year, month, table })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

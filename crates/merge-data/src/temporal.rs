//! Builds the row-level `datetime_utc` column.

use merge_core::error::{Result, SchemaError, TemporalError};
use merge_core::schema::{TemporalFields, DATETIME_COLUMN};
use merge_core::table::{Cell, Table};
use merge_core::time_utils::compose_utc;
use tracing::info;

/// Add `datetime_utc` and drop every row that does not yield a valid UTC
/// timestamp.
///
/// Each of the four fields is coerced to a number (unparseable → missing)
/// and composed as `(year, month, day, hour)` in UTC. Rows with a missing
/// or out-of-range component are removed entirely.
///
/// # Errors
/// * [`SchemaError::MissingFields`] when any field name is absent.
/// * [`TemporalError::NoValidRows`] when nothing survives.
/// * [`TemporalError::NotTimestamp`] if the new column is not timestamp-only.
pub fn build_datetime_utc(mut table: Table, fields: &TemporalFields) -> Result<Table> {
    fields.require_in(table.columns())?;

    let index_of = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| SchemaError::MissingFields(vec![name.to_string()]))
    };
    let (y, m, d, h) = (
        index_of(&fields.year)?,
        index_of(&fields.month)?,
        index_of(&fields.day)?,
        index_of(&fields.hour)?,
    );

    let input_rows = table.n_rows();
    let stamps: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| {
            let ts = compose_utc(
                row[y].as_number(),
                row[m].as_number(),
                row[d].as_number(),
                row[h].as_number(),
            );
            ts.map(Cell::Timestamp).unwrap_or(Cell::Empty)
        })
        .collect();

    table.push_column(DATETIME_COLUMN, stamps)?;
    let ts_idx = table
        .column_index(DATETIME_COLUMN)
        .ok_or_else(|| SchemaError::MissingFields(vec![DATETIME_COLUMN.to_string()]))?;
    table.retain_rows(|row| !row[ts_idx].is_empty());

    info!("Rows after dropping invalid datetime: {}", table.n_rows());
    if table.is_empty() {
        return Err(TemporalError::NoValidRows { input_rows }.into());
    }

    ensure_timestamp_column(&table, DATETIME_COLUMN)?;
    Ok(table)
}

/// Every cell of `column` must hold a timestamp.
fn ensure_timestamp_column(table: &Table, column: &str) -> std::result::Result<(), TemporalError> {
    let not_timestamp = |row: usize| TemporalError::NotTimestamp {
        column: column.to_string(),
        row,
    };
    let cells = table.column(column).ok_or_else(|| not_timestamp(0))?;
    for (row, cell) in cells.enumerate() {
        if cell.as_timestamp().is_none() {
            return Err(not_timestamp(row));
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

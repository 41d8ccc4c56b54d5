//! Daily averaging of the time-normalised observation table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use merge_core::error::{AggregationError, Result};
use merge_core::schema::{Schema, TemporalFields, DATETIME_COLUMN, DATE_COLUMN};
use merge_core::table::{Cell, Table};
use merge_core::time_utils::floor_to_day;
use tracing::info;

// ── DailyAccumulator ──────────────────────────────────────────────────────────

/// Running sums and non-missing counts for one day, one slot per measurement.
#[derive(Debug, Clone)]
pub struct DailyAccumulator {
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl DailyAccumulator {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }

    /// Add one row's values; missing values are skipped, not zeroed.
    fn add_row(&mut self, values: impl Iterator<Item = Option<f64>>) {
        for (slot, value) in values.enumerate() {
            if let Some(v) = value {
                self.sums[slot] += v;
                self.counts[slot] += 1;
            }
        }
    }

    /// Arithmetic mean per slot; `None` where the day had no values.
    pub fn means(&self) -> Vec<Option<f64>> {
        self.sums
            .iter()
            .zip(&self.counts)
            .map(|(sum, count)| (*count > 0).then(|| sum / f64::from(*count)))
            .collect()
    }
}

// ── DailyAverages ─────────────────────────────────────────────────────────────

/// Output of [`aggregate_daily`].
#[derive(Debug, Clone)]
pub struct DailyAverages {
    /// `date_utc` followed by one mean column per measurement.
    pub table: Table,
    pub measurement_columns: Vec<String>,
}

/// Floor `datetime_utc` to the UTC day and average every measurement column
/// per day.
///
/// Rows come out in ascending day order.
///
/// # Errors
/// * [`AggregationError::MissingColumn`] when `datetime_utc` is absent.
/// * [`AggregationError::NoMeasurementColumns`] when nothing is averageable.
/// * [`AggregationError::NotDateTime`] when a row's day is not a timestamp.
pub fn aggregate_daily(table: &Table, fields: &TemporalFields) -> Result<DailyAverages> {
    let mut table = table.clone();
    let ts_idx = table
        .column_index(DATETIME_COLUMN)
        .ok_or_else(|| AggregationError::MissingColumn(DATETIME_COLUMN.to_string()))?;

    let days: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| match row[ts_idx].as_timestamp() {
            Some(ts) => Cell::Timestamp(floor_to_day(ts)),
            None => Cell::Empty,
        })
        .collect();
    table.push_column(DATE_COLUMN, days)?;

    let measurement_columns = Schema::discover(&table, fields).measurement_columns();
    if measurement_columns.is_empty() {
        return Err(AggregationError::NoMeasurementColumns.into());
    }
    info!(
        "Numeric measurement columns to average: {}",
        measurement_columns.len()
    );

    let day_idx = table
        .column_index(DATE_COLUMN)
        .ok_or_else(|| AggregationError::MissingColumn(DATE_COLUMN.to_string()))?;
    let value_idx: Vec<usize> = measurement_columns
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();

    let mut by_day: BTreeMap<DateTime<Utc>, DailyAccumulator> = BTreeMap::new();
    for (row_no, row) in table.rows().iter().enumerate() {
        let day = row[day_idx]
            .as_timestamp()
            .ok_or_else(|| AggregationError::NotDateTime {
                column: DATE_COLUMN.to_string(),
                row: row_no,
            })?;
        by_day
            .entry(day)
            .or_insert_with(|| DailyAccumulator::new(value_idx.len()))
            .add_row(value_idx.iter().map(|&i| row[i].as_number()));
    }

    let mut columns = Vec::with_capacity(measurement_columns.len() + 1);
    columns.push(DATE_COLUMN.to_string());
    columns.extend(measurement_columns.iter().cloned());

    let rows = by_day
        .into_iter()
        .map(|(day, acc)| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(Cell::Timestamp(day));
            row.extend(acc.means().into_iter().map(Cell::from_number));
            row
        })
        .collect();

    let daily = Table::new(columns, rows)?;
    info!("Daily-averaged rows: {}", daily.n_rows());

    Ok(DailyAverages {
        table: daily,
        measurement_columns,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use merge_core::error::MergeError;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> Cell {
        Cell::Timestamp(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    fn day(y: i32, m: u32, d: u32) -> Cell {
        ts(y, m, d, 0)
    }

    /// Table shaped like the temporal stage output, with `Temp` and `Note`.
    fn normalized(rows: Vec<(Cell, Cell, Cell)>) -> Table {
        let columns = [
            "Year",
            "Month",
            "Day",
            "Three-hourly observation time(UTC)",
            "Temp",
            "Note",
            "datetime_utc",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows = rows
            .into_iter()
            .map(|(temp, note, stamp)| {
                vec![
                    Cell::Number(2005.0),
                    Cell::Number(1.0),
                    Cell::Number(1.0),
                    Cell::Number(0.0),
                    temp,
                    note,
                    stamp,
                ]
            })
            .collect();
        Table::new(columns, rows).unwrap()
    }

    // ── DailyAccumulator ──────────────────────────────────────────────────────

    #[test]
    fn test_accumulator_skips_missing() {
        let mut acc = DailyAccumulator::new(2);
        acc.add_row([Some(10.0), None].into_iter());
        acc.add_row([None, None].into_iter());
        assert_eq!(acc.means(), vec![Some(10.0), None]);
    }

    // ── aggregate_daily ───────────────────────────────────────────────────────

    #[test]
    fn test_daily_means_by_day() {
        let t = normalized(vec![
            (Cell::Number(5.0), Cell::Empty, ts(2005, 1, 1, 0)),
            (Cell::Number(7.0), Cell::Empty, ts(2005, 1, 1, 6)),
            (Cell::Text("9".into()), Cell::Empty, ts(2005, 1, 1, 12)),
            (Cell::Number(20.0), Cell::Empty, ts(2005, 2, 1, 0)),
        ]);
        let out = aggregate_daily(&t, &TemporalFields::default()).unwrap();

        assert_eq!(out.measurement_columns, vec!["Temp"]);
        assert_eq!(out.table.columns(), &["date_utc", "Temp"]);
        assert_eq!(
            out.table.rows(),
            &[
                vec![day(2005, 1, 1), Cell::Number(7.0)],
                vec![day(2005, 2, 1), Cell::Number(20.0)],
            ]
        );
    }

    #[test]
    fn test_missing_values_excluded_from_mean() {
        let t = normalized(vec![
            (Cell::Number(10.0), Cell::Empty, ts(2005, 1, 1, 0)),
            (Cell::Empty, Cell::Empty, ts(2005, 1, 1, 3)),
        ]);
        let out = aggregate_daily(&t, &TemporalFields::default()).unwrap();
        assert_eq!(out.table.rows()[0][1], Cell::Number(10.0));
    }

    #[test]
    fn test_all_missing_day_yields_missing_mean() {
        let t = normalized(vec![
            (Cell::Number(1.0), Cell::Empty, ts(2005, 1, 1, 0)),
            (Cell::Text("--".into()), Cell::Empty, ts(2005, 1, 2, 0)),
        ]);
        let out = aggregate_daily(&t, &TemporalFields::default()).unwrap();
        assert_eq!(out.table.rows()[1], vec![day(2005, 1, 2), Cell::Empty]);
    }

    #[test]
    fn test_output_sorted_by_day() {
        let t = normalized(vec![
            (Cell::Number(3.0), Cell::Empty, ts(2005, 3, 1, 0)),
            (Cell::Number(1.0), Cell::Empty, ts(2005, 1, 1, 0)),
            (Cell::Number(2.0), Cell::Empty, ts(2005, 2, 1, 0)),
        ]);
        let out = aggregate_daily(&t, &TemporalFields::default()).unwrap();
        let days: Vec<_> = out.table.column("date_utc").unwrap().cloned().collect();
        assert_eq!(days, vec![day(2005, 1, 1), day(2005, 2, 1), day(2005, 3, 1)]);
    }

    #[test]
    fn test_existing_date_column_is_replaced_by_floored_day() {
        let columns = [
            "Year",
            "Month",
            "Day",
            "Three-hourly observation time(UTC)",
            "date_utc",
            "Temp",
            "datetime_utc",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let row = |temp: f64, h: u32| {
            vec![
                Cell::Number(2005.0),
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(f64::from(h)),
                Cell::Text("stale".into()),
                Cell::Number(temp),
                ts(2005, 1, 1, h),
            ]
        };
        let t = Table::new(columns, vec![row(5.0, 6), row(7.0, 12)]).unwrap();
        let out = aggregate_daily(&t, &TemporalFields::default()).unwrap();

        assert_eq!(out.measurement_columns, vec!["Temp"]);
        assert_eq!(
            out.table.rows(),
            &[vec![day(2005, 1, 1), Cell::Number(6.0)]]
        );
    }

    #[test]
    fn test_no_measurement_columns() {
        let t = normalized(vec![(
            Cell::Text("n/a".into()),
            Cell::Text("cloudy".into()),
            ts(2005, 1, 1, 0),
        )]);
        let err = aggregate_daily(&t, &TemporalFields::default()).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Aggregation(AggregationError::NoMeasurementColumns)
        ));
    }

    #[test]
    fn test_non_timestamp_row_is_fatal() {
        let t = normalized(vec![
            (Cell::Number(1.0), Cell::Empty, ts(2005, 1, 1, 0)),
            (Cell::Number(2.0), Cell::Empty, Cell::Empty),
        ]);
        let err = aggregate_daily(&t, &TemporalFields::default()).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Aggregation(AggregationError::NotDateTime { row: 1, .. })
        ));
    }

    #[test]
    fn test_missing_datetime_column() {
        let t = Table::new(vec!["Temp".into()], vec![vec![Cell::Number(1.0)]]).unwrap();
        let err = aggregate_daily(&t, &TemporalFields::default()).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Aggregation(AggregationError::MissingColumn(_))
        ));
    }
}

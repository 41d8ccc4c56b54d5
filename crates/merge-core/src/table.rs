//! Ordered, row-major table of cells shared by every pipeline stage.
//!
//! A [`Table`] holds labelled columns, rows of [`Cell`]s,
//! and the handful of whole-table operations the stages need (positional
//! relabelling, derived columns, row filtering, sorting, column dropping).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, SchemaError};

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single table value. `Empty` is the missing marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Coerce to a number, turning anything unparseable into `None`.
    ///
    /// * `Number` passes through, except NaN which counts as missing.
    /// * `Bool` becomes `1.0` / `0.0`.
    /// * `Text` is trimmed and parsed as `f64`.
    /// * `Empty` and `Timestamp` are missing.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty | Cell::Timestamp(_) => return None,
        };
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }

    /// Return the timestamp when this cell holds one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Cell::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Wrap an optional number, mapping `None` to `Empty`.
    pub fn from_number(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

// ── HeaderMode ────────────────────────────────────────────────────────────────

/// How a tabular source treats its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// The first row supplies the column labels.
    FirstRow,
    /// Every row is data; labels are the positional integers `0..width`.
    NoHeader,
}

// ── OutputFormat ──────────────────────────────────────────────────────────────

/// File format of written tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Excel workbook with a single sheet.
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }

    /// `stem` plus this format's extension.
    pub fn file_name(self, stem: &str) -> String {
        format!("{}.{}", stem, self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Labelled columns over row-major cells. Every row has one cell per label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, rejecting rows whose width differs from the label count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, SchemaError> {
        let expected = columns.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(SchemaError::RaggedRow {
                row,
                found: cells.len(),
                expected,
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column labelled `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of column `name` top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Replace every label positionally, left to right.
    pub fn set_columns(&mut self, labels: Vec<String>) -> Result<(), SchemaError> {
        if labels.len() != self.columns.len() {
            return Err(SchemaError::ColumnCountMismatch {
                found: self.columns.len(),
                expected: labels.len(),
                reloaded: false,
            });
        }
        self.columns = labels;
        Ok(())
    }

    /// Append a derived column, one cell per existing row.
    ///
    /// An existing column with the same label is overwritten in place.
    pub fn push_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<(), SchemaError> {
        if cells.len() != self.rows.len() {
            return Err(SchemaError::RaggedRow {
                row: self.rows.len().min(cells.len()),
                found: cells.len(),
                expected: self.rows.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
        Ok(())
    }

    /// Keep only the rows for which `keep` returns `true`, preserving order.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Cell]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Remove the named columns. Unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        retain_flagged(&mut self.columns, &keep);
        for row in &mut self.rows {
            retain_flagged(row, &keep);
        }
    }

    /// Stable ascending sort by the timestamp held in column `name`.
    ///
    /// Rows without a timestamp sort last.
    pub fn sort_by_timestamp(&mut self, name: &str) -> Result<(), AggregationError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| AggregationError::MissingColumn(name.to_string()))?;
        self.rows.sort_by(|a, b| {
            match (a[idx].as_timestamp(), b[idx].as_timestamp()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        Ok(())
    }

    /// Build a new table from a subset of rows, keeping the same labels.
    pub fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Result<Self, SchemaError> {
        Self::new(self.columns.clone(), rows)
    }
}

fn retain_flagged<T>(items: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    items.retain(|_| *flags.next().unwrap_or(&true));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Tabular file loading for the merge pipeline.
//!
//! Spreadsheets are read through `calamine` (xls, xlsx, xlsm, xlsb, ods) and
//! delimited text through `csv`. Either way the file becomes a rectangular
//! grid of [`Cell`]s which is then split into labels and rows according to a
//! [`HeaderMode`].

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use merge_core::columns::normalize_labels;
use merge_core::error::{MergeError, Result, SchemaError};
use merge_core::table::{Cell, HeaderMode, Table};
use tracing::debug;

// ── TableSource ───────────────────────────────────────────────────────────────

/// Anything that can be loaded as a table with or without a header row.
pub trait TableSource {
    /// Human-readable name used in progress messages.
    fn describe(&self) -> String;

    fn load(&self, mode: HeaderMode) -> Result<Table>;
}

// ── FileSource ────────────────────────────────────────────────────────────────

/// A table backed by a file on disk; the format follows the extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl FileSource {
    /// `sheet` selects a workbook sheet by name; `None` means the first one.
    /// It is ignored for CSV files.
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_grid(&self) -> Result<Vec<Vec<Cell>>> {
        if !self.path.is_file() {
            return Err(MergeError::FileRead {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => read_csv_grid(&self.path),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => {
                read_workbook_grid(&self.path, self.sheet.as_deref())
            }
            _ => Err(MergeError::UnsupportedFormat(self.path.clone())),
        }
    }
}

impl TableSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, mode: HeaderMode) -> Result<Table> {
        let grid = self.read_grid()?;
        let table = grid_to_table(grid, mode)?;
        debug!(
            "Loaded {} ({:?}): {} rows x {} cols",
            self.path.display(),
            mode,
            table.n_rows(),
            table.n_cols()
        );
        Ok(table)
    }
}

// ── GridSource ────────────────────────────────────────────────────────────────

/// In-memory grid, loaded exactly like a file would be.
#[derive(Debug, Clone)]
pub struct GridSource {
    name: String,
    grid: Vec<Vec<Cell>>,
}

impl GridSource {
    pub fn new(name: impl Into<String>, grid: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }
}

impl TableSource for GridSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn load(&self, mode: HeaderMode) -> Result<Table> {
        grid_to_table(self.grid.clone(), mode)
    }
}

// ── Header template ───────────────────────────────────────────────────────────

/// Load the canonical label sequence from a header template.
///
/// Only the first row matters; the template's data rows are ignored.
pub fn load_header_template(source: &dyn TableSource) -> Result<Vec<String>> {
    let template = source.load(HeaderMode::FirstRow)?;
    let canonical = normalize_labels(template.columns());
    if canonical.is_empty() {
        return Err(SchemaError::EmptyHeaderTemplate.into());
    }
    Ok(canonical)
}

// ── Grid → Table ──────────────────────────────────────────────────────────────

/// Split a raw grid into labels and rows.
///
/// Rows are padded with `Empty` to the widest row. With
/// [`HeaderMode::FirstRow`] the first row is rendered into labels; with
/// [`HeaderMode::NoHeader`] the labels are `"0"`, `"1"`, ...
pub fn grid_to_table(mut grid: Vec<Vec<Cell>>, mode: HeaderMode) -> Result<Table> {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, Cell::Empty);
    }

    let (labels, rows): (Vec<String>, Vec<Vec<Cell>>) = match mode {
        HeaderMode::NoHeader => ((0..width).map(|i| i.to_string()).collect(), grid),
        HeaderMode::FirstRow => {
            if grid.is_empty() {
                (Vec::new(), Vec::new())
            } else {
                let header = grid.remove(0);
                let labels = header
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| header_label(cell, idx))
                    .collect();
                (labels, grid)
            }
        }
    };

    Ok(Table::new(labels, rows)?)
}

/// Render a header cell the way spreadsheet readers label columns:
/// integral numbers lose their fraction, blanks become `Unnamed: <idx>`.
fn header_label(cell: &Cell, idx: usize) -> String {
    match cell {
        Cell::Empty => format!("Unnamed: {}", idx),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        other => other.to_string(),
    }
}

// ── Format readers ────────────────────────────────────────────────────────────

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| table_read_error(path, e))?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_read_error(path, e))?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(grid)
}

fn read_workbook_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>> {
    // calamine auto-detects xls, xlsx, xlsb and ods.
    let mut workbook = open_workbook_auto(path).map_err(|e| table_read_error(path, e))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| MergeError::TableRead {
                path: path.to_path_buf(),
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| table_read_error(path, e))?;

    let (rows, cols) = range.get_size();
    debug!(
        "Sheet '{}' of {}: {} rows x {} cols",
        sheet_name,
        path.display(),
        rows,
        cols
    );

    Ok(range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect())
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::Timestamp(naive.and_utc()),
            None => Cell::Text(data.to_string()),
        },
        other => Cell::Text(other.to_string()),
    }
}

fn table_read_error(path: &Path, err: impl std::fmt::Display) -> MergeError {
    MergeError::TableRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

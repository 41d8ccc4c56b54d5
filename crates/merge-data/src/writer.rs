//! Table output as xlsx workbooks or CSV.
//!
//! Every file is written next to its destination under a `.tmp` name and
//! renamed into place, so a failed write never leaves a truncated table at
//! the final path.

use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use merge_core::error::{MergeError, Result};
use merge_core::table::{Cell, OutputFormat, Table};
use merge_core::time_utils::to_naive_utc_string;
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

/// Excel number format applied to timestamp cells.
pub const XLSX_DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

// ── Public API ────────────────────────────────────────────────────────────────

/// Write `table` to `path` in `format`, creating parent directories.
pub fn write_table(table: &Table, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Xlsx => write_table_xlsx(table, path),
        OutputFormat::Csv => write_table_csv(table, path),
    }
}

/// Single-sheet workbook with a header row. Timestamps are stored as naive
/// UTC datetimes; missing values leave the cell blank.
pub fn write_table_xlsx(table: &Table, path: &Path) -> Result<()> {
    write_via_temp(path, |temp| write_xlsx_file(table, temp, path))?;
    debug!(
        "Wrote {} rows x {} cols to {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(())
}

/// CSV with a header row. Timestamps are written as naive UTC
/// (`YYYY-MM-DD HH:MM:SS`) and missing values as an empty field.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    write_via_temp(path, |temp| write_csv_file(table, temp, path))?;
    debug!(
        "Wrote {} rows x {} cols to {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(())
}

/// Render one cell as a CSV field.
pub fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Timestamp(ts) => to_naive_utc_string(*ts),
        other => other.to_string(),
    }
}

// ── Temp-file handling ────────────────────────────────────────────────────────

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Run `write` against a sibling temp file, then rename it onto `path`.
/// The temp file is removed when either step fails.
fn write_via_temp(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| MergeError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path_for(path);
    let written = write(&temp_path).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|source| MergeError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    });
    if written.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            debug!("Could not remove {}: {}", temp_path.display(), e);
        }
    }
    written
}

fn table_write_error(path: &Path, err: impl std::fmt::Display) -> MergeError {
    MergeError::TableWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// ── Format writers ────────────────────────────────────────────────────────────

fn write_csv_file(table: &Table, temp: &Path, dest: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(temp)
        .map_err(|e| table_write_error(dest, e))?;
    writer
        .write_record(table.columns())
        .map_err(|e| table_write_error(dest, e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(render_cell))
            .map_err(|e| table_write_error(dest, e))?;
    }
    writer.flush().map_err(|source| MergeError::FileWrite {
        path: temp.to_path_buf(),
        source,
    })
}

fn write_xlsx_file(table: &Table, temp: &Path, dest: &Path) -> Result<()> {
    let datetime_format = Format::new().set_num_format(XLSX_DATETIME_FORMAT);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let position = |row: usize, col: usize| {
        u32::try_from(row)
            .ok()
            .zip(u16::try_from(col).ok())
            .ok_or_else(|| table_write_error(dest, "table exceeds the xlsx sheet size"))
    };

    for (c, label) in table.columns().iter().enumerate() {
        let (r, c) = position(0, c)?;
        sheet
            .write_string(r, c, label.as_str())
            .map_err(|e| table_write_error(dest, e))?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (xr, xc) = position(r + 1, c)?;
            let written = match cell {
                Cell::Empty => continue,
                Cell::Number(n) => sheet.write_number(xr, xc, *n),
                Cell::Text(s) => sheet.write_string(xr, xc, s.as_str()),
                Cell::Bool(b) => sheet.write_boolean(xr, xc, *b),
                Cell::Timestamp(ts) => {
                    sheet.write_datetime_with_format(xr, xc, &ts.naive_utc(), &datetime_format)
                }
            };
            written.map_err(|e| table_write_error(dest, e))?;
        }
    }

    workbook
        .save(temp)
        .map_err(|e| table_write_error(dest, e))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

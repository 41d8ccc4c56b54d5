//! End-to-end merge run.
//!
//! Runs every stage in order, writes each artifact as soon as it exists and
//! returns a [`RunSummary`] that is also persisted next to the outputs.
//! The first failing stage aborts the run; files already written stay where
//! they are.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use merge_core::error::{MergeError, Result};
use merge_core::schema::TemporalFields;
use merge_core::table::OutputFormat;
use merge_data::aggregator::aggregate_daily;
use merge_data::partition::split_monthly;
use merge_data::reader::{load_header_template, FileSource, TableSource};
use merge_data::reconciler::reconcile;
use merge_data::temporal::build_datetime_utc;
use merge_data::writer::write_table;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Row-level dataset with `datetime_utc`.
pub const NORMALIZED_STEM: &str = "normalized_merged";
/// One row per UTC day.
pub const DAILY_STEM: &str = "daily_averaged";
pub const SUMMARY_FILE: &str = "run_summary.json";

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub header: PathBuf,
    pub data: PathBuf,
    pub output_dir: PathBuf,
    /// Workbook sheet used for both inputs; `None` means the first sheet.
    pub sheet: Option<String>,
    pub fields: TemporalFields,
    pub format: OutputFormat,
}

/// Record of a completed run, written as `run_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// ISO-8601 timestamp when the run finished.
    pub generated_at: String,
    pub header_source: String,
    pub data_source: String,
    pub output_format: OutputFormat,
    pub canonical_columns: usize,
    /// Whether the data had to be reloaded without a header row.
    pub reloaded: bool,
    /// Rows in the reconciled data table.
    pub input_rows: usize,
    /// Rows that produced a valid `datetime_utc`.
    pub kept_rows: usize,
    pub measurement_columns: Vec<String>,
    pub daily_records: usize,
    /// Monthly files relative to the output directory, oldest first.
    pub monthly_files: Vec<PathBuf>,
    pub elapsed_seconds: f64,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the merge on the files named in `config`.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let header = FileSource::new(&config.header, config.sheet.clone());
    let data = FileSource::new(&config.data, config.sheet.clone());
    run_with_sources(
        &header,
        &data,
        &config.output_dir,
        &config.fields,
        config.format,
    )
}

/// Run the merge on arbitrary sources.
///
/// 1. Load the canonical labels from `header`.
/// 2. Reconcile `data` against them.
/// 3. Build `datetime_utc`, write `normalized_merged.<ext>`.
/// 4. Average per day, write `daily_averaged.<ext>`.
/// 5. Split per month, write one file per `(year, month)`.
/// 6. Write `run_summary.json`.
pub fn run_with_sources(
    header: &dyn TableSource,
    data: &dyn TableSource,
    output_dir: &Path,
    fields: &TemporalFields,
    format: OutputFormat,
) -> Result<RunSummary> {
    let started = Instant::now();

    // ── Step 1: Canonical labels ──────────────────────────────────────────────
    info!("Loading header file: {}", header.describe());
    let canonical = load_header_template(header)?;
    info!("Header columns: {}", canonical.len());

    // ── Step 2: Reconcile ─────────────────────────────────────────────────────
    let reconciled = reconcile(data, &canonical)?;
    let input_rows = reconciled.table.n_rows();

    // ── Step 3: datetime_utc ──────────────────────────────────────────────────
    let normalized = build_datetime_utc(reconciled.table, fields)?;
    fs::create_dir_all(output_dir).map_err(|source| MergeError::FileWrite {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let normalized_path = output_dir.join(format.file_name(NORMALIZED_STEM));
    write_table(&normalized, &normalized_path, format)?;
    info!("Saved normalized merged dataset: {}", normalized_path.display());

    // ── Step 4: Daily means ───────────────────────────────────────────────────
    let daily = aggregate_daily(&normalized, fields)?;
    let daily_path = output_dir.join(format.file_name(DAILY_STEM));
    write_table(&daily.table, &daily_path, format)?;
    info!("Saved daily averaged dataset: {}", daily_path.display());

    // ── Step 5: Monthly split ─────────────────────────────────────────────────
    let partitions = split_monthly(&daily.table)?;
    let mut monthly_files = Vec::with_capacity(partitions.len());
    for part in &partitions {
        let relative = part.relative_path(format);
        write_table(&part.table, &output_dir.join(&relative), format)?;
        info!(
            "Saved monthly daily-averaged file: {} ({} days)",
            relative.display(),
            part.table.n_rows()
        );
        monthly_files.push(relative);
    }

    // ── Step 6: Summary ───────────────────────────────────────────────────────
    let summary = RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        header_source: header.describe(),
        data_source: data.describe(),
        output_format: format,
        canonical_columns: canonical.len(),
        reloaded: reconciled.reload.is_some(),
        input_rows,
        kept_rows: normalized.n_rows(),
        measurement_columns: daily.measurement_columns,
        daily_records: daily.table.n_rows(),
        monthly_files,
        elapsed_seconds: started.elapsed().as_secs_f64(),
    };
    write_summary(&summary, &output_dir.join(SUMMARY_FILE))?;
    info!("Done. Monthly files written: {}", summary.monthly_files.len());

    Ok(summary)
}

fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).map_err(|source| MergeError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

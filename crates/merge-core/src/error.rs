use std::path::PathBuf;
use thiserror::Error;

// ── Stage errors ───────────────────────────────────────────────────────────────

/// Failures while deriving or enforcing the canonical column layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The header template produced no column labels at all.
    #[error("Header template has no columns")]
    EmptyHeaderTemplate,

    /// The data table could not be brought to the canonical width.
    #[error(
        "Column count mismatch{}: data has {found} cols, header defines {expected} cols",
        reload_note(.reloaded)
    )]
    ColumnCountMismatch {
        found: usize,
        expected: usize,
        reloaded: bool,
    },

    /// Required temporal fields are absent from the reconciled labels.
    #[error("Missing required datetime fields in merged dataset: {0:?}")]
    MissingFields(Vec<String>),

    /// A row does not have one cell per column label.
    #[error("Row {row} has {found} cells but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

fn reload_note(reloaded: &bool) -> &'static str {
    if *reloaded {
        " after reloading without a header row"
    } else {
        ""
    }
}

/// Failures while composing `datetime_utc`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// The derived column holds something other than UTC timestamps.
    #[error("{column} is not a timestamp column after parsing (row {row})")]
    NotTimestamp { column: String, row: usize },

    /// Every input row was discarded.
    #[error("No valid rows remain after datetime parsing ({input_rows} rows in input)")]
    NoValidRows { input_rows: usize },
}

/// Failures in the daily averaging and monthly split stages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No numeric measurement columns found for daily averaging")]
    NoMeasurementColumns,

    /// The day column holds something other than UTC timestamps.
    #[error("{column} is not a datetime column in the daily result (row {row})")]
    NotDateTime { column: String, row: usize },

    /// A daily row resolved to no concrete (year, month).
    #[error("Found missing year/month during monthly split (row {row})")]
    UnattributedDay { row: usize },

    #[error("No monthly partitions were produced")]
    NoPartitions,

    /// A column the stage relies on is not present.
    #[error("Column {0:?} not found")]
    MissingColumn(String),
}

// ── MergeError ─────────────────────────────────────────────────────────────────

/// All errors produced by the merge pipeline.
#[derive(Error, Debug)]
pub enum MergeError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tabular reader rejected the file contents.
    #[error("Failed to load table from {path}: {message}")]
    TableRead { path: PathBuf, message: String },

    /// The tabular writer failed part-way through.
    #[error("Failed to save table to {path}: {message}")]
    TableWrite { path: PathBuf, message: String },

    /// The file extension is not one the reader understands.
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the merge crates.
pub type Result<T> = std::result::Result<T, MergeError>;

use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};
use crate::schema::TemporalFields;
use crate::table::OutputFormat;

/// Directory under the home dir holding persisted state and logs.
pub const APP_DIR_NAME: &str = ".obs-merge";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Merge a header template with an observation extract and write daily and
/// monthly averages
#[derive(Parser, Debug, Clone)]
#[command(
    name = "obs-merge",
    about = "Merge a header template with an observation extract and write daily and monthly averages",
    version
)]
pub struct Settings {
    /// Header template file (.xls, .xlsx, .xlsm, .xlsb, .ods or .csv)
    #[arg(long)]
    pub header: Option<PathBuf>,

    /// Data extract file (.xls, .xlsx, .xlsm, .xlsb, .ods or .csv)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Directory that receives every output file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Workbook sheet to read (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Canonical name of the year column
    #[arg(long, default_value = "Year")]
    pub year_field: String,

    /// Canonical name of the month column
    #[arg(long, default_value = "Month")]
    pub month_field: String,

    /// Canonical name of the day column
    #[arg(long, default_value = "Day")]
    pub day_field: String,

    /// Canonical name of the three-hourly observation time (UTC) column
    #[arg(long, default_value = "Three-hourly observation time(UTC)")]
    pub time_field: String,

    /// File format of the written tables
    #[arg(long, default_value = "xlsx", value_parser = ["xlsx", "csv"])]
    pub output_format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved input/output paths
    #[arg(long)]
    pub clear: bool,
}

/// Input and output locations after CLI and persisted values are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub header: PathBuf,
    pub data: PathBuf,
    pub output_dir: PathBuf,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.obs-merge/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|source| MergeError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset paths from the last run, and persist
    /// the merged result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins.
        if !is_arg_explicitly_set(&matches, "header") {
            settings.header = settings.header.or(last.header);
        }
        if !is_arg_explicitly_set(&matches, "data") {
            settings.data = settings.data.or(last.data);
        }
        // NOTE: clap stores the arg id using the field name, not the flag.
        if !is_arg_explicitly_set(&matches, "output_dir") {
            settings.output_dir = settings.output_dir.or(last.output_dir);
        }
        if !is_arg_explicitly_set(&matches, "sheet") {
            settings.sheet = settings.sheet.or(last.sheet);
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!("Could not persist last-used params: {}", e);
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Resolve the three required locations or name the first one missing.
    pub fn run_paths(&self) -> Result<RunPaths> {
        let require = |value: &Option<PathBuf>, flag: &str| {
            value
                .clone()
                .ok_or_else(|| MergeError::Config(format!("missing --{}", flag)))
        };
        Ok(RunPaths {
            header: require(&self.header, "header")?,
            data: require(&self.data, "data")?,
            output_dir: require(&self.output_dir, "output-dir")?,
        })
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output_format.parse().map_err(MergeError::Config)
    }

    pub fn temporal_fields(&self) -> TemporalFields {
        TemporalFields {
            year: self.year_field.clone(),
            month: self.month_field.clone(),
            day: self.day_field.clone(),
            hour: self.time_field.clone(),
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            header: s.header.clone(),
            data: s.data.clone(),
            output_dir: s.output_dir.clone(),
            sheet: s.sheet.clone(),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

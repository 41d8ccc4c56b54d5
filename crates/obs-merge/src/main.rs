mod bootstrap;

use anyhow::{Context, Result};
use merge_core::settings::Settings;
use merge_runtime::pipeline::{self, PipelineConfig};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("obs-merge v{} starting", env!("CARGO_PKG_VERSION"));

    let paths = settings.run_paths()?;
    tracing::info!(
        "Header: {}, Data: {}, Output: {}",
        paths.header.display(),
        paths.data.display(),
        paths.output_dir.display()
    );

    let config = PipelineConfig {
        header: paths.header,
        data: paths.data,
        output_dir: paths.output_dir,
        sheet: settings.sheet.clone(),
        fields: settings.temporal_fields(),
        format: settings.output_format()?,
    };

    let summary = pipeline::run(&config).context("merge run failed")?;
    tracing::info!(
        "Kept {} of {} rows; {} daily records across {} monthly files",
        summary.kept_rows,
        summary.input_rows,
        summary.daily_records,
        summary.monthly_files.len()
    );

    Ok(())
}

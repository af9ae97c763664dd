use std::path::{Path, PathBuf};

use anyhow::Context;
use formeval_core::config_file::ConfigFile;
use formeval_reporting::ExportFormat;

pub const WORKERS_ENV: &str = "FORMEVAL_WORKERS";
pub const FORMAT_ENV: &str = "FORMEVAL_FORMAT";

const DEFAULT_WORKERS: usize = 4;

// Resolution order everywhere: CLI flag > env var > config file > default.

pub fn resolve_format(
    flag: Option<&str>,
    env: Option<String>,
    file: &ConfigFile,
) -> anyhow::Result<ExportFormat> {
    let (raw, origin) = match (flag, env.as_deref(), file.format()) {
        (Some(f), _, _) => (f, "--format"),
        (None, Some(e), _) => (e, FORMAT_ENV),
        (None, None, Some(c)) => (c, "config file"),
        (None, None, None) => return Ok(ExportFormat::default()),
    };
    raw.parse::<ExportFormat>()
        .with_context(|| format!("invalid format from {origin}"))
}

pub fn resolve_workers(
    flag: Option<usize>,
    env: Option<String>,
    file: &ConfigFile,
) -> anyhow::Result<usize> {
    let workers = match (flag, env) {
        (Some(n), _) => n,
        (None, Some(e)) => e
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{WORKERS_ENV} must be a positive integer, got '{e}'"))?,
        (None, None) => file.num_workers().unwrap_or(DEFAULT_WORKERS),
    };
    if workers == 0 {
        anyhow::bail!("worker count must be at least 1");
    }
    Ok(workers)
}

/// Batch output directory: flag, then config file, then the input directory.
pub fn resolve_out_dir(flag: Option<PathBuf>, file: &ConfigFile, input_dir: &Path) -> PathBuf {
    flag.or_else(|| file.directory().map(PathBuf::from))
        .unwrap_or_else(|| input_dir.to_path_buf())
}

pub fn resolve_color(no_color: bool, file: &ConfigFile) -> bool {
    !no_color && file.color().unwrap_or(true)
}

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable that overrides the configured log filter
pub const LOG_ENV: &str = "DIVULGA_LOG";

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("divulga.log")
}

/// Send tracing output to a log file in the data dir. The terminal belongs
/// to the TUI, so if the file cannot be opened logging stays off.
pub fn init(data_dir: Option<&Path>, default_level: &str) -> Option<PathBuf> {
    let dir = data_dir?;
    std::fs::create_dir_all(dir).ok()?;
    let path = log_path(dir);
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("divulga={},warn", default_level)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .ok()?;

    tracing::info!(path = ?path, "logging initialized");
    Some(path)
}

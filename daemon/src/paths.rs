/// Canonical file paths for the notifier's own data files.
///
/// All files live under `<data dir>/post-startup-notifier/`:
///   - config.toml   Optional daemon configuration.
///   - seen.json     Seen flags for one-time notices.
///   - output.log    Diagnostic output channel.
use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "post-startup-notifier";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SEEN_FLAGS_FILE_NAME: &str = "seen.json";
pub const OUTPUT_LOG_FILE_NAME: &str = "output.log";

/// Returns the application data directory, e.g. `~/.local/share/post-startup-notifier/`.
pub fn app_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("User data directory not found")?;
    Ok(base.join(APP_DIR_NAME))
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(CONFIG_FILE_NAME))
}

pub fn seen_flags_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(SEEN_FLAGS_FILE_NAME))
}

pub fn output_log_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(OUTPUT_LOG_FILE_NAME))
}

//! Platform-specific default locations
//!
//! - Config: `<config dir>/tuberename/config.json`
//! - Audit log: `<data dir>/tuberename/renamed_files.log`

use std::path::PathBuf;

const APP_DIR: &str = "tuberename";

/// Returns the application data directory
/// - macOS: ~/Library/Application Support/tuberename
/// - Windows: %APPDATA%\tuberename
/// - Linux: ~/.local/share/tuberename
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the configuration directory
/// - macOS: ~/Library/Application Support/tuberename
/// - Windows: %APPDATA%\tuberename
/// - Linux: ~/.config/tuberename
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn default_log_path() -> PathBuf {
    app_data_dir().join("renamed_files.log")
}

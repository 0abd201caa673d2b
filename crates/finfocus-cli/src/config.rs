use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

#[cfg(windows)]
pub fn config_dir() -> PathBuf {
    std::env::var("APPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("finfocus")
}

#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("finfocus")
}

/// The on-disk config file (§6 "Precedence across configuration sources"):
/// the lowest-precedence source, overridden by an environment variable,
/// itself overridden by an explicit CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub plugins_dir: Option<PathBuf>,
    pub specs_dir: Option<PathBuf>,
    pub compat: Option<String>,
}

pub fn load_config(path: &std::path::Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config file {}", path.display()))
}

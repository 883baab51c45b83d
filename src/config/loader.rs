//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::LoggerOptions;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse logger options from TOML text.
pub fn parse_options(content: &str) -> Result<LoggerOptions, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load logger options from a TOML file.
///
/// Only syntax is checked; values are taken as-is and resolved later.
pub fn load_options(path: &Path) -> Result<LoggerOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_options(&content)
}

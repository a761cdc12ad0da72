//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found")]
    NotFound,

    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("invalid version '{0}': expected dot-separated integers")]
    InvalidVersion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

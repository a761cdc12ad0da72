//! Error handling for the depscan CLI.
//!
//! [`CliError`] wraps the library errors and adds the failures only the CLI
//! can have (bad arguments, missing files, failed batch entries).
//! [`cli_error_to_miette`] renders it for the terminal.

mod report;

use std::path::PathBuf;

use depscan::ScanError;
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] depscan_config::ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Loading or saving the scanning cache failed.
    #[error("Scanning cache error: {0}")]
    Cache(#[from] depscan_graph::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Some entries of a batch scan failed; the others were written.
    #[error("{failed} of {total} batch entries failed")]
    BatchFailed { failed: usize, total: usize },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Adds file context to I/O results.
pub trait ResultExt<T> {
    /// Turns a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CliError::FileNotFound(path.as_ref().to_path_buf()),
            _ => CliError::Io(err),
        })
    }
}

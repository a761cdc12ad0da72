//! Error types for scanning operations.

use depscan_graph::ModuleDependencyId;

/// Errors that abort a scan.
///
/// Most user-facing detail is reported through the
/// [`DiagnosticSink`](crate::DiagnosticSink) before one of these is returned;
/// the error itself only says which class of failure ended the scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A required import could not be resolved by any loader.
    #[error("unable to resolve module dependency: '{name}'")]
    ModuleNotFound {
        name: String,
        /// Module that carried the failing import.
        importer: ModuleDependencyId,
    },

    /// The resolved graph contains a cycle.
    #[error("module dependency cycle: '{chain}'")]
    CycleDetected { chain: String },

    /// A loader or the Clang scanning tool failed for a reason other than
    /// "not found".
    #[error("dependency scanning tool failed for '{module}': {message}")]
    Tooling { module: String, message: String },

    /// The content-addressed store rejected an operation.
    #[error("content store error: {0}")]
    Cas(String),

    /// A worker was requested while every worker was checked out.
    #[error("no scanning worker available; all {size} workers are checked out")]
    WorkerPoolExhausted { size: usize },

    #[error("invalid scan input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Graph(#[from] depscan_graph::Error),

    #[error(transparent)]
    Config(#[from] depscan_config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    pub fn tooling(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tooling {
            module: module.into(),
            message: message.into(),
        }
    }
}

/// Result type for scanning operations.
pub type Result<T> = std::result::Result<T, ScanError>;

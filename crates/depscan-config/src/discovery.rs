//! File-based config discovery.
//!
//! Finds `depscan.toml` in a directory or any of its ancestors.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "depscan.toml";

/// Searches for a configuration file starting at `root`.
///
/// # Example
///
/// ```no_run
/// use depscan_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// if let Some(path) = discovery.find() {
///     println!("using {}", path.display());
/// }
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Walk up from the root and return the first `depscan.toml` found.
    pub fn find(&self) -> Option<PathBuf> {
        self.root
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Like [`find`](Self::find), but a missing file is an error.
    pub fn require(&self) -> Result<PathBuf> {
        self.find().ok_or(ConfigError::NotFound)
    }
}

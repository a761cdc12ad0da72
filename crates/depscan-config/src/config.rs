//! Scan configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::version::Version;

/// Everything that shapes a dependency scan apart from the main module itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Fan out import lookups across a thread pool.
    pub parallel: bool,

    /// Worker count in parallel mode. Defaults to the number of CPUs.
    pub jobs: Option<usize>,

    pub log_level: Option<String>,

    /// Directory where explicit module builds place their outputs.
    pub module_output_path: String,

    /// Compile under a JIT; disables back-deployment libraries.
    pub use_jit: bool,

    pub cas: CasConfig,
    pub language: LanguageConfig,
    pub target: TargetConfig,
    pub search: SearchConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: None,
            log_level: None,
            module_output_path: "modules".to_string(),
            use_jit: false,
            cas: CasConfig::default(),
            language: LanguageConfig::default(),
            target: TargetConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Number of scanning workers to create.
    pub fn worker_count(&self) -> usize {
        if !self.parallel {
            return 1;
        }
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Checks values that deserialization alone cannot.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.language.apinotes_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "language.apinotes_version must not be empty".to_string(),
            ));
        }
        if self.target.triple.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "target.triple must not be empty".to_string(),
            ));
        }
        for mapping in &self.cas.prefix_map {
            if mapping.from.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "cas.prefix_map entry mapping to '{}' has an empty source prefix",
                    mapping.to
                )));
            }
        }
        Ok(())
    }
}

/// Content-addressed caching of build inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasConfig {
    pub enabled: bool,
    /// Path prefixes rewritten in emitted command lines.
    pub prefix_map: Vec<PrefixMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMapping {
    pub from: String,
    pub to: String,
}

impl CasConfig {
    /// Rewrite `path` with the first matching prefix mapping.
    pub fn remap_path(&self, path: &str) -> String {
        for mapping in &self.prefix_map {
            if let Some(rest) = path.strip_prefix(mapping.from.as_str()) {
                return format!("{}{}", mapping.to, rest);
            }
        }
        path.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub objc_interop: bool,
    pub cxx_interop: bool,
    pub cross_import_overlays: bool,
    /// Embedded runtime; disables back-deployment libraries.
    pub embedded: bool,
    pub apinotes_version: String,
    pub implicit_stdlib_import: bool,
    pub stdlib_name: String,
    pub additional_implicit_imports: Vec<String>,
    /// The main module imports the Clang module of the same name.
    pub import_underlying_module: bool,
    pub testable_imports: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            objc_interop: false,
            cxx_interop: false,
            cross_import_overlays: true,
            embedded: false,
            apinotes_version: "5".to_string(),
            implicit_stdlib_import: true,
            stdlib_name: "NeXTCode".to_string(),
            additional_implicit_imports: Vec::new(),
            import_underlying_module: false,
            testable_imports: Vec::new(),
        }
    }
}

/// Operating system family of a target triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    Darwin,
    Linux,
    Windows,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub triple: String,
    /// Explicit Clang target; when unset the NeXTCode triple is forwarded.
    pub clang_target: Option<String>,
    pub runtime_compatibility_version: Option<Version>,
    pub concurrency_compatibility_version: Option<Version>,
    pub dynamic_replacements_compatibility_version: Option<Version>,
    pub static_cxx_stdlib: bool,
    pub static_cxx_overlay: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            triple: "x86_64-unknown-linux-gnu".to_string(),
            clang_target: None,
            runtime_compatibility_version: None,
            concurrency_compatibility_version: None,
            dynamic_replacements_compatibility_version: None,
            static_cxx_stdlib: false,
            static_cxx_overlay: false,
        }
    }
}

impl TargetConfig {
    pub fn os(&self) -> TargetOs {
        let triple = self.triple.to_ascii_lowercase();
        let darwin = ["apple", "darwin", "macos", "ios", "tvos", "watchos", "xros"];
        if darwin.iter().any(|marker| triple.contains(marker)) {
            TargetOs::Darwin
        } else if triple.contains("linux") {
            TargetOs::Linux
        } else if triple.contains("windows") || triple.contains("win32") {
            TargetOs::Windows
        } else {
            TargetOs::Other
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub vfs_overlays: Vec<String>,
    /// Arguments forwarded to every Clang module build.
    pub clang_args: Vec<String>,
    pub working_directory: Option<String>,
    /// Files that influence module search, tracked for every textual module
    /// when CAS is enabled (SDK settings, module maps of search paths).
    pub search_path_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_mode_uses_one_worker() {
        let config = ScanConfig {
            parallel: false,
            jobs: Some(8),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn explicit_jobs_win_in_parallel_mode() {
        let config = ScanConfig {
            jobs: Some(4),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 4);
    }

    #[test]
    fn zero_jobs_is_invalid() {
        let config = ScanConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn target_os_detection() {
        let os = |triple: &str| {
            TargetConfig {
                triple: triple.into(),
                ..Default::default()
            }
            .os()
        };
        assert_eq!(os("arm64-apple-macosx14.0"), TargetOs::Darwin);
        assert_eq!(os("x86_64-unknown-linux-gnu"), TargetOs::Linux);
        assert_eq!(os("x86_64-unknown-windows-msvc"), TargetOs::Windows);
        assert_eq!(os("wasm32-unknown-wasi"), TargetOs::Other);
    }

    #[test]
    fn prefix_map_rewrites_first_match() {
        let cas = CasConfig {
            enabled: true,
            prefix_map: vec![
                PrefixMapping {
                    from: "/Users/dev/project".into(),
                    to: "/^src".into(),
                },
                PrefixMapping {
                    from: "/Users/dev".into(),
                    to: "/^home".into(),
                },
            ],
        };
        assert_eq!(cas.remap_path("/Users/dev/project/a.h"), "/^src/a.h");
        assert_eq!(cas.remap_path("/Users/dev/b.h"), "/^home/b.h");
        assert_eq!(cas.remap_path("/opt/c.h"), "/opt/c.h");
    }
}

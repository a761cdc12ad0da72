//! # depscan-config
//!
//! Configuration for dependency scans: worker counts, language interop
//! switches, target description, search settings and CAS options, loaded
//! from defaults, `depscan.toml`, `DEPSCAN_*` environment variables and
//! caller overrides.
//!
//! ```no_run
//! use depscan_config::ScanConfig;
//! use figment::providers::Serialized;
//!
//! let config = ScanConfig::load(
//!     std::path::Path::new("."),
//!     None,
//!     Serialized::defaults(serde_json::json!({ "parallel": false })),
//! )
//! .unwrap();
//! println!("context {}", config.context_hash());
//! ```

pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod version;

pub use config::{
    CasConfig, LanguageConfig, PrefixMapping, ScanConfig, SearchConfig, TargetConfig, TargetOs,
};
pub use context::hash_inputs;
pub use discovery::{CONFIG_FILE_NAME, ConfigDiscovery};
pub use error::{ConfigError, Result};
pub use loading::ENV_PREFIX;
pub use version::Version;

// Re-exported so callers can build override providers without a direct
// figment dependency.
pub use figment;

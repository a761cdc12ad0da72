//! Layered configuration loading.
//!
//! Priority, lowest to highest: defaults, `depscan.toml`, `DEPSCAN_*`
//! environment variables, caller overrides (usually CLI flags).

use std::path::Path;

use figment::{
    Figment, Provider,
    providers::{Env, Format as _, Serialized, Toml},
};

use crate::config::ScanConfig;
use crate::discovery::ConfigDiscovery;
use crate::error::{ConfigError, Result};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "DEPSCAN_";

impl ScanConfig {
    /// Load configuration.
    ///
    /// An explicit `config_path` must exist. Otherwise `depscan.toml` is
    /// discovered from `root` upwards and used when present. Nested keys in
    /// the environment use a double underscore:
    /// `DEPSCAN_LANGUAGE__CXX_INTEROP=true`.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        overrides: impl Provider,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => ConfigDiscovery::new(root).find(),
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading scan configuration");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(overrides);

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text, on top of the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(text))
            .extract()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

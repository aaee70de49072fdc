//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. built-in defaults
//! 2. the platform config file (`config.toml` under the project config dir)
//! 3. a file passed with `--config`
//! 4. `INVENTORY_*` environment variables (e.g. `INVENTORY_PREFETCH_DEPTH=16`)

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compare::DEFAULT_EXAMPLE_LIMIT;
use crate::duplicates::DEFAULT_DUPLICATE_PAGE_SIZE;
use crate::pipeline::{DEFAULT_HASH_BATCH_SIZE, DEFAULT_PREFETCH_DEPTH};
use crate::scanner::PathStyle;
use crate::store::DEFAULT_MAX_INSERT_BATCH;

/// Prefix of the environment variables read into the configuration.
pub const ENV_PREFIX: &str = "INVENTORY_";

/// Errors while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file given with `--config` does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] figment::Error),

    /// A size setting is zero.
    #[error("Invalid configuration: {0} must be greater than zero")]
    Zero(&'static str),
}

/// Whether stored paths get the Windows long-path prefix when re-opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LongPathMode {
    /// Prefix on Windows only.
    #[default]
    Auto,
    /// Always prefix absolute Windows-style paths.
    Always,
    /// Never prefix.
    Never,
}

impl LongPathMode {
    /// Path style for this mode on the current platform.
    #[must_use]
    pub fn path_style(self) -> PathStyle {
        match self {
            Self::Auto => PathStyle::for_platform(),
            Self::Always => PathStyle::LongPathPrefixed,
            Self::Never => PathStyle::Native,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Records per insert transaction during ingestion.
    pub insert_batch_size: usize,
    /// Records drawn per hash pipeline page.
    pub hash_batch_size: usize,
    /// Hash results the producer may run ahead of the consumer.
    pub prefetch_depth: usize,
    /// Example paths per side in comparisons.
    pub example_limit: usize,
    /// Duplicate groups fetched per page.
    pub duplicate_page_size: usize,
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
    /// Long-path prefixing of stored paths.
    pub long_paths: LongPathMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            insert_batch_size: DEFAULT_MAX_INSERT_BATCH,
            hash_batch_size: DEFAULT_HASH_BATCH_SIZE,
            prefetch_depth: DEFAULT_PREFETCH_DEPTH,
            example_limit: DEFAULT_EXAMPLE_LIMIT,
            duplicate_page_size: DEFAULT_DUPLICATE_PAGE_SIZE,
            follow_symlinks: false,
            long_paths: LongPathMode::Auto,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `explicit` is missing, a layer is malformed,
    /// or a size setting is zero. A missing platform config file is fine.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::default_path() {
            log::trace!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration from any figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first zero size setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("insert_batch_size", self.insert_batch_size),
            ("hash_batch_size", self.hash_batch_size),
            ("prefetch_depth", self.prefetch_depth),
            ("duplicate_page_size", self.duplicate_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        Ok(())
    }

    /// Path style used by the hash pipeline.
    #[must_use]
    pub fn path_style(&self) -> PathStyle {
        self.long_paths.path_style()
    }

    /// The platform-specific config file, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "threaded-inventory", "inventory")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

//! Layered configuration.
//!
//! Values are merged, lowest priority first, from built-in defaults, a TOML
//! file, `DUPDIFF_*` environment variables and finally the command line
//! (applied by the caller on top of the extracted [`Config`]).
//!
//! The TOML file is the one given with `--config`, or `config.toml` in the
//! platform configuration directory when it exists:
//!
//! ```toml
//! algorithm = "sha256"
//! block_size = 65536
//! prefix_len = 4096
//! io_threads = 2
//! ignore_patterns = ["*.tmp", "node_modules"]
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::{HashAlgorithm, DEFAULT_BLOCK_SIZE};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPDIFF_";

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// An explicit config file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A value is out of range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Read block size in bytes
    pub block_size: usize,
    /// Prefix pass length in bytes; `None` skips the pass
    pub prefix_len: Option<usize>,
    /// Hashing threads
    pub io_threads: usize,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories
    pub skip_hidden: bool,
    /// Gitignore-style patterns to exclude
    pub ignore_patterns: Vec<String>,
    /// Smallest file size considered
    pub min_size: Option<u64>,
    /// Largest file size considered
    pub max_size: Option<u64>,
    /// Delete permanently instead of using the trash
    pub permanent: bool,
    /// Abort on the first unreadable file
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            prefix_len: None,
            io_threads: 4,
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            min_size: None,
            max_size: None,
            permanent: false,
            strict: false,
        }
    }
}

impl Config {
    /// Load from the default config file (if any) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider fails or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path().filter(|p| p.is_file()) {
            Some(path) => Self::extract(Self::figment().merge(Toml::file(path))),
            None => Self::extract(Self::figment()),
        }
    }

    /// Load from an explicit TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file does not exist, otherwise as [`load`](Self::load).
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::extract(Self::figment().merge(Toml::file(path)))
    }

    /// Resolve `--config` if given, otherwise the default locations.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load) and [`load_from_path`](Self::load_from_path).
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Platform location of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupdiff").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// Environment is merged last so it overrides the file.
    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        log::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a zero block size, zero threads, a zero
    /// prefix length or an inverted size range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "block_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "io_threads",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.prefix_len == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "prefix_len",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(ConfigError::InvalidValue {
                    key: "min_size",
                    reason: format!("{} is larger than max_size {}", min, max),
                });
            }
        }
        Ok(())
    }
}

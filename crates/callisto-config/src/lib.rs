//! Callisto Configuration System
//!
//! Provides runtime configuration for embedded Callisto contexts:
//! - Call stack limits
//! - Stack trace rendering limits
//! - Receiver policy for `null` / `undefined` receivers
//!
//! # Configuration Hierarchy
//!
//! Layers are applied in order, each overriding the ones before it:
//! 1. Built-in defaults
//! 2. Global config (~/.callisto/config.toml)
//! 3. Project config (./callisto.toml, searched upwards)
//! 4. Environment variables (CALLISTO_*)
//!
//! # Example
//!
//! ```no_run
//! use callisto_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("max call depth: {}", config.max_call_depth());
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or validating runtime settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No settings file at {0}")]
    NotFound(PathBuf),

    #[error("Cannot read settings file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed settings in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Setting '{field}' rejected: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cannot locate the home directory for ~/.callisto")]
    HomeNotFound,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{Config, ConfigLoader, PROJECT_CONFIG_FILE};
pub use settings::{
    NullReceiver, ReceiverSettings, Settings, StackSettings, TraceSettings,
    DEFAULT_MAX_CALL_DEPTH, DEFAULT_TRACE_LIMIT, MAX_CALL_DEPTH_CEILING,
};

//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::settings::{validate_call_depth, NullReceiver, Settings};
use crate::settings::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_TRACE_LIMIT};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the project-level configuration
pub const PROJECT_CONFIG_FILE: &str = "callisto.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.callisto/config.toml) - lowest priority
/// 2. Project config (./callisto.toml) - overrides global
/// 3. Environment variables (CALLISTO_*) - overrides project
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Merged settings (global, then project, then environment)
    pub settings: Settings,

    /// Project root directory (where callisto.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads global settings from `path` instead of the home directory
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find callisto.toml, then layers it over
    /// the global config if one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_settings) = self.find_project_settings(start_dir)?;
        self.assemble(project_root, project_settings)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_settings = Settings::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.assemble(project_root, project_settings)
    }

    fn assemble(
        &mut self,
        project_root: Option<PathBuf>,
        project_settings: Settings,
    ) -> ConfigResult<Config> {
        let mut settings = self.load_global_settings()?;
        settings.merge(&project_settings);
        let settings = apply_env_overrides(settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_root,
        })
    }

    /// Find project settings by walking up the directory tree
    fn find_project_settings(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, Settings)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                debug!(path = %config_path.display(), "found project configuration");
                let settings = Settings::load_from_file(&config_path)?;
                return Ok((Some(current), settings));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, Settings::default())),
            }
        }
    }

    /// Load global settings; a missing file yields defaults
    fn load_global_settings(&mut self) -> ConfigResult<Settings> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match Self::global_config_dir() {
                Ok(dir) => {
                    let path = dir.join("config.toml");
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(Settings::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(Settings::default());
        }

        debug!(path = %path.display(), "loading global configuration");
        Settings::load_from_file(&path)
    }

    /// Get the global configuration directory (~/.callisto)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".callisto"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `CALLISTO_*` environment variable overrides
fn apply_env_overrides(mut settings: Settings) -> ConfigResult<Settings> {
    if let Ok(raw) = env::var("CALLISTO_MAX_CALL_DEPTH") {
        let depth = parse_usize("CALLISTO_MAX_CALL_DEPTH", &raw)?;
        validate_call_depth(depth)?;
        settings
            .stack
            .get_or_insert_with(Default::default)
            .max_call_depth = Some(depth);
    }

    if let Ok(raw) = env::var("CALLISTO_TRACE_LIMIT") {
        let limit = parse_usize("CALLISTO_TRACE_LIMIT", &raw)?;
        settings.trace.get_or_insert_with(Default::default).limit = Some(limit);
    }

    if let Ok(raw) = env::var("CALLISTO_NULL_RECEIVER") {
        let policy: NullReceiver = raw.parse()?;
        settings
            .receiver
            .get_or_insert_with(Default::default)
            .null_receiver = Some(policy);
    }

    Ok(settings)
}

fn parse_usize(field: &str, raw: &str) -> ConfigResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a non-negative integer, got '{}' ({})", raw, e),
        })
}

impl Config {
    /// Effective maximum call depth (settings > default)
    pub fn max_call_depth(&self) -> usize {
        self.settings
            .max_call_depth()
            .unwrap_or(DEFAULT_MAX_CALL_DEPTH)
    }

    /// Effective trace limit (settings > default)
    pub fn trace_limit(&self) -> usize {
        self.settings.trace_limit().unwrap_or(DEFAULT_TRACE_LIMIT)
    }

    /// Effective null receiver policy (settings > default)
    pub fn null_receiver(&self) -> NullReceiver {
        self.settings.null_receiver().unwrap_or_default()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a project callisto.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

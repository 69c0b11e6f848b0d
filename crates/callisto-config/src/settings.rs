//! Settings schema shared by `~/.callisto/config.toml` and `callisto.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default maximum number of frames on a context's call stack
pub const DEFAULT_MAX_CALL_DEPTH: usize = 500;

/// Default number of frames kept in a captured stack trace
pub const DEFAULT_TRACE_LIMIT: usize = 10;

/// Largest accepted `stack.max_call_depth`.
///
/// Each hosted frame costs a few KiB of native stack (more in debug builds), grown on
/// demand by the runtime, so the ceiling bounds that memory to tens of MiB.
pub const MAX_CALL_DEPTH_CEILING: usize = 10_000;

/// Runtime settings as written in a configuration file.
///
/// Every field is optional so that files can be layered with [`Settings::merge`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Call stack settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackSettings>,

    /// Stack trace settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceSettings>,

    /// Receiver policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ReceiverSettings>,
}

/// `[stack]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StackSettings {
    /// Maximum call depth before `StackOverflow` (default: 500)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,
}

/// `[trace]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TraceSettings {
    /// Frames kept in a captured trace, counted after hidden frames are removed (default: 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `[receiver]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ReceiverSettings {
    /// What a closure sees as its receiver when called with `null` / `undefined`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_receiver: Option<NullReceiver>,
}

/// Receiver policy for closures called with a `null` or `undefined` receiver.
///
/// Native functions always observe the receiver they were given.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NullReceiver {
    /// Substitute the context's global object
    #[default]
    Global,
    /// Pass `null` / `undefined` through untouched
    Preserve,
}

impl FromStr for NullReceiver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(NullReceiver::Global),
            "preserve" => Ok(NullReceiver::Preserve),
            other => Err(ConfigError::InvalidValue {
                field: "receiver.null_receiver".to_string(),
                reason: format!("must be 'global' or 'preserve', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for NullReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullReceiver::Global => write!(f, "global"),
            NullReceiver::Preserve => write!(f, "preserve"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let settings: Self =
            toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error: e,
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(depth) = self.stack.as_ref().and_then(|s| s.max_call_depth) {
            validate_call_depth(depth)?;
        }
        Ok(())
    }

    /// Merge another settings layer into this one.
    /// Fields set in `other` take precedence.
    pub fn merge(&mut self, other: &Settings) {
        if let Some(stack) = &other.stack {
            let target = self.stack.get_or_insert_with(Default::default);
            if stack.max_call_depth.is_some() {
                target.max_call_depth = stack.max_call_depth;
            }
        }
        if let Some(trace) = &other.trace {
            let target = self.trace.get_or_insert_with(Default::default);
            if trace.limit.is_some() {
                target.limit = trace.limit;
            }
        }
        if let Some(receiver) = &other.receiver {
            let target = self.receiver.get_or_insert_with(Default::default);
            if receiver.null_receiver.is_some() {
                target.null_receiver = receiver.null_receiver;
            }
        }
    }

    pub fn max_call_depth(&self) -> Option<usize> {
        self.stack.as_ref().and_then(|s| s.max_call_depth)
    }

    pub fn trace_limit(&self) -> Option<usize> {
        self.trace.as_ref().and_then(|t| t.limit)
    }

    pub fn null_receiver(&self) -> Option<NullReceiver> {
        self.receiver.as_ref().and_then(|r| r.null_receiver)
    }
}

pub(crate) fn validate_call_depth(depth: usize) -> ConfigResult<()> {
    if depth == 0 || depth > MAX_CALL_DEPTH_CEILING {
        return Err(ConfigError::InvalidValue {
            field: "stack.max_call_depth".to_string(),
            reason: format!(
                "must be between 1 and {}, got {}",
                MAX_CALL_DEPTH_CEILING, depth
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let toml = r#"
[stack]
max_call_depth = 64

[trace]
limit = 3

[receiver]
null_receiver = "preserve"
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.max_call_depth(), Some(64));
        assert_eq!(settings.trace_limit(), Some(3));
        assert_eq!(settings.null_receiver(), Some(NullReceiver::Preserve));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_settings_are_valid() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[trace]
limit = 3
colour = true
"#;
        assert!(toml::from_str::<Settings>(toml).is_err());
    }

    #[test]
    fn test_zero_call_depth_rejected() {
        let toml = r#"
[stack]
max_call_depth = 0
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base: Settings = toml::from_str(
            r#"
[stack]
max_call_depth = 100

[trace]
limit = 5
"#,
        )
        .unwrap();
        let over: Settings = toml::from_str(
            r#"
[trace]
limit = 20
"#,
        )
        .unwrap();

        base.merge(&over);

        assert_eq!(base.max_call_depth(), Some(100));
        assert_eq!(base.trace_limit(), Some(20));
        assert_eq!(base.null_receiver(), None);
    }

    #[test]
    fn test_null_receiver_from_str() {
        assert_eq!("GLOBAL".parse::<NullReceiver>().unwrap(), NullReceiver::Global);
        assert_eq!(
            " preserve ".parse::<NullReceiver>().unwrap(),
            NullReceiver::Preserve
        );
        assert!("strict".parse::<NullReceiver>().is_err());
    }
}

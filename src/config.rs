//! Gate configuration.
//!
//! ## Environment
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LEVEL_GATE_CALL_SITE_BINDINGS` | `call_site_bindings` | `true` |
//! | `LEVEL_GATE_CUSTOM_LEVEL_CAPACITY` | `custom_level_capacity` | `64` |
//! | `LEVEL_GATE_ROOT_LEVEL` | `root_level` | `INFO` |

use serde::{Deserialize, Serialize};

use crate::types::{LevelParseError, SeverityLevel};

/// Environment variable toggling call-site bindings.
pub const ENV_CALL_SITE_BINDINGS: &str = "LEVEL_GATE_CALL_SITE_BINDINGS";
/// Environment variable for the custom-rank cache capacity.
pub const ENV_CUSTOM_LEVEL_CAPACITY: &str = "LEVEL_GATE_CUSTOM_LEVEL_CAPACITY";
/// Environment variable for the root threshold.
pub const ENV_ROOT_LEVEL: &str = "LEVEL_GATE_ROOT_LEVEL";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// A level name did not parse.
    #[error("invalid level in {field}: {source}")]
    Level {
        /// Field name.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: LevelParseError,
    },
    /// JSON input did not deserialize.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime configuration for a gate registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Whether bindings keep their own decision slot.
    pub call_site_bindings: bool,
    /// Maximum number of non-named severity ranks cached per category.
    pub custom_level_capacity: usize,
    /// Root threshold used by [`crate::LogContext`].
    pub root_level: SeverityLevel,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            call_site_bindings: true,
            custom_level_capacity: 64,
            root_level: SeverityLevel::INFO,
        }
    }
}

impl GateConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.custom_level_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "custom_level_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CALL_SITE_BINDINGS) {
            config.call_site_bindings = parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                field: "call_site_bindings",
                reason: format!("expected a boolean, got {raw:?}"),
            })?;
        }
        if let Some(raw) = lookup(ENV_CUSTOM_LEVEL_CAPACITY) {
            config.custom_level_capacity =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: "custom_level_capacity",
                    reason: format!("expected an integer, got {raw:?}"),
                })?;
        }
        if let Some(raw) = lookup(ENV_ROOT_LEVEL) {
            config.root_level = raw.parse().map_err(|source| ConfigError::Level {
                field: "root_level",
                source,
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GateConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.call_site_bindings);
        assert_eq!(config.root_level, SeverityLevel::INFO);
    }

    #[test]
    fn test_from_lookup() {
        let config = GateConfig::from_lookup(lookup(&[
            (ENV_CALL_SITE_BINDINGS, "off"),
            (ENV_CUSTOM_LEVEL_CAPACITY, " 8 "),
            (ENV_ROOT_LEVEL, "fine"),
        ]))
        .unwrap();

        assert!(!config.call_site_bindings);
        assert_eq!(config.custom_level_capacity, 8);
        assert_eq!(config.root_level, SeverityLevel::DEBUG);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(matches!(
            GateConfig::from_lookup(lookup(&[(ENV_CALL_SITE_BINDINGS, "maybe")])),
            Err(ConfigError::Invalid { field: "call_site_bindings", .. })
        ));
        assert!(matches!(
            GateConfig::from_lookup(lookup(&[(ENV_CUSTOM_LEVEL_CAPACITY, "0")])),
            Err(ConfigError::Invalid { field: "custom_level_capacity", .. })
        ));
        assert!(matches!(
            GateConfig::from_lookup(lookup(&[(ENV_ROOT_LEVEL, "chatty")])),
            Err(ConfigError::Level { field: "root_level", .. })
        ));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = GateConfig::from_json(r#"{"root_level": "WARNING"}"#).unwrap();
        assert_eq!(config.root_level, SeverityLevel::WARN);
        assert_eq!(config.custom_level_capacity, 64);

        assert!(matches!(
            GateConfig::from_json(r#"{"custom_level_capacity": 0}"#),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            GateConfig::from_json(r#"{"root_level": "nope"}"#),
            Err(ConfigError::Json(_))
        ));
    }
}

//! Engine configuration.
//!
//! Precedence, lowest first: built-in defaults, environment variables
//! (a `.env` file is loaded by the binary at startup), CLI flags.
//!
//! | Variable               | Field          | Default |
//! |------------------------|----------------|---------|
//! | `NESTMAP_ENVELOPE_KEY` | `envelope_key` | `Quote` |
//! | `NESTMAP_PARALLEL`     | `parallel`     | `true`  |
//! | `NESTMAP_MAX_LIST_LEN` | `max_list_len` | `1000`  |
//! | `NESTMAP_STRICT_PATHS` | `strict_paths` | `false` |

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mapping::DEFAULT_MAX_LIST_LEN;

pub const ENV_ENVELOPE_KEY: &str = "NESTMAP_ENVELOPE_KEY";
pub const ENV_PARALLEL: &str = "NESTMAP_PARALLEL";
pub const ENV_MAX_LIST_LEN: &str = "NESTMAP_MAX_LIST_LEN";
pub const ENV_STRICT_PATHS: &str = "NESTMAP_STRICT_PATHS";

/// Settings shared by the CLI, the HTTP API and library callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Key of the top-level array in the output envelope.
    pub envelope_key: String,

    /// Transform records on the rayon thread pool.
    pub parallel: bool,

    /// Highest list position honored; larger column numbers are ignored.
    pub max_list_len: usize,

    /// Reject mappings with path conflicts instead of warning.
    pub strict_paths: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            envelope_key: "Quote".to_string(),
            parallel: true,
            max_list_len: DEFAULT_MAX_LIST_LEN,
            strict_paths: false,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `NESTMAP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(key) = lookup(ENV_ENVELOPE_KEY) {
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid(ENV_ENVELOPE_KEY, key, "must not be empty"));
            }
            config.envelope_key = key.to_string();
        }

        if let Some(raw) = lookup(ENV_PARALLEL) {
            config.parallel = parse_bool(ENV_PARALLEL, &raw)?;
        }

        if let Some(raw) = lookup(ENV_MAX_LIST_LEN) {
            config.max_list_len = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid(ENV_MAX_LIST_LEN, &raw, "expected a positive integer")),
            };
        }

        if let Some(raw) = lookup(ENV_STRICT_PATHS) {
            config.strict_paths = parse_bool(ENV_STRICT_PATHS, &raw)?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected a boolean")),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

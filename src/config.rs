//! Runtime configuration.
//!
//! [`TrackingConfig`] is usually loaded from a `pawtrack.toml` file:
//!
//! ```toml
//! [scheduler]
//! min_lead_ms = 1000
//! default_title = "Time to check on your pet"
//!
//! [cache]
//! enabled = true
//! namespace = "cache"
//!
//! [parsing]
//! unknown_values = "fallback"
//! ```
//!
//! Every section and field is optional. Environment variables prefixed with
//! `PAWTRACK_` override individual fields (see [`TrackingConfig::from_env`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_NAMESPACE, DEFAULT_NOTIFICATION_TITLE, ENV_PREFIX, RECORD_KEY_PREFIX,
    SEQUENCE_KEY_PREFIX,
};
use crate::domain::{ParseError, UnknownValuePolicy, WireEnum};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has wrongly typed fields.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },

    /// The cache namespace would overlap other storage keys.
    #[error("invalid cache namespace {namespace:?}: {reason}")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Reminder scheduling.
    pub scheduler: SchedulerConfig,
    /// Last-known-good cache.
    pub cache: CacheConfig,
    /// Handling of unrecognized enum values.
    pub parsing: ParsingConfig,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Triggers closer than this to "now" count as not in the future.
    pub min_lead_ms: u64,
    /// Notification title used when a reminder's title is blank.
    pub default_title: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_lead_ms: 0,
            default_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When `false` the cache stores nothing and every fallback misses.
    pub enabled: bool,
    /// Storage key namespace for cache entries.
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Checks that the namespace cannot collide with record or sequence keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_namespace(&self.namespace).map_err(|reason| ConfigError::InvalidNamespace {
            namespace: self.namespace.clone(),
            reason,
        })
    }
}

/// Returns why `namespace` is unusable as a cache key prefix, if it is.
pub(crate) fn check_namespace(namespace: &str) -> Result<(), &'static str> {
    if namespace.trim().is_empty() {
        Err("must not be empty")
    } else if namespace.contains(':') {
        Err("must not contain ':'")
    } else if namespace == RECORD_KEY_PREFIX || namespace == SEQUENCE_KEY_PREFIX {
        Err("reserved for persisted records")
    } else {
        Ok(())
    }
}

/// `[parsing]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// What to do with placeholder or unknown enum values.
    pub unknown_values: UnknownValuePolicy,
}

impl ParsingConfig {
    /// Parses an externally supplied enum value under the configured policy.
    pub fn parse<T: WireEnum>(&self, raw: &str) -> Result<T, ParseError> {
        T::parse_with(raw, self.unknown_values)
    }
}

impl TrackingConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.cache.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(Into::into)
    }

    /// Defaults overridden by `PAWTRACK_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `PAWTRACK_MIN_LEAD_MS` | `scheduler.min_lead_ms` |
    /// | `PAWTRACK_DEFAULT_TITLE` | `scheduler.default_title` |
    /// | `PAWTRACK_CACHE_ENABLED` | `cache.enabled` |
    /// | `PAWTRACK_CACHE_NAMESPACE` | `cache.namespace` |
    /// | `PAWTRACK_UNKNOWN_VALUES` | `parsing.unknown_values` (`reject` or `fallback`) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(std::env::vars())
    }

    /// Applies `PAWTRACK_*` overrides from `vars`. Other names are ignored.
    pub fn with_overrides<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(field) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field {
                "MIN_LEAD_MS" => {
                    self.scheduler.min_lead_ms =
                        value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                            name: name.clone(),
                            value: value.clone(),
                            reason: "expected a non-negative integer",
                        })?;
                },
                "DEFAULT_TITLE" => self.scheduler.default_title = value,
                "CACHE_ENABLED" => {
                    self.cache.enabled = parse_flag(&value).ok_or_else(|| ConfigError::InvalidEnv {
                        name: name.clone(),
                        value: value.clone(),
                        reason: "expected true/false",
                    })?;
                },
                "CACHE_NAMESPACE" => self.cache.namespace = value,
                "UNKNOWN_VALUES" => {
                    self.parsing.unknown_values = match value.trim().to_ascii_lowercase().as_str() {
                        "reject" => UnknownValuePolicy::Reject,
                        "fallback" => UnknownValuePolicy::Fallback,
                        _ => {
                            return Err(ConfigError::InvalidEnv {
                                name: name.clone(),
                                value,
                                reason: "expected reject or fallback",
                            })
                        },
                    };
                },
                _ => {},
            }
        }
        self.cache.validate()?;
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

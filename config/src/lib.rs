//! Configuration loading for Quill.
//!
//! ```toml
//! [dispatch]
//! workers = 4
//! drain_poll_interval_ms = 1
//! drain_max_interval_ms = 50
//!
//! [tags]
//! indicator = "#"
//! openers = ["for", "if"]
//! closers = ["endfor", "endif"]
//! ```
//!
//! Every key is optional. Unknown keys are rejected so typos surface at load
//! time instead of silently falling back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quill_types::{DrainPolicy, DrainPolicyError, PoolSize, TagRegistry};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_DRAIN_POLL_MS: u64 = 1;
const DEFAULT_DRAIN_MAX_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {source}")]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// File the error came from, when it came from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } => Some(path),
            Self::Parse { path, .. } => path.as_deref(),
            Self::Invalid { .. } => None,
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    dispatch: RawDispatchConfig,
    #[serde(default)]
    tags: TagRegistry,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDispatchConfig {
    workers: Option<usize>,
    #[serde(default = "default_drain_poll_ms")]
    drain_poll_interval_ms: u64,
    #[serde(default = "default_drain_max_ms")]
    drain_max_interval_ms: u64,
}

impl Default for RawDispatchConfig {
    fn default() -> Self {
        Self {
            workers: None,
            drain_poll_interval_ms: DEFAULT_DRAIN_POLL_MS,
            drain_max_interval_ms: DEFAULT_DRAIN_MAX_MS,
        }
    }
}

const fn default_drain_poll_ms() -> u64 {
    DEFAULT_DRAIN_POLL_MS
}

const fn default_drain_max_ms() -> u64 {
    DEFAULT_DRAIN_MAX_MS
}

/// Validated configuration. Holding one proves every value passed the checks
/// in [`QuillConfig::from_toml_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuillConfig {
    pool_size: PoolSize,
    drain: DrainPolicy,
    tags: TagRegistry,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            pool_size: PoolSize::default(),
            drain: DrainPolicy::default(),
            tags: TagRegistry::default(),
        }
    }
}

impl QuillConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })?;
        Self::validate(raw)
    }

    /// Read, parse and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| {
            warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let result = match Self::from_toml_str(&content) {
            Err(ConfigError::Parse { source, .. }) => Err(ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            }),
            other => other,
        };
        match &result {
            Ok(config) => debug!(
                path = %path.display(),
                workers = config.pool_size.get(),
                "Loaded config"
            ),
            Err(e) => warn!(path = %path.display(), "Rejected config: {e}"),
        }
        result
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let pool_size = match raw.dispatch.workers {
            Some(workers) => PoolSize::new(workers)
                .map_err(|e| ConfigError::invalid("dispatch.workers", e.to_string()))?,
            None => PoolSize::default(),
        };

        let poll_ms = raw.dispatch.drain_poll_interval_ms;
        let max_ms = raw.dispatch.drain_max_interval_ms;
        let drain = DrainPolicy::new(
            Duration::from_millis(poll_ms),
            Duration::from_millis(max_ms),
        )
        .map_err(|e| match e {
            DrainPolicyError::ZeroPollInterval => {
                ConfigError::invalid("dispatch.drain_poll_interval_ms", "must be at least 1")
            }
            DrainPolicyError::CapBelowInterval { .. } => ConfigError::invalid(
                "dispatch.drain_max_interval_ms",
                format!("must be at least drain_poll_interval_ms ({poll_ms})"),
            ),
        })?;

        let indicator = raw.tags.indicator();
        if indicator.is_alphanumeric()
            || indicator.is_whitespace()
            || matches!(indicator, '_' | '(' | '\\')
        {
            return Err(ConfigError::invalid(
                "tags.indicator",
                format!("{indicator:?} cannot introduce a tag"),
            ));
        }

        Ok(Self {
            pool_size,
            drain,
            tags: raw.tags,
        })
    }

    #[must_use]
    pub fn pool_size(&self) -> PoolSize {
        self.pool_size
    }

    #[must_use]
    pub fn drain_policy(&self) -> DrainPolicy {
        self.drain
    }

    #[must_use]
    pub fn tag_registry(&self) -> &TagRegistry {
        &self.tags
    }
}

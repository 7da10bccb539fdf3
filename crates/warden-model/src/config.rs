#![forbid(unsafe_code)]

//! Configuration for a [`DomainModel`](crate::DomainModel).
//!
//! # Loading
//!
//! With the `model-config` feature, a [`ModelConfig`] can be read from TOML
//! or JSON. Missing keys fall back to their defaults.
//!
//! ```toml
//! # warden.toml
//! [history]
//! capacity = 25
//! ```
//!
//! ```rust,ignore
//! let config = ModelConfig::from_toml_file("warden.toml")?;
//! let model = DomainModel::with_config(config);
//! ```

#[cfg(feature = "model-config")]
use std::path::Path;

#[cfg(feature = "model-config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of snapshots retained by the history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Snapshot history limits.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "model-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "model-config", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept, current state included.
    /// Oldest snapshots are evicted when this limit is exceeded.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Never evict (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            capacity: usize::MAX,
        }
    }
}

/// Top-level configuration for a domain model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "model-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "model-config", serde(default))]
pub struct ModelConfig {
    pub history: HistoryConfig,
}

impl ModelConfig {
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "model-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "model-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "model-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "model-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems; empty means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history.capacity == 0 {
            errors.push("history.capacity must be > 0".into());
        }
        errors
    }

    #[cfg(feature = "model-config")]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading a [`ModelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "model-config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "model-config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

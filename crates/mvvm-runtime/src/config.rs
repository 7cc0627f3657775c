#![forbid(unsafe_code)]

//! Runtime configuration: directive prefix, interpolation delimiters, and the
//! event two-way bindings listen to.
//!
//! All fields have defaults, so a config file only needs the keys it changes:
//!
//! ```toml
//! directive_prefix = "x-"
//! input_event = "change"
//!
//! [delimiters]
//! open = "[["
//! close = "]]"
//! ```

#[cfg(feature = "config-file")]
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("directive prefix must not be empty")]
    EmptyPrefix,

    #[error("interpolation delimiters must not be empty")]
    EmptyDelimiter,

    #[error("input event name must not be empty")]
    EmptyInputEvent,

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "config-file")]
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config-file")]
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "config-file")]
    #[error("unsupported config format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Opening and closing interpolation markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{{".to_owned(),
            close: "}}".to_owned(),
        }
    }
}

/// Settings shared by the compiler and every directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Attribute prefix marking a directive.
    pub directive_prefix: String,
    pub delimiters: Delimiters,
    /// Event a `model` binding listens to for user input.
    pub input_event: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            directive_prefix: "v-".to_owned(),
            delimiters: Delimiters::default(),
            input_event: "input".to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns the first empty field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directive_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.delimiters.open.is_empty() || self.delimiters.close.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }
        if self.input_event.is_empty() {
            return Err(ConfigError::EmptyInputEvent);
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML config.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, picking the format from its extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns an I/O, format, parse, or validation error.
    #[cfg(feature = "config-file")]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

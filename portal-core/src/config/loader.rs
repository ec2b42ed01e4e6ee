//! Configuration loader supporting YAML, TOML and JSON.

use super::traits::{Configurable, Validatable};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Reads configuration and seed files.
///
/// [`load`](Self::load) is the full pipeline used at startup: parse, apply
/// environment overrides when a prefix is set, then validate. The lower-level
/// [`load_file`](Self::load_file) and [`load_str`](Self::load_str) only parse,
/// which is what seed data needs.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
    validate: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with validation enabled and no environment prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env_prefix: None,
            validate: true,
        }
    }

    /// Sets the environment variable prefix for overrides (e.g. `PORTAL`).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets whether [`load`](Self::load) validates. Default is `true`.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Returns the environment variable prefix, if set.
    #[must_use]
    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Parses `path`, applies environment overrides and validates.
    pub fn load<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
        P: AsRef<Path>,
    {
        let config = self.load_file(path)?;
        self.finish(config)
    }

    /// Like [`load`](Self::load) for configuration already held in memory.
    pub fn load_from_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Configurable + Validatable,
    {
        let config = self.load_str(content, format)?;
        self.finish(config)
    }

    /// Applies overrides and validation to an already-built configuration.
    pub fn finish<T>(&self, mut config: T) -> Result<T, ConfigError>
    where
        T: Configurable + Validatable,
    {
        if let Some(prefix) = &self.env_prefix {
            config.apply_env_overrides(prefix);
        }
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Parses a file without overrides or validation.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse(&content, format, &path.display().to_string())
    }

    /// Parses a string without overrides or validation.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        Self::parse(content, format, "<string>")
    }

    fn parse<T>(content: &str, format: ConfigFormat, origin: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let parsed = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|reason| ConfigError::InvalidFormat {
            path: origin.to_string(),
            reason: format!("{} parse error: {reason}", format.label()),
        })
    }
}

//! Shared configuration sections.
//!
//! Component crates own their own sections (tenancy, API); this module holds
//! the ones every binary needs: where tenant records come from and how logs
//! are written.

use super::traits::{Configurable, Validatable};
use super::validation::{EnvOverride, ValidationContext, Validator};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Base portal configuration.
///
/// # Example YAML
///
/// ```yaml
/// store:
///   backend: memory
///   seed_file: "config/tenants.yaml"
///
/// logging:
///   level: info
///   format: json
///   directory: "./logs"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Tenant store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PortalConfig {
    /// Records validation failures for every section into `ctx`.
    pub fn validate_with_context(&self, ctx: &mut ValidationContext) {
        ctx.enter("store");
        self.store.validate_with_context(ctx);
        ctx.exit();

        ctx.enter("logging");
        self.logging.validate_with_context(ctx);
        ctx.exit();
    }
}

impl Validatable for PortalConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        self.validate_with_context(&mut ctx);
        ctx.into_result()
    }
}

impl Configurable for PortalConfig {
    /// `PORTAL_STORE_SEED_FILE=...` overrides `store.seed_file`,
    /// `PORTAL_LOGGING_LEVEL=debug` overrides `logging.level`.
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.store.apply_env_overrides(&format!("{prefix}_STORE"));
        self.logging.apply_env_overrides(&format!("{prefix}_LOGGING"));
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        let mut names = StoreConfig::env_var_names(&format!("{prefix}_STORE"));
        names.extend(LoggingConfig::env_var_names(&format!("{prefix}_LOGGING")));
        names
    }
}

/// Tenant store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store, optionally seeded from a file.
    #[default]
    Memory,
}

/// Tenant store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend implementation.
    #[serde(default)]
    pub backend: StoreBackend,

    /// YAML/TOML/JSON file with a `tenants:` list loaded at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
}

impl StoreConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        if let Some(path) = &self.seed_file {
            Validator::new(ctx).custom(
                "seed_file",
                || path.extension().is_some(),
                "seed file needs a .yaml, .toml or .json extension",
            );
        }
    }
}

impl Configurable for StoreConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        if let Ok(path) = std::env::var(format!("{prefix}_SEED_FILE")) {
            self.seed_file = (!path.is_empty()).then(|| PathBuf::from(path));
        }
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        vec![format!("{prefix}_SEED_FILE")]
    }
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    /// Rotate every hour.
    Hourly,
    /// Rotate every day.
    #[default]
    Daily,
    /// Single file.
    Never,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (e.g. `info,portal_tenancy=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (`json` or `pretty`).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; no file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Rotation period for file output.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Whether to also log to stdout.
    #[serde(default = "default_stdout_enabled")]
    pub stdout_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_stdout_enabled() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
            rotation: LogRotation::default(),
            stdout_enabled: default_stdout_enabled(),
        }
    }
}

impl LoggingConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .require_non_empty("level", &self.level)
            .one_of("format", &self.format, &["json", "pretty"])
            .custom(
                "stdout_enabled",
                || self.stdout_enabled || self.directory.is_some(),
                "at least one of stdout or a log directory must be enabled",
            );
    }
}

impl Configurable for LoggingConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_LEVEL"), &mut self.level);
        EnvOverride::apply_string(&format!("{prefix}_FORMAT"), &mut self.format);
        EnvOverride::apply_optional_string(&format!("{prefix}_DIRECTORY"), &mut self.directory);
        EnvOverride::apply_bool(
            &format!("{prefix}_STDOUT_ENABLED"),
            &mut self.stdout_enabled,
        );
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        ["LEVEL", "FORMAT", "DIRECTORY", "STDOUT_ENABLED"]
            .iter()
            .map(|field| format!("{prefix}_{field}"))
            .collect()
    }
}

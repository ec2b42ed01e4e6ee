//! API configuration types.

use portal_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use portal_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Upper bound on tenant resolution for one request
    #[serde(default = "default_resolution_timeout_ms")]
    pub resolution_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
            resolution_timeout_ms: default_resolution_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Returns the server bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the per-request resolution budget.
    #[must_use]
    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution_timeout_ms)
    }

    /// Records validation failures into `ctx`.
    pub fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .require_non_empty("host", &self.host)
            .positive("port", &self.port)
            .positive("resolution_timeout_ms", &self.resolution_timeout_ms);
        ctx.enter("cors");
        Validator::new(ctx).positive("max_age_secs", &self.cors.max_age_secs);
        ctx.exit();
    }
}

impl Validatable for ApiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("api");
        self.validate_with_context(&mut ctx);
        ctx.exit();
        ctx.into_result()
    }
}

impl Configurable for ApiConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_HOST"), &mut self.host);
        EnvOverride::apply_number(&format!("{prefix}_PORT"), &mut self.port);
        EnvOverride::apply_number(
            &format!("{prefix}_RESOLUTION_TIMEOUT_MS"),
            &mut self.resolution_timeout_ms,
        );
        EnvOverride::apply_bool(&format!("{prefix}_CORS_ENABLED"), &mut self.cors.enabled);
        EnvOverride::apply_bool(
            &format!("{prefix}_CORS_ALLOW_CREDENTIALS"),
            &mut self.cors.allow_credentials,
        );
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "HOST",
            "PORT",
            "RESOLUTION_TIMEOUT_MS",
            "CORS_ENABLED",
            "CORS_ALLOW_CREDENTIALS",
        ]
        .iter()
        .map(|field| format!("{prefix}_{field}"))
        .collect()
    }
}

/// CORS configuration.
///
/// Allowed origins are not listed here; they come from the trusted-domain
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Enable CORS
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allowed methods
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,

    /// Allow credentials
    #[serde(default = "default_true")]
    pub allow_credentials: bool,

    /// Max age for preflight cache in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            allow_credentials: true,
            max_age_secs: default_max_age(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_resolution_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    ["Content-Type", "Authorization", "X-Request-Id"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_age() -> u64 {
    3600
}

//! Server configuration.
//!
//! One file carries every section; each component crate owns the type for
//! its own section and this module only aggregates them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use portal_api::ApiConfig;
use portal_core::config::{
    Configurable, EnvOverride, PortalConfig, Validatable, ValidationContext, Validator,
};
use portal_core::error::ConfigError;
use portal_tenancy::TenancyConfig;

/// Prefix for every environment override, e.g. `PORTAL_SERVER_PORT`.
pub const ENV_PREFIX: &str = "PORTAL";

/// Complete server configuration.
///
/// ```yaml
/// server:
///   name: portal
///   port: 8080
/// tenancy:
///   api_domain: api.ibuyscrap.ca
/// store:
///   seed_file: config/tenants.yaml
/// logging:
///   level: info
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// HTTP layer settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Tenant resolution settings.
    #[serde(default)]
    pub tenancy: TenancyConfig,

    /// Store and logging.
    #[serde(flatten)]
    pub portal: PortalConfig,

    /// Shutdown settings.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl ServerConfig {
    /// API configuration with the listener taken from the `server` section.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            ..self.api.clone()
        }
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();

        ctx.enter("server");
        self.server.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("api");
        self.api.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("tenancy");
        self.tenancy.validate_with_context(&mut ctx);
        ctx.exit();

        self.portal.validate_with_context(&mut ctx);

        ctx.enter("shutdown");
        Validator::new(&mut ctx).positive("timeout_secs", &self.shutdown.timeout_secs);
        ctx.exit();

        ctx.into_result()
    }
}

impl Configurable for ServerConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.server.apply_env_overrides(&format!("{prefix}_SERVER"));
        self.api.apply_env_overrides(&format!("{prefix}_API"));
        self.tenancy.apply_env_overrides(&format!("{prefix}_TENANCY"));
        self.portal.apply_env_overrides(prefix);
        self.shutdown.apply_env_overrides(&format!("{prefix}_SHUTDOWN"));
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        let mut names = ServerSection::env_var_names(&format!("{prefix}_SERVER"));
        names.extend(ApiConfig::env_var_names(&format!("{prefix}_API")));
        names.extend(TenancyConfig::env_var_names(&format!("{prefix}_TENANCY")));
        names.extend(PortalConfig::env_var_names(prefix));
        names.extend(ShutdownConfig::env_var_names(&format!("{prefix}_SHUTDOWN")));
        names
    }
}

/// Listener section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Instance name, used in logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_name() -> String {
    "portal".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSection {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .require_non_empty("name", &self.name)
            .require_non_empty("host", &self.host)
            .positive("port", &self.port);
    }
}

impl Configurable for ServerSection {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_NAME"), &mut self.name);
        EnvOverride::apply_string(&format!("{prefix}_HOST"), &mut self.host);
        EnvOverride::apply_number(&format!("{prefix}_PORT"), &mut self.port);
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        ["NAME", "HOST", "PORT"]
            .iter()
            .map(|field| format!("{prefix}_{field}"))
            .collect()
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Time allowed for in-flight requests to drain, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ShutdownConfig {
    /// Returns the drain timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Configurable for ShutdownConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(&format!("{prefix}_TIMEOUT_SECS"), &mut self.timeout_secs);
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        vec![format!("{prefix}_TIMEOUT_SECS")]
    }
}

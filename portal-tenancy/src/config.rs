//! Tenancy configuration section.

use portal_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use portal_core::error::ConfigError;
use portal_core::traits::NameMatch;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for tenant resolution.
///
/// # Example YAML
///
/// ```yaml
/// tenancy:
///   super_admin_domains: [ibuyscrap.ca, www.ibuyscrap.ca, localhost]
///   api_domain: api.ibuyscrap.ca
///   legacy_subdomain_prefix: immigration
///   apex_domain: ibuyscrap.ca
///   trusted_domains:
///     ttl_secs: 300
///     operator_origins: ["https://ibuyscrap.ca"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Operator hosts that bypass tenant scoping. `localhost` matches any port.
    #[serde(default = "default_super_admin_domains")]
    pub super_admin_domains: Vec<String>,

    /// Host serving the public API without a tenant.
    #[serde(default = "default_api_domain")]
    pub api_domain: String,

    /// First label of legacy `<prefix>.<name>.<apex>` hosts.
    #[serde(default = "default_legacy_subdomain_prefix")]
    pub legacy_subdomain_prefix: String,

    /// Apex domain of legacy hosts.
    #[serde(default = "default_apex_domain")]
    pub apex_domain: String,

    /// How the legacy fallback compares `<name>` with display names.
    #[serde(default)]
    pub legacy_name_match: NameMatch,

    /// Use `X-Forwarded-Host` instead of `Host`. Enable only behind a proxy
    /// that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_host: bool,

    /// Budget for each tenant store call.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    /// Resolutions slower than this are logged.
    #[serde(default = "default_slow_resolution_threshold_ms")]
    pub slow_resolution_threshold_ms: u64,

    /// Lifetime of a cached domain-to-tenant resolution.
    #[serde(default = "default_resolution_cache_ttl_secs")]
    pub resolution_cache_ttl_secs: u64,

    /// Trusted-domain snapshot settings.
    #[serde(default)]
    pub trusted_domains: TrustedDomainsConfig,
}

fn default_super_admin_domains() -> Vec<String> {
    vec![
        "ibuyscrap.ca".to_string(),
        "www.ibuyscrap.ca".to_string(),
        "localhost".to_string(),
    ]
}

fn default_api_domain() -> String {
    "api.ibuyscrap.ca".to_string()
}

fn default_legacy_subdomain_prefix() -> String {
    "immigration".to_string()
}

fn default_apex_domain() -> String {
    "ibuyscrap.ca".to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    2_000
}

fn default_slow_resolution_threshold_ms() -> u64 {
    1_000
}

fn default_resolution_cache_ttl_secs() -> u64 {
    60
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            super_admin_domains: default_super_admin_domains(),
            api_domain: default_api_domain(),
            legacy_subdomain_prefix: default_legacy_subdomain_prefix(),
            apex_domain: default_apex_domain(),
            legacy_name_match: NameMatch::default(),
            trust_forwarded_host: false,
            lookup_timeout_ms: default_lookup_timeout_ms(),
            slow_resolution_threshold_ms: default_slow_resolution_threshold_ms(),
            resolution_cache_ttl_secs: default_resolution_cache_ttl_secs(),
            trusted_domains: TrustedDomainsConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// Returns the per-call store budget.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Returns the slow-resolution threshold.
    #[must_use]
    pub fn slow_resolution_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_resolution_threshold_ms)
    }

    /// Returns the resolution cache TTL.
    #[must_use]
    pub fn resolution_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.resolution_cache_ttl_secs)
    }

    /// Records validation failures into `ctx`.
    pub fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .custom(
                "super_admin_domains",
                || !self.super_admin_domains.is_empty(),
                "at least one super-admin domain is required",
            )
            .valid_hostname("api_domain", &self.api_domain)
            .valid_hostname("apex_domain", &self.apex_domain)
            .custom(
                "legacy_subdomain_prefix",
                || {
                    !self.legacy_subdomain_prefix.is_empty()
                        && !self.legacy_subdomain_prefix.contains('.')
                },
                "must be a single DNS label",
            )
            .custom(
                "api_domain",
                || !self.super_admin_domains.contains(&self.api_domain),
                "api domain cannot also be a super-admin domain",
            )
            .positive("lookup_timeout_ms", &self.lookup_timeout_ms)
            .positive(
                "slow_resolution_threshold_ms",
                &self.slow_resolution_threshold_ms,
            )
            .positive("resolution_cache_ttl_secs", &self.resolution_cache_ttl_secs);

        for domain in &self.super_admin_domains {
            validator.valid_hostname("super_admin_domains", domain);
        }

        ctx.enter("trusted_domains");
        self.trusted_domains.validate_with_context(ctx);
        ctx.exit();
    }
}

impl Validatable for TenancyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("tenancy");
        self.validate_with_context(&mut ctx);
        ctx.exit();
        ctx.into_result()
    }
}

impl Configurable for TenancyConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_list(
            &format!("{prefix}_SUPER_ADMIN_DOMAINS"),
            &mut self.super_admin_domains,
        );
        EnvOverride::apply_string(&format!("{prefix}_API_DOMAIN"), &mut self.api_domain);
        EnvOverride::apply_string(
            &format!("{prefix}_LEGACY_SUBDOMAIN_PREFIX"),
            &mut self.legacy_subdomain_prefix,
        );
        EnvOverride::apply_string(&format!("{prefix}_APEX_DOMAIN"), &mut self.apex_domain);
        EnvOverride::apply_number(
            &format!("{prefix}_LEGACY_NAME_MATCH"),
            &mut self.legacy_name_match,
        );
        EnvOverride::apply_bool(
            &format!("{prefix}_TRUST_FORWARDED_HOST"),
            &mut self.trust_forwarded_host,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_LOOKUP_TIMEOUT_MS"),
            &mut self.lookup_timeout_ms,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_SLOW_RESOLUTION_THRESHOLD_MS"),
            &mut self.slow_resolution_threshold_ms,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_RESOLUTION_CACHE_TTL_SECS"),
            &mut self.resolution_cache_ttl_secs,
        );
        self.trusted_domains
            .apply_env_overrides(&format!("{prefix}_TRUSTED_DOMAINS"));
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = [
            "SUPER_ADMIN_DOMAINS",
            "API_DOMAIN",
            "LEGACY_SUBDOMAIN_PREFIX",
            "APEX_DOMAIN",
            "LEGACY_NAME_MATCH",
            "TRUST_FORWARDED_HOST",
            "LOOKUP_TIMEOUT_MS",
            "SLOW_RESOLUTION_THRESHOLD_MS",
            "RESOLUTION_CACHE_TTL_SECS",
        ]
        .iter()
        .map(|field| format!("{prefix}_{field}"))
        .collect();
        names.extend(TrustedDomainsConfig::env_var_names(&format!(
            "{prefix}_TRUSTED_DOMAINS"
        )));
        names
    }
}

/// Trusted-domain snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedDomainsConfig {
    /// Snapshot age after which the next read rebuilds it.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Snapshot age after which failed rebuilds are logged at error level.
    #[serde(default = "default_max_stale_secs")]
    pub max_stale_secs: u64,

    /// Pause between rebuild attempts after a failure.
    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,

    /// Operator origins always trusted, e.g. `https://ibuyscrap.ca`.
    #[serde(default = "default_operator_origins")]
    pub operator_origins: Vec<String>,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_stale_secs() -> u64 {
    3_600
}

fn default_failure_backoff_secs() -> u64 {
    5
}

fn default_operator_origins() -> Vec<String> {
    vec![
        "https://ibuyscrap.ca".to_string(),
        "https://www.ibuyscrap.ca".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for TrustedDomainsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_stale_secs: default_max_stale_secs(),
            failure_backoff_secs: default_failure_backoff_secs(),
            operator_origins: default_operator_origins(),
        }
    }
}

impl TrustedDomainsConfig {
    /// Returns the snapshot TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Returns the staleness alert threshold.
    #[must_use]
    pub fn max_stale(&self) -> Duration {
        Duration::from_secs(self.max_stale_secs)
    }

    /// Returns the pause between failed rebuilds.
    #[must_use]
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator.positive("ttl_secs", &self.ttl_secs).custom(
            "max_stale_secs",
            || self.max_stale_secs >= self.ttl_secs,
            "must be at least ttl_secs",
        );
        for origin in &self.operator_origins {
            validator.valid_origin("operator_origins", origin);
        }
    }
}

impl Configurable for TrustedDomainsConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_number(&format!("{prefix}_TTL_SECS"), &mut self.ttl_secs);
        EnvOverride::apply_number(
            &format!("{prefix}_MAX_STALE_SECS"),
            &mut self.max_stale_secs,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_FAILURE_BACKOFF_SECS"),
            &mut self.failure_backoff_secs,
        );
        EnvOverride::apply_list(
            &format!("{prefix}_OPERATOR_ORIGINS"),
            &mut self.operator_origins,
        );
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "TTL_SECS",
            "MAX_STALE_SECS",
            "FAILURE_BACKOFF_SECS",
            "OPERATOR_ORIGINS",
        ]
        .iter()
        .map(|field| format!("{prefix}_{field}"))
        .collect()
    }
}

//! Tenant entity definition.

use crate::types::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Evaluation period, servable until the trial expiry passes.
    Trial,
    /// Paying tenant.
    #[default]
    Active,
    /// Soft-disabled by an operator or billing; record is retained.
    Suspended,
    /// Subscription ended; domains are no longer served.
    Cancelled,
}

impl TenantStatus {
    /// Returns true for the statuses the directory may serve (`active` or `trial`).
    #[must_use]
    pub const fn is_active_or_trial(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }

    /// Returns true if the tenant is suspended.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }

    /// Returns true if the tenant is cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer organization sharing the deployment.
///
/// Domains are stored lowercased. The primary `domain` and every entry in
/// `custom_domains` must belong to no other tenant; stores enforce this on
/// insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    id: TenantId,
    name: String,
    domain: String,
    #[serde(default)]
    custom_domains: Vec<String>,
    #[serde(default)]
    status: TenantStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    settings: TenantSettings,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates an active tenant with the given display name and canonical domain.
    #[must_use]
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: name.into(),
            domain: domain.into().to_ascii_lowercase(),
            custom_domains: Vec::new(),
            status: TenantStatus::Active,
            trial_ends_at: None,
            settings: TenantSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the generated identifier.
    #[must_use]
    pub fn with_id(mut self, id: TenantId) -> Self {
        self.id = id;
        self
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: TenantStatus) -> Self {
        self.status = status;
        self
    }

    /// Puts the tenant on a trial ending at `ends_at`.
    #[must_use]
    pub fn with_trial_ending(mut self, ends_at: DateTime<Utc>) -> Self {
        self.status = TenantStatus::Trial;
        self.trial_ends_at = Some(ends_at);
        self
    }

    /// Adds an alternate domain.
    #[must_use]
    pub fn with_custom_domain(mut self, domain: impl Into<String>) -> Self {
        self.add_custom_domain(domain);
        self
    }

    /// Replaces the settings block.
    #[must_use]
    pub fn with_settings(mut self, settings: TenantSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the tenant ID.
    #[must_use]
    pub fn id(&self) -> &TenantId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the canonical domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the alternate domains.
    #[must_use]
    pub fn custom_domains(&self) -> &[String] {
        &self.custom_domains
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> TenantStatus {
        self.status
    }

    /// Returns the trial expiry, if one is recorded.
    #[must_use]
    pub fn trial_ends_at(&self) -> Option<DateTime<Utc>> {
        self.trial_ends_at
    }

    /// Returns the tenant settings.
    #[must_use]
    pub fn settings(&self) -> &TenantSettings {
        &self.settings
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Iterates the canonical domain followed by the custom domains.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str()).chain(self.custom_domains.iter().map(String::as_str))
    }

    /// Returns true if `domain` is the canonical or a custom domain of this tenant.
    #[must_use]
    pub fn owns_domain(&self, domain: &str) -> bool {
        self.domains().any(|d| d.eq_ignore_ascii_case(domain))
    }

    /// Returns true if the tenant is on trial and the expiry is before `now`.
    ///
    /// A trial without an expiry timestamp never expires.
    #[must_use]
    pub fn is_trial_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == TenantStatus::Trial && self.trial_ends_at.is_some_and(|ends| ends < now)
    }

    /// Adds an alternate domain, ignoring duplicates.
    pub fn add_custom_domain(&mut self, domain: impl Into<String>) {
        let domain = domain.into().to_ascii_lowercase();
        if !self.owns_domain(&domain) {
            self.custom_domains.push(domain);
            self.updated_at = Utc::now();
        }
    }

    /// Sets the lifecycle status.
    pub fn set_status(&mut self, status: TenantStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Activates the tenant.
    pub fn activate(&mut self) {
        self.set_status(TenantStatus::Active);
    }

    /// Suspends the tenant.
    pub fn suspend(&mut self) {
        self.set_status(TenantStatus::Suspended);
    }

    /// Lowercases and trims every stored domain and drops duplicate custom domains.
    ///
    /// Records deserialized from seed files are not normalized until this runs.
    pub fn normalize_domains(&mut self) {
        self.domain = self.domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let mut seen = vec![self.domain.clone()];
        self.custom_domains.retain_mut(|d| {
            *d = d.trim().trim_end_matches('.').to_ascii_lowercase();
            if d.is_empty() || seen.contains(d) {
                false
            } else {
                seen.push(d.clone());
                true
            }
        });
    }
}

/// Per-tenant settings carried with the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantSettings {
    /// White-label branding.
    #[serde(default)]
    pub branding: TenantBranding,
    /// Feature flags keyed by feature name.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    /// Plan limits.
    #[serde(default)]
    pub limits: TenantLimits,
}

impl TenantSettings {
    /// Returns true if the named feature flag is set.
    #[must_use]
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}

/// Branding settings for white-label portals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantBranding {
    /// Logo URL.
    pub logo_url: Option<String>,
    /// Primary color (hex).
    pub primary_color: Option<String>,
    /// Support contact shown in the portal footer.
    pub support_email: Option<String>,
}

/// Plan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantLimits {
    /// Maximum staff accounts.
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    /// Maximum open client cases.
    #[serde(default = "default_max_cases")]
    pub max_cases: u32,
    /// Document storage quota in megabytes.
    #[serde(default = "default_storage_mb")]
    pub storage_mb: u64,
}

fn default_max_users() -> u32 {
    5
}

fn default_max_cases() -> u32 {
    100
}

fn default_storage_mb() -> u64 {
    1024
}

impl Default for TenantLimits {
    fn default() -> Self {
        Self {
            max_users: default_max_users(),
            max_cases: default_max_cases(),
            storage_mb: default_storage_mb(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tenant_status() {
        assert!(TenantStatus::Active.is_active_or_trial());
        assert!(TenantStatus::Trial.is_active_or_trial());
        assert!(!TenantStatus::Suspended.is_active_or_trial());
        assert!(TenantStatus::Suspended.is_suspended());
        assert!(TenantStatus::Cancelled.is_cancelled());
        assert_eq!(TenantStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_tenant_creation_lowercases_domain() {
        let tenant = Tenant::new("Acme", "Acme.Example.COM");
        assert_eq!(tenant.domain(), "acme.example.com");
        assert_eq!(tenant.status(), TenantStatus::Active);
        assert!(tenant.owns_domain("ACME.example.com"));
    }

    #[test]
    fn test_custom_domains() {
        let tenant = Tenant::new("Acme", "acme.example.com")
            .with_custom_domain("portal.acme.ca")
            .with_custom_domain("PORTAL.ACME.CA")
            .with_custom_domain("acme.example.com");

        assert_eq!(tenant.custom_domains(), ["portal.acme.ca"]);
        assert_eq!(
            tenant.domains().collect::<Vec<_>>(),
            ["acme.example.com", "portal.acme.ca"]
        );
    }

    #[test]
    fn test_trial_expiry() {
        let now = Utc::now();
        let expired = Tenant::new("Old", "old.example.com").with_trial_ending(now - Duration::days(1));
        let running = Tenant::new("New", "new.example.com").with_trial_ending(now + Duration::days(1));
        let open_ended = Tenant::new("Open", "open.example.com").with_status(TenantStatus::Trial);

        assert!(expired.is_trial_expired_at(now));
        assert!(!running.is_trial_expired_at(now));
        assert!(!open_ended.is_trial_expired_at(now));

        let mut converted = expired.clone();
        converted.activate();
        assert!(!converted.is_trial_expired_at(now));
    }

    #[test]
    fn test_suspension() {
        let mut tenant = Tenant::new("Acme", "acme.example.com");
        tenant.suspend();
        assert!(tenant.status().is_suspended());
        assert!(!tenant.status().is_active_or_trial());
    }

    #[test]
    fn test_seed_record_defaults_and_normalization() {
        let yaml = r"
name: Acme
domain: ACME.example.com.
custom_domains: [' Portal.Acme.ca ', acme.example.com, '']
status: trial
settings:
  features:
    express_entry: true
";
        let mut tenant: Tenant = serde_yaml::from_str(yaml).unwrap();
        tenant.normalize_domains();

        assert_eq!(tenant.domain(), "acme.example.com");
        assert_eq!(tenant.custom_domains(), ["portal.acme.ca"]);
        assert_eq!(tenant.status(), TenantStatus::Trial);
        assert!(tenant.settings().feature_enabled("express_entry"));
        assert!(!tenant.settings().feature_enabled("study_permits"));
        assert_eq!(tenant.settings().limits.max_users, 5);
    }
}

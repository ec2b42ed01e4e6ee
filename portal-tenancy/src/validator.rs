//! Tenant lifecycle validation.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use portal_core::data::{Tenant, TenantStatus};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, TenancyError};

static DOMAIN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain shape pattern is valid")
});

/// Rejects tenants that exist but must not be served.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantValidator;

impl TenantValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates `tenant` against the current time.
    pub fn validate(&self, tenant: &Tenant, domain: &str) -> Result<()> {
        self.validate_at(tenant, domain, Utc::now())
    }

    /// Validates `tenant` as of `now`.
    ///
    /// `domain` is the host the tenant was resolved from; a malformed one is
    /// logged but not rejected.
    pub fn validate_at(&self, tenant: &Tenant, domain: &str, now: DateTime<Utc>) -> Result<()> {
        let tenant_id = tenant.id().to_string();
        match tenant.status() {
            TenantStatus::Suspended => {
                warn!(%tenant_id, domain, "Rejected suspended tenant");
                return Err(TenancyError::TenantSuspended { tenant_id });
            }
            TenantStatus::Cancelled => {
                warn!(%tenant_id, domain, "Rejected cancelled tenant");
                return Err(TenancyError::TenantCancelled { tenant_id });
            }
            TenantStatus::Trial => {
                if let Some(ended_at) = tenant.trial_ends_at()
                    && tenant.is_trial_expired_at(now)
                {
                    warn!(%tenant_id, domain, %ended_at, "Rejected expired trial");
                    return Err(TenancyError::TenantTrialExpired {
                        tenant_id,
                        ended_at,
                    });
                }
            }
            TenantStatus::Active => {}
        }

        if !Self::check_domain_shape(domain) {
            warn!(%tenant_id, domain, "Tenant resolved from a malformed domain");
        }
        debug!(%tenant_id, status = %tenant.status(), "Tenant validated");
        Ok(())
    }

    /// Returns true if `domain` looks like a public DNS name.
    #[must_use]
    pub fn check_domain_shape(domain: &str) -> bool {
        DOMAIN_SHAPE.is_match(domain)
    }
}

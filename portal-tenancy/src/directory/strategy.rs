//! Built-in lookup strategies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_core::traits::{NameMatch, TenantStore};
use tracing::debug;

use super::{LookupOutcome, LookupStrategy};
use crate::config::TenancyConfig;
use crate::resolution::ResolutionMethod;
use crate::store::bounded;

/// Matches the host against primary and custom domains.
///
/// Cancelled tenants are treated as absent. Suspended ones are returned so
/// the validator can reject them with a specific reason.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDomainLookup;

#[async_trait]
impl LookupStrategy for ExactDomainLookup {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::ExactDomain
    }

    async fn lookup(
        &self,
        store: &dyn TenantStore,
        domain: &str,
        timeout: Duration,
    ) -> LookupOutcome {
        let found = bounded(
            store.backend_name(),
            "find_by_domain",
            timeout,
            store.find_by_domain(domain),
        )
        .await;

        match found {
            Ok(Some(tenant)) if tenant.status().is_cancelled() => {
                debug!(domain, tenant_id = %tenant.id(), "Ignoring cancelled tenant");
                LookupOutcome::NotFound
            }
            Ok(Some(tenant)) => LookupOutcome::Found(Arc::new(tenant)),
            Ok(None) => LookupOutcome::NotFound,
            Err(e) => LookupOutcome::Failed(e),
        }
    }
}

/// Legacy `<prefix>.<name>.<apex>` hosts, e.g. `immigration.acme.ibuyscrap.ca`.
#[derive(Debug, Clone)]
pub struct SubdomainFallbackLookup {
    prefix: String,
    apex: String,
    mode: NameMatch,
}

impl SubdomainFallbackLookup {
    /// Creates the strategy from the legacy prefix, apex and name-match settings.
    #[must_use]
    pub fn new(config: &TenancyConfig) -> Self {
        Self {
            prefix: format!("{}.", config.legacy_subdomain_prefix.to_ascii_lowercase()),
            apex: format!(".{}", config.apex_domain.to_ascii_lowercase()),
            mode: config.legacy_name_match,
        }
    }

    /// Extracts `<name>` from a legacy host.
    #[must_use]
    pub fn extract_name<'a>(&self, domain: &'a str) -> Option<&'a str> {
        let name = domain.strip_prefix(&self.prefix)?.strip_suffix(&self.apex)?;
        (!name.is_empty() && !name.contains('.')).then_some(name)
    }
}

#[async_trait]
impl LookupStrategy for SubdomainFallbackLookup {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::SubdomainFallback
    }

    async fn lookup(
        &self,
        store: &dyn TenantStore,
        domain: &str,
        timeout: Duration,
    ) -> LookupOutcome {
        let Some(name) = self.extract_name(domain) else {
            return LookupOutcome::NotFound;
        };

        let found = bounded(
            store.backend_name(),
            "find_by_name_or_domain_case_insensitive",
            timeout,
            store.find_by_name_or_domain_case_insensitive(name, self.mode),
        )
        .await;

        match found {
            Ok(Some(tenant)) if tenant.status().is_active_or_trial() => {
                debug!(domain, name, tenant_id = %tenant.id(), "Legacy subdomain matched");
                LookupOutcome::Found(Arc::new(tenant))
            }
            Ok(_) => LookupOutcome::NotFound,
            Err(e) => LookupOutcome::Failed(e),
        }
    }
}

//! Application state for the API server.

use std::sync::Arc;
use std::time::Instant;

use portal_tenancy::{IsolationEnforcer, TenantResolver, TrustedDomainSource};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// API configuration
    pub config: ApiConfig,
    resolver: Arc<TenantResolver>,
    enforcer: IsolationEnforcer,
    started_at: Instant,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, resolver: Arc<TenantResolver>) -> Self {
        Self {
            config,
            resolver,
            enforcer: IsolationEnforcer::new(),
            started_at: Instant::now(),
        }
    }

    /// Returns the tenant resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<TenantResolver> {
        &self.resolver
    }

    /// Returns the trusted-domain source used for CORS.
    #[must_use]
    pub fn trusted(&self) -> &Arc<dyn TrustedDomainSource> {
        self.resolver.trusted()
    }

    /// Returns the isolation enforcer.
    #[must_use]
    pub fn enforcer(&self) -> &IsolationEnforcer {
        &self.enforcer
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for handler and router tests.

    use super::*;
    use chrono::Utc;
    use portal_core::data::{Tenant, TenantStatus};
    use portal_core::types::TenantId;
    use portal_tenancy::{InMemoryTenantStore, TenancyConfig, TrustedDomainCache};

    pub struct Fixture {
        pub state: Arc<AppState>,
        pub store: Arc<InMemoryTenantStore>,
        pub acme: TenantId,
        pub maple: TenantId,
    }

    pub fn fixture() -> Fixture {
        let config = TenancyConfig::default();
        let store = Arc::new(InMemoryTenantStore::new());
        let acme = Tenant::new("Acme", "acme.example.com");
        let maple = Tenant::new("Maple", "maple.example.com")
            .with_trial_ending(Utc::now() + chrono::Duration::days(10));
        let (acme_id, maple_id) = (*acme.id(), *maple.id());
        store.insert(acme).unwrap();
        store.insert(maple).unwrap();
        store
            .insert(Tenant::new("Held", "suspended-tenant.com").with_status(TenantStatus::Suspended))
            .unwrap();

        let trusted = Arc::new(TrustedDomainCache::new(store.clone(), &config));
        let resolver = Arc::new(TenantResolver::new(&config, store.clone(), trusted));
        Fixture {
            state: Arc::new(AppState::new(ApiConfig::default(), resolver)),
            store,
            acme: acme_id,
            maple: maple_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::fixture;

    #[test]
    fn test_app_state_new() {
        let f = fixture();
        assert_eq!(f.state.uptime_secs(), 0);
        assert!(f.state.trusted().peek().is_empty());
    }
}

//! Domain-to-tenant lookup.
//!
//! A [`TenantDirectory`] runs an ordered list of [`LookupStrategy`]s and
//! keeps a short-lived cache of positive results. Absence and failure are
//! distinct outcomes so the resolver never mistakes a store outage for an
//! unknown domain.

mod strategy;

pub use strategy::{ExactDomainLookup, SubdomainFallbackLookup};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use portal_core::data::Tenant;
use portal_core::traits::TenantStore;
use tracing::{debug, warn};

use crate::config::TenancyConfig;
use crate::error::TenancyError;
use crate::resolution::ResolutionMethod;

/// Result of one lookup.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// A tenant owns the domain. Its status is not yet validated.
    Found(Arc<Tenant>),
    /// No tenant owns the domain.
    NotFound,
    /// The store could not answer.
    Failed(TenancyError),
}

/// One way of mapping a domain to a tenant.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    /// Method reported when this strategy matches.
    fn method(&self) -> ResolutionMethod;

    /// Looks up `domain`, bounding each store call by `timeout`.
    async fn lookup(
        &self,
        store: &dyn TenantStore,
        domain: &str,
        timeout: Duration,
    ) -> LookupOutcome;
}

/// Directory answer with the strategy that produced it.
#[derive(Debug, Clone)]
pub struct DirectoryHit {
    /// Lookup outcome.
    pub outcome: LookupOutcome,
    /// Matching or failing strategy; `Unresolved` when nothing matched.
    pub method: ResolutionMethod,
    /// True if served from the resolution cache.
    pub cache_hit: bool,
}

#[derive(Debug, Clone)]
struct CachedTenant {
    tenant: Arc<Tenant>,
    method: ResolutionMethod,
    stored_at: Instant,
}

/// Ordered lookup strategies over a tenant store.
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    strategies: Vec<Box<dyn LookupStrategy>>,
    timeout: Duration,
    cache_ttl: Duration,
    cache: DashMap<String, CachedTenant>,
}

impl TenantDirectory {
    /// Creates a directory with exact-domain then legacy-subdomain lookup.
    pub fn new(store: Arc<dyn TenantStore>, config: &TenancyConfig) -> Self {
        Self::with_strategies(
            store,
            vec![
                Box::new(ExactDomainLookup),
                Box::new(SubdomainFallbackLookup::new(config)),
            ],
            config,
        )
    }

    /// Creates a directory with a custom strategy order.
    pub fn with_strategies(
        store: Arc<dyn TenantStore>,
        strategies: Vec<Box<dyn LookupStrategy>>,
        config: &TenancyConfig,
    ) -> Self {
        Self {
            store,
            strategies,
            timeout: config.lookup_timeout(),
            cache_ttl: config.resolution_cache_ttl(),
            cache: DashMap::new(),
        }
    }

    /// Resolves `domain` (already normalized).
    ///
    /// Strategies run in order until one finds the tenant. If none does and
    /// any failed, the first failure is returned.
    pub async fn resolve(&self, domain: &str) -> DirectoryHit {
        if let Some(cached) = self.cached(domain) {
            return DirectoryHit {
                outcome: LookupOutcome::Found(cached.tenant),
                method: cached.method,
                cache_hit: true,
            };
        }

        let mut failure: Option<(ResolutionMethod, TenancyError)> = None;
        for strategy in &self.strategies {
            match strategy.lookup(self.store.as_ref(), domain, self.timeout).await {
                LookupOutcome::Found(tenant) => {
                    let method = strategy.method();
                    if let Some((failed, error)) = &failure {
                        warn!(domain, failed = %failed, %error, "Earlier lookup failed; later strategy matched");
                    }
                    self.cache.insert(
                        domain.to_string(),
                        CachedTenant {
                            tenant: Arc::clone(&tenant),
                            method,
                            stored_at: Instant::now(),
                        },
                    );
                    return DirectoryHit {
                        outcome: LookupOutcome::Found(tenant),
                        method,
                        cache_hit: false,
                    };
                }
                LookupOutcome::NotFound => {}
                LookupOutcome::Failed(error) => {
                    debug!(domain, method = %strategy.method(), %error, "Lookup strategy failed");
                    failure.get_or_insert((strategy.method(), error));
                }
            }
        }

        match failure {
            Some((method, error)) => DirectoryHit {
                outcome: LookupOutcome::Failed(error),
                method,
                cache_hit: false,
            },
            None => DirectoryHit {
                outcome: LookupOutcome::NotFound,
                method: ResolutionMethod::Unresolved,
                cache_hit: false,
            },
        }
    }

    /// Drops every cached resolution.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Number of cached resolutions, including expired ones not yet evicted.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn cached(&self, domain: &str) -> Option<CachedTenant> {
        let entry = self.cache.get(domain)?;
        if entry.stored_at.elapsed() < self.cache_ttl {
            return Some(entry.clone());
        }
        drop(entry);
        self.cache.remove(domain);
        None
    }
}

impl std::fmt::Debug for TenantDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantDirectory")
            .field("backend", &self.store.backend_name())
            .field("strategies", &self.strategies.len())
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::ScriptedStore;

    /// Strategy that always fails, for precedence tests.
    struct Broken;

    #[async_trait]
    impl LookupStrategy for Broken {
        fn method(&self) -> ResolutionMethod {
            ResolutionMethod::ExactDomain
        }

        async fn lookup(&self, _: &dyn TenantStore, _: &str, _: Duration) -> LookupOutcome {
            LookupOutcome::Failed(TenancyError::store_unavailable("replica lag"))
        }
    }

    fn store() -> Arc<ScriptedStore> {
        ScriptedStore::with_tenants([
            Tenant::new("Acme", "acme.example.com"),
            Tenant::new("Maple", "maple-law.ca"),
        ])
    }

    #[tokio::test]
    async fn test_exact_hit_then_cache_hit() {
        let store = store();
        let directory = TenantDirectory::new(store.clone(), &TenancyConfig::default());

        let first = directory.resolve("acme.example.com").await;
        assert!(matches!(first.outcome, LookupOutcome::Found(_)));
        assert_eq!(first.method, ResolutionMethod::ExactDomain);
        assert!(!first.cache_hit);

        let second = directory.resolve("acme.example.com").await;
        assert!(second.cache_hit);
        assert_eq!(second.method, ResolutionMethod::ExactDomain);
        assert_eq!(store.calls(), 1);

        directory.invalidate();
        assert_eq!(directory.cached_len(), 0);
        assert!(!directory.resolve("acme.example.com").await.cache_hit);
    }

    #[tokio::test]
    async fn test_fallback_after_exact_miss() {
        let directory = TenantDirectory::new(store(), &TenancyConfig::default());
        let hit = directory.resolve("immigration.maple.ibuyscrap.ca").await;
        assert_eq!(hit.method, ResolutionMethod::SubdomainFallback);
        assert!(matches!(hit.outcome, LookupOutcome::Found(t) if t.name() == "Maple"));
    }

    #[tokio::test]
    async fn test_not_found_is_unresolved() {
        let directory = TenantDirectory::new(store(), &TenancyConfig::default());
        let hit = directory.resolve("unknown.example.com").await;
        assert!(matches!(hit.outcome, LookupOutcome::NotFound));
        assert_eq!(hit.method, ResolutionMethod::Unresolved);
    }

    #[tokio::test]
    async fn test_failure_beats_not_found() {
        let config = TenancyConfig::default();
        let directory = TenantDirectory::with_strategies(
            store(),
            vec![Box::new(Broken), Box::new(SubdomainFallbackLookup::new(&config))],
            &config,
        );
        let hit = directory.resolve("unknown.example.com").await;
        assert!(matches!(hit.outcome, LookupOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_later_strategy_rescues_failure() {
        let config = TenancyConfig::default();
        let directory = TenantDirectory::with_strategies(
            store(),
            vec![Box::new(Broken), Box::new(SubdomainFallbackLookup::new(&config))],
            &config,
        );
        let hit = directory.resolve("immigration.acme.ibuyscrap.ca").await;
        assert!(matches!(hit.outcome, LookupOutcome::Found(_)));
        assert_eq!(hit.method, ResolutionMethod::SubdomainFallback);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_is_refetched() {
        let store = store();
        let config = TenancyConfig {
            resolution_cache_ttl_secs: 0,
            ..TenancyConfig::default()
        };
        let directory = TenantDirectory::new(store.clone(), &config);
        directory.resolve("acme.example.com").await;
        assert!(!directory.resolve("acme.example.com").await.cache_hit);
        assert_eq!(store.calls(), 2);
    }
}

//! Trusted-domain snapshot backing CORS origin checks.
//!
//! The snapshot is rebuilt wholesale from the tenant store and swapped in
//! behind an `Arc`, so readers always see a complete set. A failed rebuild
//! keeps serving the previous snapshot.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use portal_core::traits::TenantStore;
use portal_telemetry::spans::cache_refresh_span;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::{TenancyConfig, TrustedDomainsConfig};
use crate::error::{Result, TenancyError};
use crate::store::bounded;

/// Immutable set of trusted origins.
#[derive(Debug, Clone)]
pub struct TrustedDomainSnapshot {
    origins: HashSet<String>,
    built_at: Option<Instant>,
    built_at_utc: Option<DateTime<Utc>>,
    tenant_count: usize,
}

impl TrustedDomainSnapshot {
    /// A snapshot that was never built. Always stale.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            origins: HashSet::new(),
            built_at: None,
            built_at_utc: None,
            tenant_count: 0,
        }
    }

    fn build(origins: HashSet<String>, tenant_count: usize) -> Self {
        Self {
            origins,
            built_at: Some(Instant::now()),
            built_at_utc: Some(Utc::now()),
            tenant_count,
        }
    }

    /// Returns true if `origin` (e.g. `https://acme.example.com`) is trusted.
    #[must_use]
    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    /// Iterates the trusted origins in no particular order.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    /// Number of trusted origins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Returns true if no origin is trusted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Number of tenants that contributed domains.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.tenant_count
    }

    /// Time since the snapshot was built, `None` if it never was.
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        self.built_at.map(|at| at.elapsed())
    }

    /// Wall-clock build time.
    #[must_use]
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at_utc
    }

    /// Returns true if the snapshot is non-empty and younger than `ttl`.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        !self.is_empty() && self.age().is_some_and(|age| age < ttl)
    }
}

/// Source of trusted origins, injected into the resolver and the CORS layer.
#[async_trait]
pub trait TrustedDomainSource: Send + Sync {
    /// Returns a fresh snapshot, rebuilding if stale. Never fails; on a
    /// rebuild fault the previous snapshot is returned.
    async fn get(&self) -> Arc<TrustedDomainSnapshot>;

    /// Rebuilds the snapshot. `force` ignores the TTL. Store faults are
    /// reported to the caller.
    async fn refresh(&self, force: bool) -> Result<Arc<TrustedDomainSnapshot>>;

    /// Returns the current snapshot without touching the store.
    fn peek(&self) -> Arc<TrustedDomainSnapshot>;

    /// Returns rebuild counters.
    fn stats(&self) -> TrustedDomainStats;

    /// Returns true if `origin` is trusted.
    async fn is_trusted_origin(&self, origin: &str) -> bool {
        self.get().await.contains(origin)
    }
}

/// Counters exposed through the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct TrustedDomainStats {
    /// Origins in the current snapshot.
    pub origins: usize,
    /// Tenants that contributed to it.
    pub tenants: usize,
    /// Snapshot age in seconds.
    pub age_secs: Option<u64>,
    /// When the snapshot was built.
    pub built_at: Option<DateTime<Utc>>,
    /// Successful rebuilds.
    pub rebuilds: u64,
    /// Failed rebuilds.
    pub failures: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

/// Store-backed [`TrustedDomainSource`].
pub struct TrustedDomainCache {
    store: Arc<dyn TenantStore>,
    config: TrustedDomainsConfig,
    lookup_timeout: Duration,
    snapshot: RwLock<Arc<TrustedDomainSnapshot>>,
    rebuild_guard: tokio::sync::Mutex<()>,
    last_failure: RwLock<Option<(Instant, String)>>,
    rebuilds: AtomicU64,
    failures: AtomicU64,
}

impl TrustedDomainCache {
    /// Creates an empty cache; the first `get()` builds the snapshot.
    pub fn new(store: Arc<dyn TenantStore>, config: &TenancyConfig) -> Self {
        Self {
            store,
            config: config.trusted_domains.clone(),
            lookup_timeout: config.lookup_timeout(),
            snapshot: RwLock::new(Arc::new(TrustedDomainSnapshot::empty())),
            rebuild_guard: tokio::sync::Mutex::new(()),
            last_failure: RwLock::new(None),
            rebuilds: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn in_backoff(&self) -> bool {
        self.last_failure
            .read()
            .as_ref()
            .is_some_and(|(at, _)| at.elapsed() < self.config.failure_backoff())
    }

    /// True for a snapshot that was never built or is older than `max_stale`.
    fn past_staleness_limit(&self, snapshot: &TrustedDomainSnapshot) -> bool {
        snapshot
            .age()
            .is_none_or(|age| age > self.config.max_stale())
    }

    async fn rebuild(&self, force: bool) -> Result<Arc<TrustedDomainSnapshot>> {
        let _guard = self.rebuild_guard.lock().await;

        // Another caller may have rebuilt while we waited.
        let current = self.peek();
        if !force && current.is_fresh(self.config.ttl()) {
            return Ok(current);
        }

        let span = cache_refresh_span(force);
        let result = async {
            let tenants = bounded(
                self.store.backend_name(),
                "list_active_or_trial_with_domains",
                self.lookup_timeout,
                self.store.list_active_or_trial_with_domains(),
            )
            .await?;

            let mut origins: HashSet<String> = HashSet::new();
            for tenant in &tenants {
                for domain in tenant.domains().filter(|d| !d.is_empty()) {
                    origins.insert(format!("https://{domain}"));
                    origins.insert(format!("http://{domain}"));
                }
            }
            origins.extend(self.config.operator_origins.iter().cloned());
            tracing::Span::current().record("domains", origins.len());
            Ok::<_, TenancyError>(TrustedDomainSnapshot::build(origins, tenants.len()))
        }
        .instrument(span)
        .await;

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.snapshot.write() = Arc::clone(&snapshot);
                *self.last_failure.write() = None;
                self.rebuilds.fetch_add(1, Ordering::Relaxed);
                info!(
                    origins = snapshot.len(),
                    tenants = snapshot.tenant_count(),
                    force,
                    "Trusted domains rebuilt"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                *self.last_failure.write() = Some((Instant::now(), e.to_string()));
                let age_secs = current.age().map(|age| age.as_secs());
                if self.past_staleness_limit(&current) {
                    error!(error = %e, age_secs, "Trusted domains rebuild failed; snapshot missing or past staleness limit");
                } else {
                    warn!(error = %e, age_secs, "Trusted domains rebuild failed; serving previous snapshot");
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TrustedDomainCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedDomainCache")
            .field("backend", &self.store.backend_name())
            .field("origins", &self.peek().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TrustedDomainSource for TrustedDomainCache {
    async fn get(&self) -> Arc<TrustedDomainSnapshot> {
        let current = self.peek();
        if current.is_fresh(self.config.ttl()) {
            return current;
        }
        if self.in_backoff() {
            debug!("Trusted domains rebuild in backoff; serving previous snapshot");
            return current;
        }
        match self.rebuild(false).await {
            Ok(snapshot) => snapshot,
            Err(_) => self.peek(),
        }
    }

    async fn refresh(&self, force: bool) -> Result<Arc<TrustedDomainSnapshot>> {
        self.rebuild(force).await
    }

    fn peek(&self) -> Arc<TrustedDomainSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    fn stats(&self) -> TrustedDomainStats {
        let snapshot = self.peek();
        TrustedDomainStats {
            origins: snapshot.len(),
            tenants: snapshot.tenant_count(),
            age_secs: snapshot.age().map(|age| age.as_secs()),
            built_at: snapshot.built_at(),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_error: self.last_failure.read().as_ref().map(|(_, e)| e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::ScriptedStore;
    use portal_core::data::{Tenant, TenantStatus};

    fn config() -> TenancyConfig {
        let mut config = TenancyConfig::default();
        config.trusted_domains.operator_origins = vec!["https://ibuyscrap.ca".to_string()];
        config.trusted_domains.failure_backoff_secs = 0;
        config
    }

    fn tenants() -> Vec<Tenant> {
        vec![
            Tenant::new("Acme", "acme.example.com").with_custom_domain("visas.acme.ca"),
            Tenant::new("Trial Co", "trial.example.com")
                .with_trial_ending(Utc::now() + chrono::Duration::days(3)),
            Tenant::new("Gone", "gone.example.com").with_status(TenantStatus::Suspended),
        ]
    }

    #[tokio::test]
    async fn test_forced_refresh_then_get_has_both_schemes() {
        let store = ScriptedStore::with_tenants(tenants());
        let cache = TrustedDomainCache::new(store.clone(), &config());

        cache.refresh(true).await.unwrap();
        let snapshot = cache.get().await;

        for domain in ["acme.example.com", "visas.acme.ca", "trial.example.com"] {
            assert!(snapshot.contains(&format!("https://{domain}")), "{domain}");
            assert!(snapshot.contains(&format!("http://{domain}")), "{domain}");
        }
        assert!(!snapshot.contains("https://gone.example.com"));
        assert!(snapshot.contains("https://ibuyscrap.ca"));
        assert_eq!(snapshot.tenant_count(), 2);
        assert_eq!(snapshot.len(), 7);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_served_without_store_calls() {
        let store = ScriptedStore::with_tenants(tenants());
        let cache = TrustedDomainCache::new(store.clone(), &config());

        let first = cache.get().await;
        let second = cache.get().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.calls(), 1);
        assert!(cache.is_trusted_origin("http://visas.acme.ca").await);
        assert!(!cache.is_trusted_origin("https://evil.example.com").await);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_snapshot() {
        let store = ScriptedStore::with_tenants(tenants());
        let cache = TrustedDomainCache::new(store.clone(), &config());
        let before = cache.refresh(true).await.unwrap();

        store.fail(true);
        let err = cache.refresh(true).await.unwrap_err();
        assert!(err.is_infrastructure());

        let after = cache.get().await;
        assert!(Arc::ptr_eq(&before, &after));

        let stats = cache.stats();
        assert_eq!(stats.rebuilds, 1);
        assert_eq!(stats.failures, 1);
        assert!(stats.last_error.is_some());
    }

    #[tokio::test]
    async fn test_get_never_fails_on_cold_store_fault() {
        let store = ScriptedStore::with_tenants(tenants());
        store.fail(true);
        let cache = TrustedDomainCache::new(store.clone(), &config());
        assert!(cache.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_unbuilt_snapshot_is_past_staleness_limit() {
        let store = ScriptedStore::with_tenants(tenants());
        let cache = TrustedDomainCache::new(store.clone(), &config());
        assert!(cache.past_staleness_limit(&cache.peek()));

        let built = cache.refresh(true).await.unwrap();
        assert!(!cache.past_staleness_limit(&built));

        let mut config = config();
        config.trusted_domains.ttl_secs = 0;
        config.trusted_domains.max_stale_secs = 0;
        let strict = TrustedDomainCache::new(store, &config);
        let built = strict.refresh(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(strict.past_staleness_limit(&built));
    }

    #[tokio::test]
    async fn test_backoff_skips_rebuild_after_failure() {
        let store = ScriptedStore::with_tenants(tenants());
        store.fail(true);
        let mut config = config();
        config.trusted_domains.failure_backoff_secs = 60;
        let cache = TrustedDomainCache::new(store.clone(), &config);

        cache.get().await;
        cache.get().await;
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_gets_rebuild_once() {
        let store = ScriptedStore::with_tenants(tenants());
        store.stall(Duration::from_millis(50));
        let cache = Arc::new(TrustedDomainCache::new(store.clone(), &config()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await.len() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_timeout_is_a_fault() {
        let store = ScriptedStore::with_tenants(tenants());
        store.stall(Duration::from_millis(200));
        let mut config = config();
        config.lookup_timeout_ms = 10;
        let cache = TrustedDomainCache::new(store.clone(), &config);

        let err = cache.refresh(true).await.unwrap_err();
        assert!(matches!(err, TenancyError::LookupTimeout { .. }));
    }
}

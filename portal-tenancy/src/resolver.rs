//! Resolution orchestrator.
//!
//! `Start -> Parsed -> {SuperAdmin | Api | TenantLookup}`; a tenant lookup
//! then ends `Resolved -> Validated`, or rejected as unknown, unservable, or
//! failed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use portal_core::traits::TenantStore;
use portal_telemetry::spans::resolution_span;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::config::TenancyConfig;
use crate::directory::{LookupOutcome, TenantDirectory};
use crate::domain::{DomainClass, DomainParser};
use crate::error::{Result, TenancyError};
use crate::resolution::{ResolutionMethod, ResolutionResult, ResolutionScope};
use crate::trusted::{TrustedDomainSnapshot, TrustedDomainSource};
use crate::validator::TenantValidator;

/// Turns a request host into a [`ResolutionResult`].
pub struct TenantResolver {
    parser: DomainParser,
    directory: TenantDirectory,
    validator: TenantValidator,
    trusted: Arc<dyn TrustedDomainSource>,
    slow_threshold: Duration,
    trusted_refresh_pending: Arc<AtomicBool>,
    slow_resolutions: AtomicU64,
}

impl TenantResolver {
    /// Builds a resolver with the default lookup strategies.
    pub fn new(
        config: &TenancyConfig,
        store: Arc<dyn TenantStore>,
        trusted: Arc<dyn TrustedDomainSource>,
    ) -> Self {
        Self::from_parts(
            DomainParser::new(config),
            TenantDirectory::new(store, config),
            trusted,
            config.slow_resolution_threshold(),
        )
    }

    /// Builds a resolver from prepared components.
    pub fn from_parts(
        parser: DomainParser,
        directory: TenantDirectory,
        trusted: Arc<dyn TrustedDomainSource>,
        slow_threshold: Duration,
    ) -> Self {
        Self {
            parser,
            directory,
            validator: TenantValidator::new(),
            trusted,
            slow_threshold,
            trusted_refresh_pending: Arc::new(AtomicBool::new(false)),
            slow_resolutions: AtomicU64::new(0),
        }
    }

    /// Trusted-domain source shared with the CORS layer.
    #[must_use]
    pub fn trusted(&self) -> &Arc<dyn TrustedDomainSource> {
        &self.trusted
    }

    /// Resolves the raw `Host` and optional `X-Forwarded-Host` values.
    pub async fn resolve(
        &self,
        host: Option<&str>,
        forwarded: Option<&str>,
    ) -> Result<ResolutionResult> {
        let span = resolution_span(host.unwrap_or_default());
        self.resolve_in_span(host, forwarded).instrument(span).await
    }

    /// Resolves a bare host string.
    pub async fn resolve_host(&self, host: &str) -> Result<ResolutionResult> {
        self.resolve(Some(host), None).await
    }

    /// Clears the resolution cache and rebuilds the trusted-domain snapshot.
    pub async fn refresh_caches(&self, force: bool) -> Result<Arc<TrustedDomainSnapshot>> {
        self.directory.invalidate();
        self.trusted.refresh(force).await
    }

    /// Resolutions that exceeded the slow threshold, whatever their outcome.
    #[must_use]
    pub fn slow_resolutions(&self) -> u64 {
        self.slow_resolutions.load(Ordering::Relaxed)
    }

    async fn resolve_in_span(
        &self,
        host: Option<&str>,
        forwarded: Option<&str>,
    ) -> Result<ResolutionResult> {
        let started = Instant::now();
        let parsed = self.parser.parse(host, forwarded).inspect_err(|e| {
            Span::current().record("method", ResolutionMethod::Unresolved.as_str());
            info!(error = %e, "Rejected request host");
        })?;
        let domain = parsed.domain().to_string();

        let outcome = match parsed.class() {
            DomainClass::SuperAdmin => Ok((ResolutionScope::SuperAdmin, ResolutionMethod::SuperAdmin, false)),
            DomainClass::Api => Ok((ResolutionScope::Api, ResolutionMethod::Api, false)),
            DomainClass::TenantCandidate => self.lookup_tenant(&domain).await,
        };

        let elapsed = started.elapsed();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let span = Span::current();
        span.record("elapsed_ms", elapsed_ms);
        let slow = elapsed > self.slow_threshold;
        if slow {
            self.slow_resolutions.fetch_add(1, Ordering::Relaxed);
        }

        let (scope, method, cache_hit) = match outcome {
            Ok(resolved) => resolved,
            Err(e) => {
                if slow {
                    warn!(%domain, elapsed_ms, error = %e, "Slow tenant resolution");
                }
                return Err(e);
            }
        };

        span.record("method", method.as_str());
        span.record("cache_hit", cache_hit);
        if slow {
            warn!(%domain, %method, cache_hit, elapsed_ms, "Slow tenant resolution");
        } else {
            debug!(%domain, %method, cache_hit, elapsed_ms, "Tenant resolved");
        }

        Ok(ResolutionResult::new(scope, domain, method, cache_hit, elapsed))
    }

    async fn lookup_tenant(
        &self,
        domain: &str,
    ) -> Result<(ResolutionScope, ResolutionMethod, bool)> {
        let hit = self.directory.resolve(domain).await;
        Span::current().record("method", hit.method.as_str());
        match hit.outcome {
            LookupOutcome::Found(tenant) => {
                self.validator.validate(&tenant, domain)?;
                if hit.method == ResolutionMethod::ExactDomain {
                    self.ensure_trusted(domain);
                }
                Ok((ResolutionScope::Tenant(tenant), hit.method, hit.cache_hit))
            }
            LookupOutcome::NotFound => {
                info!(domain, "No tenant owns domain");
                Err(TenancyError::invalid_domain(format!(
                    "no tenant owns {domain}"
                )))
            }
            LookupOutcome::Failed(e) => {
                error!(domain, method = %hit.method, error = %e, "Tenant lookup failed");
                Err(e)
            }
        }
    }

    /// Schedules a trusted-domain rebuild when a tenant domain is missing
    /// from a built snapshot, e.g. right after provisioning.
    fn ensure_trusted(&self, domain: &str) {
        let snapshot = self.trusted.peek();
        if snapshot.is_empty() || snapshot.contains(&format!("https://{domain}")) {
            return;
        }
        if self
            .trusted_refresh_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        info!(domain, "Domain missing from trusted set; scheduling refresh");
        let trusted = Arc::clone(&self.trusted);
        let pending = Arc::clone(&self.trusted_refresh_pending);
        tokio::spawn(async move {
            if let Err(e) = trusted.refresh(true).await {
                warn!(error = %e, "Background trusted-domain refresh failed");
            }
            pending.store(false, Ordering::Release);
        });
    }
}

impl std::fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolver")
            .field("parser", &self.parser)
            .field("directory", &self.directory)
            .field("slow_threshold", &self.slow_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::ScriptedStore;
    use crate::trusted::TrustedDomainCache;
    use chrono::Utc;
    use portal_core::data::{Tenant, TenantStatus};

    struct Fixture {
        store: Arc<ScriptedStore>,
        trusted: Arc<TrustedDomainCache>,
        resolver: TenantResolver,
    }

    fn fixture_with(config: &TenancyConfig) -> Fixture {
        let store = ScriptedStore::with_tenants([
            Tenant::new("Acme", "acme.example.com").with_custom_domain("visas.acme.ca"),
            Tenant::new("Trial Co", "trial.example.com")
                .with_trial_ending(Utc::now() + chrono::Duration::days(7)),
            Tenant::new("Expired Co", "expired.example.com")
                .with_trial_ending(Utc::now() - chrono::Duration::days(1)),
            Tenant::new("Suspended Co", "suspended-tenant.com").with_status(TenantStatus::Suspended),
        ]);
        let trusted = Arc::new(TrustedDomainCache::new(store.clone(), config));
        let resolver = TenantResolver::new(config, store.clone(), trusted.clone());
        Fixture {
            store,
            trusted,
            resolver,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(&TenancyConfig::default())
    }

    #[tokio::test]
    async fn test_super_admin_domains() {
        let f = fixture();
        for host in TenancyConfig::default().super_admin_domains {
            let result = f.resolver.resolve_host(&host).await.unwrap();
            assert!(result.is_super_admin(), "{host}");
            assert!(result.tenant().is_none());
        }
        let result = f.resolver.resolve_host("localhost:5173").await.unwrap();
        assert!(result.is_super_admin());
        assert_eq!(result.method(), ResolutionMethod::SuperAdmin);
        assert_eq!(f.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_api_domain() {
        let f = fixture();
        let result = f.resolver.resolve_host("api.ibuyscrap.ca").await.unwrap();
        assert!(result.is_api_domain());
        assert_eq!(result.method(), ResolutionMethod::Api);
        assert_eq!(f.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_active_and_trial_tenants_resolve() {
        let f = fixture();
        for (host, name) in [
            ("acme.example.com", "Acme"),
            ("VISAS.acme.ca:443", "Acme"),
            ("trial.example.com", "Trial Co"),
        ] {
            let result = f.resolver.resolve_host(host).await.unwrap();
            assert_eq!(result.tenant().map(|t| t.name()), Some(name), "{host}");
            assert_eq!(result.method(), ResolutionMethod::ExactDomain);
        }
    }

    #[tokio::test]
    async fn test_unservable_tenants_rejected() {
        let f = fixture();
        assert!(matches!(
            f.resolver.resolve_host("suspended-tenant.com").await,
            Err(TenancyError::TenantSuspended { .. })
        ));
        assert!(matches!(
            f.resolver.resolve_host("expired.example.com").await,
            Err(TenancyError::TenantTrialExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_domain_is_invalid() {
        let f = fixture();
        let err = f.resolver.resolve_host("unknown.example.com").await.unwrap_err();
        assert!(matches!(err, TenancyError::InvalidDomain { .. }));
    }

    #[tokio::test]
    async fn test_oversized_host_never_reaches_store() {
        let f = fixture();
        let host = format!("{}.example.com", "a".repeat(242));
        assert_eq!(host.len(), 254);
        let err = f.resolver.resolve_host(&host).await.unwrap_err();
        assert!(matches!(err, TenancyError::InvalidDomain { .. }));
        assert_eq!(f.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent_within_ttl() {
        let f = fixture();
        let first = f.resolver.resolve_host("acme.example.com").await.unwrap();
        let second = f.resolver.resolve_host("acme.example.com").await.unwrap();
        assert!(first.same_outcome(&second));
        assert!(!first.cache_hit());
        assert!(second.cache_hit());
    }

    #[tokio::test]
    async fn test_store_fault_is_not_invalid_domain() {
        let f = fixture();
        f.store.fail(true);
        let err = f.resolver.resolve_host("acme.example.com").await.unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn test_store_timeout_bounded() {
        let config = TenancyConfig {
            lookup_timeout_ms: 20,
            ..TenancyConfig::default()
        };
        let f = fixture_with(&config);
        f.store.stall(Duration::from_millis(500));
        let err = f.resolver.resolve_host("acme.example.com").await.unwrap_err();
        assert!(matches!(err, TenancyError::LookupTimeout { .. }));
    }

    #[tokio::test]
    async fn test_slow_resolution_counted_on_every_outcome() {
        let config = TenancyConfig {
            slow_resolution_threshold_ms: 10,
            ..TenancyConfig::default()
        };
        let f = fixture_with(&config);
        f.store.stall(Duration::from_millis(40));

        assert!(f.resolver.resolve_host("unknown.example.com").await.is_err());
        assert_eq!(f.resolver.slow_resolutions(), 1);

        assert!(f.resolver.resolve_host("suspended-tenant.com").await.is_err());
        assert_eq!(f.resolver.slow_resolutions(), 2);

        f.store.fail(true);
        assert!(f.resolver.resolve_host("trial.example.com").await.is_err());
        assert_eq!(f.resolver.slow_resolutions(), 3);

        f.store.fail(false);
        f.resolver.resolve_host("acme.example.com").await.unwrap();
        assert_eq!(f.resolver.slow_resolutions(), 4);

        f.resolver.resolve_host("ibuyscrap.ca").await.unwrap();
        assert_eq!(f.resolver.slow_resolutions(), 4);
    }

    #[tokio::test]
    async fn test_legacy_subdomain() {
        let f = fixture();
        let result = f
            .resolver
            .resolve_host("immigration.acme.ibuyscrap.ca")
            .await
            .unwrap();
        assert_eq!(result.method(), ResolutionMethod::SubdomainFallback);
        assert_eq!(result.tenant().map(|t| t.name()), Some("Acme"));
    }

    #[tokio::test]
    async fn test_refresh_caches_clears_resolution_cache() {
        let f = fixture();
        f.resolver.resolve_host("acme.example.com").await.unwrap();
        let snapshot = f.resolver.refresh_caches(true).await.unwrap();
        assert!(snapshot.contains("https://acme.example.com"));
        let result = f.resolver.resolve_host("acme.example.com").await.unwrap();
        assert!(!result.cache_hit());
    }

    #[tokio::test]
    async fn test_new_tenant_domain_triggers_trusted_refresh() {
        let f = fixture();
        f.trusted.get().await;
        f.store
            .inner
            .insert(Tenant::new("Fresh", "fresh.example.com"))
            .unwrap();

        f.resolver.resolve_host("fresh.example.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(f.trusted.peek().contains("https://fresh.example.com"));
    }
}

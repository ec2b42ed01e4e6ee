//! Resolution results.

use std::sync::Arc;
use std::time::Duration;

use portal_core::data::Tenant;
use portal_core::types::TenantId;
use serde::{Deserialize, Serialize};

use crate::isolation::IsolationContext;

/// Strategy that produced a resolution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Host equals a tenant's primary or custom domain.
    ExactDomain,
    /// Legacy `<prefix>.<name>.<apex>` host.
    SubdomainFallback,
    /// Operator host.
    SuperAdmin,
    /// Public API host.
    Api,
    /// Nothing matched.
    Unresolved,
}

impl ResolutionMethod {
    /// Wire name used in headers and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactDomain => "exact_domain",
            Self::SubdomainFallback => "subdomain_fallback",
            Self::SuperAdmin => "super_admin",
            Self::Api => "api",
            Self::Unresolved => "unresolved",
        }
    }
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a request acts as. Exactly one applies.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionScope {
    /// A validated tenant.
    Tenant(Arc<Tenant>),
    /// Operator with cross-tenant bypass.
    SuperAdmin,
    /// Public API, no tenant.
    Api,
}

impl ResolutionScope {
    /// Isolation constraint for data access. API requests get none, so
    /// tenant-scoped operations fail closed.
    #[must_use]
    pub fn isolation_context(&self) -> Option<IsolationContext> {
        match self {
            Self::Tenant(tenant) => Some(IsolationContext::for_tenant(*tenant.id())),
            Self::SuperAdmin => Some(IsolationContext::super_admin()),
            Self::Api => None,
        }
    }
}

/// Outcome of a successful resolution. Read-only.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    scope: ResolutionScope,
    domain: String,
    method: ResolutionMethod,
    cache_hit: bool,
    resolution_time: Duration,
}

impl ResolutionResult {
    pub(crate) fn new(
        scope: ResolutionScope,
        domain: String,
        method: ResolutionMethod,
        cache_hit: bool,
        resolution_time: Duration,
    ) -> Self {
        Self {
            scope,
            domain,
            method,
            cache_hit,
            resolution_time,
        }
    }

    /// Resolved scope.
    #[must_use]
    pub fn scope(&self) -> &ResolutionScope {
        &self.scope
    }

    /// The resolved tenant, if any.
    #[must_use]
    pub fn tenant(&self) -> Option<&Arc<Tenant>> {
        match &self.scope {
            ResolutionScope::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }

    /// Identifier of the resolved tenant.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant().map(|t| *t.id())
    }

    /// Returns true for operator hosts.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self.scope, ResolutionScope::SuperAdmin)
    }

    /// Returns true for the public API host.
    #[must_use]
    pub fn is_api_domain(&self) -> bool {
        matches!(self.scope, ResolutionScope::Api)
    }

    /// Normalized request host.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Strategy that produced the result.
    #[must_use]
    pub fn method(&self) -> ResolutionMethod {
        self.method
    }

    /// Returns true if the tenant came from the resolution cache.
    #[must_use]
    pub fn cache_hit(&self) -> bool {
        self.cache_hit
    }

    /// Wall-clock resolution time.
    #[must_use]
    pub fn resolution_time(&self) -> Duration {
        self.resolution_time
    }

    /// Isolation constraint for data access.
    #[must_use]
    pub fn isolation_context(&self) -> Option<IsolationContext> {
        self.scope.isolation_context()
    }

    /// Returns true if both results name the same scope, domain and method.
    #[must_use]
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.method == other.method
            && self.domain == other.domain
            && match (&self.scope, &other.scope) {
                (ResolutionScope::Tenant(a), ResolutionScope::Tenant(b)) => a.id() == b.id(),
                (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
            }
    }
}

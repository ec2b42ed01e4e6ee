//! Per-request tenant context.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use portal_core::data::Tenant;
use portal_core::types::TenantId;
use serde::Serialize;

use crate::error::{Result, TenancyError};
use crate::isolation::IsolationContext;
use crate::resolution::{ResolutionMethod, ResolutionResult, ResolutionScope};

/// Header names written on responses. Advisory only.
pub mod headers {
    /// Resolved tenant id.
    pub const TENANT_ID: &str = "x-tenant-id";
    /// Resolved tenant display name.
    pub const TENANT_NAME: &str = "x-tenant-name";
    /// Normalized request host.
    pub const TENANT_DOMAIN: &str = "x-tenant-domain";
    /// Resolution method.
    pub const RESOLUTION_METHOD: &str = "x-resolution-method";
    /// Whether the resolution cache answered.
    pub const CACHE_HIT: &str = "x-cache-hit";
    /// Resolution latency.
    pub const RESOLUTION_TIME: &str = "x-resolution-time";
    /// Operator request.
    pub const IS_SUPER_ADMIN: &str = "x-is-super-admin";
    /// Public API request.
    pub const IS_API_DOMAIN: &str = "x-is-api-domain";

    /// Every advisory header, for stripping client-supplied copies.
    pub const ALL: [&str; 8] = [
        TENANT_ID,
        TENANT_NAME,
        TENANT_DOMAIN,
        RESOLUTION_METHOD,
        CACHE_HIT,
        RESOLUTION_TIME,
        IS_SUPER_ADMIN,
        IS_API_DOMAIN,
    ];
}

/// Read-only view of who the current request acts as.
#[derive(Debug, Clone)]
pub struct TenantContext {
    scope: ResolutionScope,
    domain: String,
    method: ResolutionMethod,
    cache_hit: bool,
    resolution_time: Duration,
    resolved_at: DateTime<Utc>,
    request_id: String,
}

impl TenantContext {
    /// Captures a resolution for one request.
    #[must_use]
    pub fn from_resolution(result: &ResolutionResult, request_id: impl Into<String>) -> Self {
        Self {
            scope: result.scope().clone(),
            domain: result.domain().to_string(),
            method: result.method(),
            cache_hit: result.cache_hit(),
            resolution_time: result.resolution_time(),
            resolved_at: Utc::now(),
            request_id: request_id.into(),
        }
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

    /// Normalized request host.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// How the request was resolved.
    #[must_use]
    pub fn method(&self) -> ResolutionMethod {
        self.method
    }

    /// Request correlation id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the context was captured.
    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Returns true if the request belongs to `tenant_id`.
    #[must_use]
    pub fn is_tenant(&self, tenant_id: &TenantId) -> bool {
        self.tenant_id().as_ref() == Some(tenant_id)
    }

    /// Returns true for operator requests.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self.scope, ResolutionScope::SuperAdmin)
    }

    /// Returns true on the public API host.
    #[must_use]
    pub fn is_api_domain(&self) -> bool {
        matches!(self.scope, ResolutionScope::Api)
    }

    /// True iff super-admin or the request's own tenant.
    #[must_use]
    pub fn can_access(&self, tenant_id: &TenantId) -> bool {
        self.is_super_admin() || self.is_tenant(tenant_id)
    }

    /// Fails closed unless the request has a tenant or super-admin scope.
    pub fn require_tenant_context(&self, operation: &str) -> Result<IsolationContext> {
        self.isolation()
            .ok_or_else(|| TenancyError::missing_context(operation))
    }

    /// Isolation constraint for data access, `None` on the API domain.
    #[must_use]
    pub fn isolation(&self) -> Option<IsolationContext> {
        self.scope.isolation_context()
    }

    /// Diagnostic response headers.
    #[must_use]
    pub fn advisory_headers(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(6);
        if let Some(tenant) = self.tenant() {
            out.push((headers::TENANT_ID, tenant.id().to_string()));
            out.push((headers::TENANT_NAME, tenant.name().to_string()));
            out.push((headers::TENANT_DOMAIN, tenant.domain().to_string()));
        }
        out.push((headers::RESOLUTION_METHOD, self.method.as_str().to_string()));
        out.push((headers::CACHE_HIT, self.cache_hit.to_string()));
        out.push((
            headers::RESOLUTION_TIME,
            format!("{:.2}ms", self.resolution_time.as_secs_f64() * 1000.0),
        ));
        if self.is_super_admin() {
            out.push((headers::IS_SUPER_ADMIN, "true".to_string()));
        }
        if self.is_api_domain() {
            out.push((headers::IS_API_DOMAIN, "true".to_string()));
        }
        out
    }

    /// Serializable summary for the context endpoint.
    #[must_use]
    pub fn view(&self) -> TenantContextView {
        TenantContextView {
            tenant_id: self.tenant_id(),
            tenant_name: self.tenant().map(|t| t.name().to_string()),
            tenant_domain: self.tenant().map(|t| t.domain().to_string()),
            domain: self.domain.clone(),
            is_super_admin: self.is_super_admin(),
            is_api_domain: self.is_api_domain(),
            resolution_method: self.method,
            cache_hit: self.cache_hit,
            resolution_time_ms: self.resolution_time.as_secs_f64() * 1000.0,
            resolved_at: self.resolved_at,
            request_id: self.request_id.clone(),
        }
    }
}

/// JSON form of a [`TenantContext`].
#[derive(Debug, Clone, Serialize)]
pub struct TenantContextView {
    /// Resolved tenant id.
    pub tenant_id: Option<TenantId>,
    /// Resolved tenant name.
    pub tenant_name: Option<String>,
    /// Canonical domain of the resolved tenant.
    pub tenant_domain: Option<String>,
    /// Normalized request host.
    pub domain: String,
    /// Operator request.
    pub is_super_admin: bool,
    /// Public API request.
    pub is_api_domain: bool,
    /// How the request was resolved.
    pub resolution_method: ResolutionMethod,
    /// Whether the resolution cache answered.
    pub cache_hit: bool,
    /// Resolution latency in milliseconds.
    pub resolution_time_ms: f64,
    /// When the context was captured.
    pub resolved_at: DateTime<Utc>,
    /// Request correlation id.
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(scope: ResolutionScope, method: ResolutionMethod) -> TenantContext {
        let result = ResolutionResult::new(
            scope,
            "acme.example.com".to_string(),
            method,
            true,
            Duration::from_micros(1_500),
        );
        TenantContext::from_resolution(&result, "req-1")
    }

    #[test]
    fn test_tenant_predicates() {
        let tenant = Arc::new(Tenant::new("Acme", "acme.example.com"));
        let other = TenantId::new();
        let ctx = context(ResolutionScope::Tenant(tenant.clone()), ResolutionMethod::ExactDomain);

        assert!(ctx.is_tenant(tenant.id()));
        assert!(ctx.can_access(tenant.id()));
        assert!(!ctx.can_access(&other));
        assert!(!ctx.is_super_admin());
        assert_eq!(
            ctx.require_tenant_context("read cases").unwrap().enforced(),
            Some(*tenant.id())
        );
    }

    #[test]
    fn test_super_admin_can_access_anything() {
        let ctx = context(ResolutionScope::SuperAdmin, ResolutionMethod::SuperAdmin);
        assert!(ctx.can_access(&TenantId::new()));
        assert!(ctx.require_tenant_context("list tenants").unwrap().bypass());
    }

    #[test]
    fn test_api_domain_has_no_isolation() {
        let ctx = context(ResolutionScope::Api, ResolutionMethod::Api);
        assert!(!ctx.can_access(&TenantId::new()));
        assert!(matches!(
            ctx.require_tenant_context("read cases"),
            Err(TenancyError::MissingTenantContext { .. })
        ));
    }

    #[test]
    fn test_advisory_headers() {
        let tenant = Arc::new(Tenant::new("Acme", "acme.example.com"));
        let ctx = context(ResolutionScope::Tenant(tenant), ResolutionMethod::ExactDomain);
        let pairs = ctx.advisory_headers();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get(headers::TENANT_NAME), Some("Acme"));
        assert_eq!(get(headers::RESOLUTION_METHOD), Some("exact_domain"));
        assert_eq!(get(headers::CACHE_HIT), Some("true"));
        assert_eq!(get(headers::RESOLUTION_TIME), Some("1.50ms"));
        assert_eq!(get(headers::IS_SUPER_ADMIN), None);

        let admin = context(ResolutionScope::SuperAdmin, ResolutionMethod::SuperAdmin);
        assert!(admin
            .advisory_headers()
            .contains(&(headers::IS_SUPER_ADMIN, "true".to_string())));
    }

    #[test]
    fn test_tenant_domain_is_canonical_on_custom_domain_hit() {
        let tenant = Arc::new(
            Tenant::new("Acme", "acme.example.com").with_custom_domain("visas.acme.ca"),
        );
        let result = ResolutionResult::new(
            ResolutionScope::Tenant(tenant),
            "visas.acme.ca".to_string(),
            ResolutionMethod::ExactDomain,
            false,
            Duration::from_millis(2),
        );
        let ctx = TenantContext::from_resolution(&result, "req-2");

        assert_eq!(ctx.domain(), "visas.acme.ca");
        assert!(ctx
            .advisory_headers()
            .contains(&(headers::TENANT_DOMAIN, "acme.example.com".to_string())));
        let view = ctx.view();
        assert_eq!(view.tenant_domain.as_deref(), Some("acme.example.com"));
        assert_eq!(view.domain, "visas.acme.ca");
    }

    #[test]
    fn test_view_serializes() {
        let ctx = context(ResolutionScope::SuperAdmin, ResolutionMethod::SuperAdmin);
        let json = serde_json::to_value(ctx.view()).unwrap();
        assert_eq!(json["is_super_admin"], true);
        assert_eq!(json["resolution_method"], "super_admin");
        assert_eq!(json["request_id"], "req-1");
    }
}

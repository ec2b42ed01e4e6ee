//! Span definitions for request tracing.
//!
//! Fields that are only known after the work completes are declared
//! `Empty` and filled with `Span::record`.

use tracing::{Span, field, info_span};

/// Create a span for an inbound HTTP request.
///
/// # Example
///
/// ```
/// use portal_telemetry::spans::request_span;
///
/// let span = request_span("req-123", "GET", "/api/v1/tenant/context", "acme.example.com");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn request_span(request_id: &str, method: &str, path: &str, host: &str) -> Span {
    info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        host = %host,
        tenant_id = field::Empty,
        otel.kind = "server"
    )
}

/// Create a span around one tenant resolution.
///
/// `method`, `cache_hit` and `elapsed_ms` are recorded by the resolver.
#[must_use]
pub fn resolution_span(domain: &str) -> Span {
    info_span!(
        "tenant.resolve",
        domain = %domain,
        method = field::Empty,
        cache_hit = field::Empty,
        elapsed_ms = field::Empty
    )
}

/// Create a span around a trusted-domain snapshot rebuild.
#[must_use]
pub fn cache_refresh_span(force: bool) -> Span {
    info_span!(
        "trusted_domains.refresh",
        force = force,
        domains = field::Empty
    )
}

/// Create a span for a call into the tenant store.
#[must_use]
pub fn store_span(backend: &str, operation: &str) -> Span {
    info_span!(
        "tenant_store",
        backend = %backend,
        operation = %operation,
        otel.kind = "client"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_accept_late_fields() {
        let span = resolution_span("acme.example.com");
        span.record("method", "exact_domain");
        span.record("cache_hit", false);
        span.record("elapsed_ms", 3_u64);

        let span = request_span("req-1", "GET", "/", "acme.example.com");
        span.record("tenant_id", "t-1");

        let _ = cache_refresh_span(true);
        let _ = store_span("memory", "find_by_domain");
    }
}

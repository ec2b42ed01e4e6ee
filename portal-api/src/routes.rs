//! API route definitions.

use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, request::Parts},
    middleware,
    routing::{get, post},
};
use portal_telemetry::spans::request_span;
use portal_tenancy::context::headers;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, warn};

use crate::config::CorsConfig;
use crate::handlers::{admin, health, tenant};
use crate::middleware::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, resolve_tenant};
use crate::state::AppState;

/// Creates the API router with all routes and layers.
pub fn create_router(state: Arc<AppState>) -> Router {
    let tenant_routes = Router::new()
        .route("/tenant/context", get(tenant::get_context))
        .route("/tenant/access/{tenant_id}", get(tenant::check_access))
        .route("/admin/trusted-domains", get(admin::list_trusted_domains))
        .route(
            "/admin/trusted-domains/refresh",
            post(admin::refresh_trusted_domains),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_tenant,
        ));

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", tenant_routes);

    if state.config.cors.enabled {
        router = router.layer(build_cors_layer(&state));
    }

    router
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(RequestIdLayer::new())
        .with_state(state)
}

fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or("-", RequestId::as_str);
    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    request_span(
        request_id,
        request.method().as_str(),
        request.uri().path(),
        host,
    )
}

/// Builds the CORS layer. Origins are checked against the trusted-domain
/// snapshot on every request.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let config: &CorsConfig = &state.config.cors;
    let trusted = Arc::clone(state.trusted());

    let origin_check = AllowOrigin::async_predicate(move |origin: HeaderValue, _parts: &Parts| {
        let trusted = Arc::clone(&trusted);
        async move {
            match origin.to_str() {
                Ok(origin) => trusted.is_trusted_origin(origin).await,
                Err(_) => false,
            }
        }
    });

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| {
            Method::from_bytes(m.as_bytes())
                .inspect_err(|_| warn!(method = %m, "Ignoring invalid CORS method"))
                .ok()
        })
        .collect();
    let allowed_headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| {
            HeaderName::from_bytes(h.as_bytes())
                .inspect_err(|_| warn!(header = %h, "Ignoring invalid CORS header"))
                .ok()
        })
        .collect();
    let exposed: Vec<HeaderName> = headers::ALL
        .iter()
        .map(|&name| HeaderName::from_static(name))
        .chain(std::iter::once(REQUEST_ID_HEADER.clone()))
        .collect();

    CorsLayer::new()
        .allow_origin(origin_check)
        .allow_methods(methods)
        .allow_headers(allowed_headers)
        .expose_headers(exposed)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::fixture;
    use axum::http::{Response, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(router: Router, request: Request<Body>) -> (Response<Body>, Value) {
        let response = router.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (Response::from_parts(parts, Body::empty()), json)
    }

    fn get_on(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    fn header_of<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_health_skips_tenant_resolution() {
        let f = fixture();
        let (response, body) = send(
            create_router(f.state),
            get_on("unknown.example.com", "/health"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_super_admin_host() {
        let f = fixture();
        let (response, body) = send(
            create_router(f.state),
            get_on("ibuyscrap.ca", "/api/v1/tenant/context"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_of(&response, "x-is-super-admin"), Some("true"));
        assert_eq!(header_of(&response, "x-resolution-method"), Some("super_admin"));
        assert_eq!(body["data"]["is_super_admin"], true);
        assert!(body["data"]["tenant_id"].is_null());
    }

    #[tokio::test]
    async fn test_tenant_host() {
        let f = fixture();
        let (response, body) = send(
            create_router(f.state),
            get_on("acme.example.com", "/api/v1/tenant/context"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_of(&response, "x-tenant-name"), Some("Acme"));
        assert_eq!(header_of(&response, "x-tenant-id"), Some(f.acme.to_string().as_str()));
        assert_eq!(header_of(&response, "x-tenant-domain"), Some("acme.example.com"));
        assert!(header_of(&response, "x-resolution-time").is_some_and(|v| v.ends_with("ms")));
        assert_eq!(body["data"]["tenant_name"], "Acme");
    }

    #[tokio::test]
    async fn test_unknown_host_is_generic_400() {
        let f = fixture();
        let request = Request::builder()
            .uri("/api/v1/tenant/context")
            .header(header::HOST, "unknown.example.com")
            .header("x-request-id", "trace-42")
            .body(Body::empty())
            .unwrap();
        let (response, body) = send(create_router(f.state), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_DOMAIN");
        assert_eq!(body["request_id"], "trace-42");
        assert!(!body["message"].as_str().unwrap().contains("unknown.example.com"));
        assert_eq!(header_of(&response, "x-request-id"), Some("trace-42"));
    }

    #[tokio::test]
    async fn test_suspended_host_is_403_without_tenant_data() {
        let f = fixture();
        let (response, body) = send(
            create_router(f.state),
            get_on("suspended-tenant.com", "/api/v1/tenant/context"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "TENANT_SUSPENDED");
        assert!(!response.headers().contains_key("x-tenant-id"));
        assert!(!response.headers().contains_key("x-tenant-name"));
    }

    #[tokio::test]
    async fn test_spoofed_advisory_headers_are_ignored() {
        let f = fixture();
        let request = Request::builder()
            .uri("/api/v1/tenant/context")
            .header(header::HOST, "acme.example.com")
            .header("x-is-super-admin", "true")
            .header("x-tenant-id", f.maple.to_string())
            .body(Body::empty())
            .unwrap();
        let (response, body) = send(create_router(f.state), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["data"]["is_super_admin"], false);
        assert_eq!(body["data"]["tenant_id"], f.acme.to_string());
        assert!(!response.headers().contains_key("x-is-super-admin"));
    }

    #[tokio::test]
    async fn test_cross_tenant_access() {
        let f = fixture();
        let router = create_router(f.state);

        let own = format!("/api/v1/tenant/access/{}", f.acme);
        let (response, _) = send(router.clone(), get_on("acme.example.com", &own)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let other = format!("/api/v1/tenant/access/{}", f.maple);
        let (response, body) = send(router.clone(), get_on("acme.example.com", &other)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "CROSS_TENANT_ACCESS_DENIED");

        let (response, body) = send(router.clone(), get_on("localhost:5173", &other)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["data"]["bypass"], true);

        let (response, body) = send(router, get_on("api.ibuyscrap.ca", &other)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "MISSING_TENANT_CONTEXT");
    }

    #[tokio::test]
    async fn test_malformed_tenant_id_is_400() {
        let f = fixture();
        let (response, _) = send(
            create_router(f.state),
            get_on("acme.example.com", "/api/v1/tenant/access/not-a-uuid"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_require_super_admin() {
        let f = fixture();
        let router = create_router(f.state);

        let (response, _) = send(
            router.clone(),
            get_on("acme.example.com", "/api/v1/admin/trusted-domains"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/admin/trusted-domains/refresh")
            .header(header::HOST, "ibuyscrap.ca")
            .body(Body::empty())
            .unwrap();
        let (response, body) = send(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let origins: Vec<&str> = body["data"]["origins"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(origins.contains(&"https://acme.example.com"));
        assert!(origins.contains(&"http://maple.example.com"));
        assert!(!origins.contains(&"https://suspended-tenant.com"));
        assert_eq!(body["data"]["stats"]["rebuilds"], 1);
    }

    #[tokio::test]
    async fn test_cors_uses_trusted_domains() {
        let f = fixture();
        let router = create_router(f.state);

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/tenant/context")
                .header(header::HOST, "acme.example.com")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap()
        };

        let (response, _) = send(router.clone(), preflight("https://acme.example.com")).await;
        assert_eq!(
            header_of(&response, "access-control-allow-origin"),
            Some("https://acme.example.com")
        );

        let (response, _) = send(router, preflight("https://evil.example.com")).await;
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_new_tenant_served_after_insert() {
        let f = fixture();
        f.store
            .insert(portal_core::data::Tenant::new("Late", "late.example.com"))
            .unwrap();
        let (response, _) = send(
            create_router(f.state),
            get_on("late.example.com", "/api/v1/tenant/context"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_of(&response, "x-tenant-name"), Some("Late"));
    }
}

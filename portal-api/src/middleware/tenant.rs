//! Tenant resolution middleware.
//!
//! Resolves the request host, stores the [`TenantContext`] in the request
//! extensions and writes advisory headers on the response. Client-supplied
//! copies of those headers are dropped before handlers run.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header::HOST},
    middleware::Next,
    response::Response,
};
use portal_tenancy::TenantContext;
use portal_tenancy::context::headers;
use std::sync::Arc;
use tracing::{Span, debug, field};

use super::RequestId;
use crate::error::ApiError;
use crate::state::AppState;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Tenant resolution middleware function.
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(RequestId::generate);

    for name in headers::ALL {
        request.headers_mut().remove(name);
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()));
    let forwarded = request
        .headers()
        .get(FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let resolution = tokio::time::timeout(
        state.config.resolution_timeout(),
        state
            .resolver()
            .resolve(host.as_deref(), forwarded.as_deref()),
    )
    .await;

    let result = match resolution {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => return ApiError::from(e).into_response_with(Some(request_id.as_str())),
        Err(_) => {
            return ApiError::ResolutionTimeout(state.config.resolution_timeout_ms)
                .into_response_with(Some(request_id.as_str()));
        }
    };

    if let Some(tenant_id) = result.tenant_id() {
        Span::current().record("tenant_id", field::display(tenant_id));
    }

    let context = TenantContext::from_resolution(&result, request_id.as_str());
    let advisory = context.advisory_headers();
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    for (name, value) in advisory {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(_) => debug!(header = name, "Skipping advisory header with non-ASCII value"),
        }
    }
    response
}

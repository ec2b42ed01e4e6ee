//! Operator handlers for the trusted-domain snapshot.

use axum::extract::State;
use portal_tenancy::{TrustedDomainSnapshot, TrustedDomainStats};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::SuperAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Trusted-domain snapshot listing.
#[derive(Debug, Serialize)]
pub struct TrustedDomainsResponse {
    /// Sorted origins
    pub origins: Vec<String>,
    /// Cache counters
    pub stats: TrustedDomainStats,
}

fn sorted_origins(snapshot: &TrustedDomainSnapshot) -> Vec<String> {
    let mut origins: Vec<String> = snapshot.origins().map(ToString::to_string).collect();
    origins.sort_unstable();
    origins
}

/// Lists trusted origins, rebuilding the snapshot if stale.
///
/// GET /api/v1/admin/trusted-domains
pub async fn list_trusted_domains(
    State(state): State<Arc<AppState>>,
    SuperAdmin(context): SuperAdmin,
) -> ApiResponse<TrustedDomainsResponse> {
    let snapshot = state.trusted().get().await;
    ApiResponse::success(TrustedDomainsResponse {
        origins: sorted_origins(&snapshot),
        stats: state.trusted().stats(),
    })
    .with_request_id(context.request_id())
}

/// Clears the resolution cache and forces a snapshot rebuild.
///
/// POST /api/v1/admin/trusted-domains/refresh
pub async fn refresh_trusted_domains(
    State(state): State<Arc<AppState>>,
    SuperAdmin(context): SuperAdmin,
) -> ApiResult<ApiResponse<TrustedDomainsResponse>> {
    let snapshot = state.resolver().refresh_caches(true).await?;
    info!(
        origins = snapshot.len(),
        request_id = context.request_id(),
        "Trusted domains refreshed by operator"
    );
    Ok(ApiResponse::success(TrustedDomainsResponse {
        origins: sorted_origins(&snapshot),
        stats: state.trusted().stats(),
    })
    .with_message("Trusted domains refreshed")
    .with_request_id(context.request_id()))
}

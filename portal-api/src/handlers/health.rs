//! Health check handler.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Trusted-domain snapshot status
    pub trusted_domains: TrustedDomainsHealth,
}

/// Trusted-domain snapshot status.
#[derive(Debug, Serialize)]
pub struct TrustedDomainsHealth {
    /// Origins in the snapshot
    pub origins: usize,
    /// Snapshot age in seconds, absent if never built
    pub age_secs: Option<u64>,
}

/// Health check handler.
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.trusted().peek();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
        trusted_domains: TrustedDomainsHealth {
            origins: snapshot.len(),
            age_secs: snapshot.age().map(|age| age.as_secs()),
        },
    })
}

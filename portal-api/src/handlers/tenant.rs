//! Tenant context handlers.

use axum::extract::{Path, State};
use portal_core::types::TenantId;
use portal_tenancy::{DataOperation, TenantContextView};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extract::{CurrentTenant, RequireTenant};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Returns the resolved context of the current request.
///
/// GET /api/v1/tenant/context
pub async fn get_context(
    CurrentTenant(context): CurrentTenant,
) -> ApiResponse<TenantContextView> {
    let request_id = context.request_id().to_string();
    ApiResponse::success(context.view()).with_request_id(request_id)
}

/// Access decision for one tenant's data.
#[derive(Debug, Serialize)]
pub struct AccessDecision {
    /// Tenant whose data was requested
    pub tenant_id: TenantId,
    /// Always true; denials are returned as errors
    pub allowed: bool,
    /// True if allowed through super-admin bypass
    pub bypass: bool,
}

/// Checks whether the current request may read `tenant_id`'s data.
///
/// GET /api/v1/tenant/access/{tenant_id}
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    RequireTenant { context, isolation }: RequireTenant,
    Path(tenant_id): Path<String>,
) -> ApiResult<ApiResponse<AccessDecision>> {
    let tenant_id: TenantId = tenant_id
        .parse()
        .map_err(|_| ApiError::BadRequest("tenant_id must be a UUID".to_string()))?;

    let scope = state
        .enforcer()
        .authorize(
            Some(&isolation),
            DataOperation::read("tenant_data").for_tenant(tenant_id),
        )?;

    Ok(ApiResponse::success(AccessDecision {
        tenant_id,
        allowed: true,
        bypass: scope.is_bypass(),
    })
    .with_request_id(context.request_id()))
}

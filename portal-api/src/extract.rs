//! Extractors for the resolved tenant context.
//!
//! All three require the tenant middleware on the route; without it they
//! fail closed.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};
use portal_tenancy::{IsolationContext, TenancyError, TenantContext};

use crate::error::ApiError;
use crate::middleware::RequestId;

fn context_from(parts: &Parts, operation: &str) -> Result<TenantContext, Response> {
    parts.extensions.get::<TenantContext>().cloned().ok_or_else(|| {
        reject(
            parts,
            ApiError::from(TenancyError::missing_context(operation)),
        )
    })
}

fn reject(parts: &Parts, error: ApiError) -> Response {
    let request_id = parts.extensions.get::<RequestId>().map(RequestId::as_str);
    error.into_response_with(request_id)
}

/// Any resolved context: tenant, super-admin, or API domain.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantContext);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        context_from(parts, "read tenant context").map(Self)
    }
}

/// A tenant or super-admin context with its isolation constraint.
#[derive(Debug, Clone)]
pub struct RequireTenant {
    /// The resolved context.
    pub context: TenantContext,
    /// Constraint to pass to the isolation enforcer.
    pub isolation: IsolationContext,
}

impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operation = format!("{} {}", parts.method, parts.uri.path());
        let context = context_from(parts, &operation)?;
        let isolation = context
            .require_tenant_context(&operation)
            .map_err(|e| reject(parts, e.into()))?;
        Ok(Self { context, isolation })
    }
}

/// A super-admin context.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub TenantContext);

impl<S> FromRequestParts<S> for SuperAdmin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = context_from(parts, "admin")?;
        if context.is_super_admin() {
            Ok(Self(context))
        } else {
            Err(reject(
                parts,
                ApiError::Forbidden("Operator access required".to_string()),
            ))
        }
    }
}

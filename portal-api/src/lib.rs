//! # Portal API
//!
//! HTTP surface for the immigration portal's tenancy layer, built on Axum.
//!
//! Every request under `/api/v1` passes through the tenant middleware, which
//! resolves the request host with
//! [`TenantResolver`](portal_tenancy::TenantResolver) and stores a
//! [`TenantContext`](portal_tenancy::TenantContext) in the request
//! extensions. Handlers read it through the [`extract`] types.
//!
//! - `GET /health` - liveness, outside tenant resolution
//! - `GET /api/v1/tenant/context` - the resolved context
//! - `GET /api/v1/tenant/access/{tenant_id}` - isolation check
//! - `GET /api/v1/admin/trusted-domains` - trusted-domain snapshot (super-admin)
//! - `POST /api/v1/admin/trusted-domains/refresh` - forced rebuild (super-admin)
//!
//! CORS origins are checked against the trusted-domain snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ApiConfig, CorsConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::ApiServer;
pub use state::AppState;

//! Identifier newtypes.
//!
//! - [`TenantId`] - Opaque tenant identity

mod tenant_id;

pub use tenant_id::TenantId;

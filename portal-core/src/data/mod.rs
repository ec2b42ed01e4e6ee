//! Tenant records as read by the resolution pipeline.

mod tenant;

pub use tenant::{Tenant, TenantBranding, TenantLimits, TenantSettings, TenantStatus};

//! Tenancy error types.
//!
//! Three families, handled differently by callers:
//! - rejections (`InvalidDomain`, `TenantSuspended`, `TenantCancelled`,
//!   `TenantTrialExpired`) end the request with a 4xx
//! - infrastructure faults (`StoreUnavailable`, `LookupTimeout`) end it with
//!   a generic 5xx
//! - isolation violations (`MissingTenantContext`, `CrossTenantAccessDenied`)
//!   abort the data operation and are logged at error level

use chrono::{DateTime, Utc};
use portal_core::error::{ErrorSeverity, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving a tenant or enforcing isolation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenancyError {
    /// Host missing, oversized, malformed, or owned by no tenant.
    #[error("Invalid domain: {reason}")]
    InvalidDomain {
        /// Internal reason; not for clients.
        reason: String,
    },

    /// The resolved tenant is suspended.
    #[error("Tenant suspended: {tenant_id}")]
    TenantSuspended {
        /// Suspended tenant.
        tenant_id: String,
    },

    /// The resolved tenant is cancelled.
    #[error("Tenant cancelled: {tenant_id}")]
    TenantCancelled {
        /// Cancelled tenant.
        tenant_id: String,
    },

    /// The resolved tenant's trial has ended.
    #[error("Tenant trial expired: {tenant_id} (ended {ended_at})")]
    TenantTrialExpired {
        /// Tenant whose trial ended.
        tenant_id: String,
        /// When the trial ended.
        ended_at: DateTime<Utc>,
    },

    /// The tenant store failed.
    #[error("Tenant store unavailable: {reason}")]
    StoreUnavailable {
        /// Underlying store failure.
        reason: String,
    },

    /// A tenant store call exceeded its time budget.
    #[error("Tenant store {operation} timed out after {timeout_ms}ms")]
    LookupTimeout {
        /// Store operation that timed out.
        operation: String,
        /// Budget in milliseconds.
        timeout_ms: u64,
    },

    /// A tenant-scoped operation ran without a tenant or super-admin context.
    #[error("Missing tenant context for {operation}")]
    MissingTenantContext {
        /// Operation that was refused.
        operation: String,
    },

    /// An operation targeted another tenant's data.
    #[error("Cross-tenant access denied: tenant {enforced} attempted {operation} on tenant {requested}")]
    CrossTenantAccessDenied {
        /// Tenant the request is confined to.
        enforced: String,
        /// Tenant the operation targeted, or `*` for an unfiltered operation.
        requested: String,
        /// Operation that was refused.
        operation: String,
    },
}

impl TenancyError {
    /// Creates an invalid domain error.
    #[must_use]
    pub fn invalid_domain(reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            reason: reason.into(),
        }
    }

    /// Creates a store unavailable error.
    #[must_use]
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a missing tenant context error.
    #[must_use]
    pub fn missing_context(operation: impl Into<String>) -> Self {
        Self::MissingTenantContext {
            operation: operation.into(),
        }
    }

    /// Returns true for domain and lifecycle rejections.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidDomain { .. }
                | Self::TenantSuspended { .. }
                | Self::TenantCancelled { .. }
                | Self::TenantTrialExpired { .. }
        )
    }

    /// Returns true for tenant store faults.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::LookupTimeout { .. }
        )
    }

    /// Returns true for isolation violations.
    #[must_use]
    pub const fn is_isolation_violation(&self) -> bool {
        matches!(
            self,
            Self::MissingTenantContext { .. } | Self::CrossTenantAccessDenied { .. }
        )
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub const fn severity(&self) -> ErrorSeverity {
        if self.is_isolation_violation() {
            ErrorSeverity::Fatal
        } else if self.is_infrastructure() {
            ErrorSeverity::Recoverable
        } else {
            ErrorSeverity::Info
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDomain { .. } => "INVALID_DOMAIN",
            Self::TenantSuspended { .. } => "TENANT_SUSPENDED",
            Self::TenantCancelled { .. } => "TENANT_CANCELLED",
            Self::TenantTrialExpired { .. } => "TENANT_TRIAL_EXPIRED",
            Self::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            Self::LookupTimeout { .. } => "LOOKUP_TIMEOUT",
            Self::MissingTenantContext { .. } => "MISSING_TENANT_CONTEXT",
            Self::CrossTenantAccessDenied { .. } => "CROSS_TENANT_ACCESS_DENIED",
        }
    }
}

impl From<StoreError> for TenancyError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable {
            reason: error.to_string(),
        }
    }
}

/// Result type for tenancy operations.
pub type Result<T> = std::result::Result<T, TenancyError>;

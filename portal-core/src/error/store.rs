//! Tenant store error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults raised by a tenant store backend.
///
/// These never describe "no such tenant"; absence is an `Ok(None)` from the
/// store. Messages may contain backend details and must not be shown to
/// clients.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    /// The backend could not be reached or returned an I/O failure.
    #[error("[Store] {backend} unavailable: {reason}")]
    Unavailable {
        /// Backend name.
        backend: String,
        /// Underlying failure.
        reason: String,
    },

    /// A write would give one domain to two tenants.
    #[error("[Store] Domain '{domain}' already belongs to tenant {owner}")]
    DomainConflict {
        /// The contested domain.
        domain: String,
        /// Identifier of the current owner.
        owner: String,
    },

    /// A stored record could not be decoded.
    #[error("[Store] Corrupt record: {reason}")]
    Corrupt {
        /// Decoding failure.
        reason: String,
    },
}

impl StoreError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::Unavailable { .. } => ErrorSeverity::Recoverable,
            Self::DomainConflict { .. } => ErrorSeverity::Warning,
            Self::Corrupt { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for transient faults worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

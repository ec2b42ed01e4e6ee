//! Error types and handling framework.
//!
//! - `PortalError` - Top-level error type
//!   - `ConfigError` - Configuration loading and validation errors
//!   - `StoreError` - Tenant store faults
//!
//! Each error reports an [`ErrorSeverity`] so callers can decide between
//! aborting, retrying, or logging and carrying on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// # Examples
///
/// ```
/// use portal_core::error::ErrorSeverity;
///
/// let severity = ErrorSeverity::Recoverable;
/// assert!(severity.is_recoverable());
/// assert!(!severity.is_fatal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable; the process or request cannot continue.
    Fatal,
    /// The operation failed but may succeed on retry or via a fallback.
    #[default]
    Recoverable,
    /// Degraded behaviour worth logging.
    Warning,
    /// Expected condition, not a fault.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod config;
mod store;

pub use config::ConfigError;
pub use store::StoreError;

/// Top-level error type for the portal core.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalError {
    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Tenant store error.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl PortalError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(e) => e.severity(),
            Self::Store(e) => e.severity(),
        }
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_flags() {
        assert!(ErrorSeverity::Fatal.is_fatal());
        assert!(!ErrorSeverity::Fatal.is_recoverable());
        assert!(ErrorSeverity::Warning.is_recoverable());
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
    }

    #[test]
    fn test_portal_error_delegates() {
        let err: PortalError = ConfigError::missing_field("tenancy.api_domain").into();
        assert_eq!(err.category(), "config");
        assert!(err.severity().is_fatal());

        let err: PortalError = StoreError::unavailable("memory", "connection refused").into();
        assert_eq!(err.category(), "store");
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
    }
}

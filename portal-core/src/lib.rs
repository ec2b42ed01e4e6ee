//! # Portal Core
//!
//! Shared building blocks for the immigration portal's tenancy layer.
//!
//! This crate provides:
//! - Tenant identity and the tenant record model
//! - The `TenantStore` trait the resolution pipeline reads through
//! - Error types with severity classification
//! - Configuration loading (YAML/TOML/JSON) with validation and environment overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]

/// Identifier newtypes
pub mod types;

/// Tenant records
pub mod data;

/// Error types and handling
pub mod error;

/// Collaborator trait definitions
pub mod traits;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::{ConfigError, ErrorSeverity, PortalError, StoreError};
    pub use crate::traits::*;
    pub use crate::types::*;
}

//! # Portal Tenancy
//!
//! Tenant resolution and request isolation for the immigration portal.
//!
//! Every inbound request passes through [`TenantResolver::resolve`], which
//! turns the request host into a [`ResolutionResult`]:
//!
//! 1. [`DomainParser`] normalizes the host and classifies it as a super-admin
//!    domain, the API domain, or a tenant candidate.
//! 2. [`TenantDirectory`] runs its ordered lookup strategies (exact domain,
//!    then the legacy `<prefix>.<name>.<apex>` pattern) against the
//!    [`TenantStore`](portal_core::traits::TenantStore).
//! 3. [`TenantValidator`] rejects suspended, cancelled and expired-trial tenants.
//!
//! The result becomes a read-only [`TenantContext`] for handlers, and an
//! [`IsolationContext`] that the [`IsolationEnforcer`] checks on every
//! tenant-scoped data operation. The [`TrustedDomainCache`] keeps the set of
//! tenant origins used for CORS.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use portal_core::data::Tenant;
//! use portal_tenancy::{InMemoryTenantStore, TenancyConfig, TenantResolver, TrustedDomainCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TenancyConfig::default();
//! let store = Arc::new(InMemoryTenantStore::new());
//! store.insert(Tenant::new("Acme", "acme.example.com"))?;
//!
//! let trusted = Arc::new(TrustedDomainCache::new(store.clone(), &config));
//! let resolver = TenantResolver::new(&config, store, trusted);
//!
//! let result = resolver.resolve_host("acme.example.com:443").await?;
//! assert_eq!(result.tenant().map(|t| t.name()), Some("Acme"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Error types for tenant resolution and isolation
pub mod error;

/// Tenancy configuration section
pub mod config;

/// Host normalization and classification
pub mod domain;

/// Tenant store implementations
pub mod store;

/// Trusted-domain snapshot for CORS
pub mod trusted;

/// Domain-to-tenant lookup strategies
pub mod directory;

/// Tenant lifecycle validation
pub mod validator;

/// Resolution results
pub mod resolution;

/// Resolution orchestrator
pub mod resolver;

/// Data-access isolation
pub mod isolation;

/// Per-request tenant context
pub mod context;

pub use config::{TenancyConfig, TrustedDomainsConfig};
pub use context::{TenantContext, TenantContextView};
pub use directory::{DirectoryHit, LookupOutcome, LookupStrategy, TenantDirectory};
pub use domain::{DomainClass, DomainParser, ParsedDomain};
pub use error::{Result, TenancyError};
pub use isolation::{
    DataOperation, IsolationContext, IsolationEnforcer, OperationKind, ScopedOperation,
    TenantFilter, TenantOwned,
};
pub use resolution::{ResolutionMethod, ResolutionResult, ResolutionScope};
pub use resolver::TenantResolver;
pub use store::InMemoryTenantStore;
pub use trusted::{TrustedDomainCache, TrustedDomainSnapshot, TrustedDomainSource, TrustedDomainStats};
pub use validator::TenantValidator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::*;
    pub use crate::error::*;
    pub use crate::isolation::*;
    pub use crate::resolution::*;
    pub use crate::resolver::*;
    pub use crate::trusted::*;
}

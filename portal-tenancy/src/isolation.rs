//! Data-access isolation.
//!
//! Every tenant-scoped storage call takes a [`ScopedOperation`], and the only
//! way to obtain one is [`IsolationEnforcer::authorize`]. A handler that
//! forgets the tenant filter, or passes another tenant's id, is stopped here
//! instead of at the router.

use portal_core::types::TenantId;
use serde::Serialize;
use tracing::error;

use crate::error::{Result, TenancyError};

/// Tenant constraint applied to all data access during one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationContext {
    enforced: Option<TenantId>,
    bypass: bool,
}

impl IsolationContext {
    /// Context pinned to one tenant.
    #[must_use]
    pub const fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            enforced: Some(tenant_id),
            bypass: false,
        }
    }

    /// Operator context that may touch any tenant.
    #[must_use]
    pub const fn super_admin() -> Self {
        Self {
            enforced: None,
            bypass: true,
        }
    }

    /// The enforced tenant, `None` for super-admin.
    #[must_use]
    pub const fn enforced(&self) -> Option<TenantId> {
        self.enforced
    }

    /// Returns true for super-admin contexts.
    #[must_use]
    pub const fn bypass(&self) -> bool {
        self.bypass
    }
}

/// Kind of data operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Single-record read.
    Read,
    /// Collection read.
    List,
    /// Insert.
    Create,
    /// Modification.
    Update,
    /// Removal.
    Delete,
}

impl OperationKind {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Tenant filter requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantFilter {
    /// Use the request's tenant.
    Inherit,
    /// Target a specific tenant.
    Explicit(TenantId),
    /// No tenant filter. Super-admin only.
    Unfiltered,
}

/// A data operation before authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataOperation {
    kind: OperationKind,
    resource: String,
    filter: TenantFilter,
}

impl DataOperation {
    fn new(kind: OperationKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
            filter: TenantFilter::Inherit,
        }
    }

    /// Reads one record of `resource`.
    #[must_use]
    pub fn read(resource: impl Into<String>) -> Self {
        Self::new(OperationKind::Read, resource)
    }

    /// Lists records of `resource`.
    #[must_use]
    pub fn list(resource: impl Into<String>) -> Self {
        Self::new(OperationKind::List, resource)
    }

    /// Creates a record of `resource`.
    #[must_use]
    pub fn create(resource: impl Into<String>) -> Self {
        Self::new(OperationKind::Create, resource)
    }

    /// Updates a record of `resource`.
    #[must_use]
    pub fn update(resource: impl Into<String>) -> Self {
        Self::new(OperationKind::Update, resource)
    }

    /// Deletes a record of `resource`.
    #[must_use]
    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete, resource)
    }

    /// Targets `tenant_id` explicitly.
    #[must_use]
    pub fn for_tenant(mut self, tenant_id: TenantId) -> Self {
        self.filter = TenantFilter::Explicit(tenant_id);
        self
    }

    /// Drops the tenant filter.
    #[must_use]
    pub fn unfiltered(mut self) -> Self {
        self.filter = TenantFilter::Unfiltered;
        self
    }

    /// Operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Resource name, e.g. `cases`.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Requested tenant filter.
    #[must_use]
    pub fn filter(&self) -> TenantFilter {
        self.filter
    }

    fn label(&self) -> String {
        format!("{} {}", self.kind.as_str(), self.resource)
    }
}

/// An authorized operation. `tenant_id()` is the filter storage must apply;
/// `None` only for super-admin bypass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedOperation {
    kind: OperationKind,
    resource: String,
    tenant_id: Option<TenantId>,
    bypass: bool,
}

impl ScopedOperation {
    /// Authorized operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Authorized resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Tenant filter to apply, `None` for an unfiltered super-admin operation.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Returns true if authorized through super-admin bypass.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.bypass
    }
}

/// Records that belong to one tenant.
pub trait TenantOwned {
    /// Tenant owning the record.
    fn owner_tenant_id(&self) -> TenantId;
}

/// Checks data operations against the request's [`IsolationContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolationEnforcer;

impl IsolationEnforcer {
    /// Creates an enforcer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Authorizes `operation` under `context`.
    pub fn authorize(
        &self,
        context: Option<&IsolationContext>,
        operation: DataOperation,
    ) -> Result<ScopedOperation> {
        let Some(context) = context else {
            return Err(Self::violation(TenancyError::missing_context(operation.label())));
        };

        if context.bypass {
            let tenant_id = match operation.filter {
                TenantFilter::Explicit(id) => Some(id),
                TenantFilter::Inherit | TenantFilter::Unfiltered => None,
            };
            return Ok(ScopedOperation {
                kind: operation.kind,
                resource: operation.resource,
                tenant_id,
                bypass: true,
            });
        }

        let Some(enforced) = context.enforced else {
            return Err(Self::violation(TenancyError::missing_context(operation.label())));
        };

        match operation.filter {
            TenantFilter::Inherit => {}
            TenantFilter::Explicit(requested) if requested == enforced => {}
            TenantFilter::Explicit(requested) => {
                return Err(Self::violation(TenancyError::CrossTenantAccessDenied {
                    enforced: enforced.to_string(),
                    requested: requested.to_string(),
                    operation: operation.label(),
                }));
            }
            TenantFilter::Unfiltered => {
                return Err(Self::violation(TenancyError::CrossTenantAccessDenied {
                    enforced: enforced.to_string(),
                    requested: "*".to_string(),
                    operation: operation.label(),
                }));
            }
        }

        Ok(ScopedOperation {
            kind: operation.kind,
            resource: operation.resource,
            tenant_id: Some(enforced),
            bypass: false,
        })
    }

    /// Verifies a fetched record belongs to the scope it was fetched under.
    pub fn check_owned<T: TenantOwned>(&self, scope: &ScopedOperation, record: &T) -> Result<()> {
        match scope.tenant_id {
            Some(expected) if record.owner_tenant_id() != expected => {
                Err(Self::violation(TenancyError::CrossTenantAccessDenied {
                    enforced: expected.to_string(),
                    requested: record.owner_tenant_id().to_string(),
                    operation: format!("{} {}", scope.kind.as_str(), scope.resource),
                }))
            }
            Some(_) => Ok(()),
            None if scope.bypass => Ok(()),
            None => Err(Self::violation(TenancyError::missing_context(
                scope.resource.clone(),
            ))),
        }
    }

    /// Drops records outside the scope, logging each one.
    pub fn retain_owned<T: TenantOwned>(&self, scope: &ScopedOperation, records: &mut Vec<T>) {
        records.retain(|record| self.check_owned(scope, record).is_ok());
    }

    fn violation(error: TenancyError) -> TenancyError {
        error!(code = error.code(), error = %error, "Tenant isolation violation");
        error
    }
}

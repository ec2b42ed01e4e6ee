//! Tenant store implementations and call helpers.

mod memory;

pub use memory::InMemoryTenantStore;

use crate::error::{Result, TenancyError};
use portal_core::error::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::Instrument;

/// Runs a store call under `timeout`, mapping both failure kinds to
/// [`TenancyError`].
pub(crate) async fn bounded<T, F>(
    backend: &'static str,
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StoreError>>,
{
    let span = portal_telemetry::spans::store_span(backend, operation);
    match tokio::time::timeout(timeout, call).instrument(span).await {
        Ok(result) => result.map_err(TenancyError::from),
        Err(_) => Err(TenancyError::LookupTimeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

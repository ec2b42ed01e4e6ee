//! API middleware components.
//!
//! - Request ID generation and propagation
//! - Tenant resolution

mod request_id;
pub mod tenant;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer};
pub use tenant::resolve_tenant;

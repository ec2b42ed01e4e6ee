//! Collaborator trait definitions.
//!
//! - store - Read access to tenant records used by domain resolution

mod store;

pub use store::{NameMatch, TenantStore};

//! Configuration management module.
//!
//! - YAML, TOML and JSON configuration files, picked by extension
//! - Validation with the failing field's dotted path in the message
//! - `PORTAL_*` environment variable overrides applied after parsing
//!
//! # Example
//!
//! ```rust,ignore
//! use portal_core::config::{ConfigLoader, PortalConfig};
//!
//! let config: PortalConfig = ConfigLoader::new()
//!     .with_env_prefix("PORTAL")
//!     .load("portal.yaml")?;
//! ```

mod loader;
mod portal_config;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use portal_config::{LogRotation, LoggingConfig, PortalConfig, StoreBackend, StoreConfig};
pub use traits::{Configurable, Validatable};
pub use validation::{EnvOverride, ValidationContext, ValidationResult, Validator};

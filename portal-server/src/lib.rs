//! # Portal Server
//!
//! Process entry point for the immigration portal's tenancy service.
//!
//! - Configuration loading and validation
//! - Logging initialization
//! - Tenant store construction and trusted-domain warm-up
//! - API server startup with graceful shutdown

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerSection, ShutdownConfig};
pub use server::{PortalServer, ServerError, ServerState};
pub use shutdown::ShutdownController;

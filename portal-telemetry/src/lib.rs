//! # Portal Telemetry
//!
//! Structured logging and tracing spans for the immigration portal.
//!
//! - JSON or pretty output through `tracing-subscriber`
//! - Stdout and rolling-file targets through `tracing-appender`
//! - Span helpers for request handling, tenant resolution and cache refreshes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Span definitions for request tracing
pub mod spans;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::spans::*;
}

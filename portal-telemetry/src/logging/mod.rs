//! Structured logging for the portal.
//!
//! Every component logs through `tracing` macros; this module installs the
//! global subscriber once at process start.

mod config;

pub use config::{LogConfig, LogFormat, LogOutput};

use portal_core::config::LogRotation;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "portal.log";

/// Initialize the logging system with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level`. The returned guards flush
/// file output when dropped and must be held until shutdown.
///
/// # Example
///
/// ```no_run
/// use portal_telemetry::logging::{init_logging, LogConfig};
///
/// let _guards = init_logging(&LogConfig::default()).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    if config.outputs.is_empty() {
        return Err(LoggingError::InvalidConfig(
            "no log outputs configured".to_string(),
        ));
    }

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))?,
    };

    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<_> + Send + Sync>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => layers.push(stdout_layer(config)),
            LogOutput::File { path, rotation } => {
                let (layer, guard) = file_layer(config, path, *rotation)?;
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.include_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn stdout_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    }
}

fn file_layer<S>(
    config: &LogConfig,
    path: &str,
    rotation: Option<LogRotation>,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard), LoggingError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    std::fs::create_dir_all(path)?;

    let appender = match rotation.unwrap_or_default() {
        LogRotation::Hourly => tracing_appender::rolling::hourly(path, LOG_FILE_PREFIX),
        LogRotation::Daily => tracing_appender::rolling::daily(path, LOG_FILE_PREFIX),
        LogRotation::Never => tracing_appender::rolling::never(path, LOG_FILE_PREFIX),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // Files are always JSON so they can be shipped regardless of the console format.
    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config))
        .json()
        .flatten_event(true)
        .boxed();

    Ok((layer, guard))
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

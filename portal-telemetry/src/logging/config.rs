//! Logging configuration types.

use portal_core::config::{LogRotation, LoggingConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level or `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Include thread IDs in log output
    #[serde(default)]
    pub include_thread_id: bool,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,

    /// Emit span close events with timing
    #[serde(default)]
    pub include_span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
            include_span_events: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        let mut outputs = Vec::new();
        if config.stdout_enabled {
            outputs.push(LogOutput::Stdout);
        }
        if let Some(directory) = &config.directory {
            outputs.push(LogOutput::File {
                path: directory.clone(),
                rotation: Some(config.rotation),
            });
        }

        Self {
            level: config.level.clone(),
            format: if config.format.eq_ignore_ascii_case("pretty") {
                LogFormat::Pretty
            } else {
                LogFormat::Json
            },
            outputs,
            ..Self::default()
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines for log aggregation
    #[default]
    Json,
    /// Human-readable format for development
    Pretty,
}

/// Log output target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to rolling files in a directory
    File {
        /// Directory path for log files
        path: String,
        /// Rotation period, daily when unset
        rotation: Option<LogRotation>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.outputs, [LogOutput::Stdout]);
    }

    #[test]
    fn test_from_portal_logging_config() {
        let portal = LoggingConfig {
            level: "debug,portal_tenancy=trace".to_string(),
            format: "Pretty".to_string(),
            directory: Some("/var/log/portal".to_string()),
            rotation: LogRotation::Hourly,
            stdout_enabled: false,
        };

        let config = LogConfig::from(&portal);
        assert_eq!(config.level, "debug,portal_tenancy=trace");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(
            config.outputs,
            [LogOutput::File {
                path: "/var/log/portal".to_string(),
                rotation: Some(LogRotation::Hourly),
            }]
        );
    }

    #[test]
    fn test_output_serialization() {
        let json = serde_json::to_string(&LogOutput::File {
            path: "./logs".to_string(),
            rotation: Some(LogRotation::Daily),
        })
        .unwrap();
        assert!(json.contains(r#""type":"file""#));

        let parsed: LogOutput = serde_json::from_str(r#"{"type":"stdout"}"#).unwrap();
        assert_eq!(parsed, LogOutput::Stdout);
    }
}

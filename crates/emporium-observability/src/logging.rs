//! Subscriber setup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter};

use crate::ObservabilityError;

/// Minimum level for the default filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ObservabilityError::InvalidLevel(other.to_string())),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation.
    Json,
    /// Human-readable (for development).
    #[default]
    Human,
}

/// Logging section of the application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    /// Extra `EnvFilter` directives appended after the level,
    /// e.g. `"sqlx=warn,emporium_commerce=debug"`.
    #[serde(default)]
    pub directives: Option<String>,
}

impl LogConfig {
    /// The filter string built from this config.
    pub fn filter_directives(&self) -> String {
        match self.directives.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{},{}", self.level, extra),
            _ => self.level.to_string(),
        }
    }

    /// Parse the configured filter.
    pub fn env_filter(&self) -> Result<EnvFilter, ObservabilityError> {
        EnvFilter::try_new(self.filter_directives())
            .map_err(|e| ObservabilityError::InvalidFilter(e.to_string()))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set and valid, takes precedence over the configured filter.
pub fn init(config: &LogConfig) -> Result<(), ObservabilityError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.env_filter()?,
    };

    let json = config.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt_layer::layer().json().with_current_span(true)))
        .with((!json).then(|| fmt_layer::layer().with_target(true)))
        .try_init()
        .map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %config.filter_directives(), format = ?config.format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_filter_directives() {
        let mut config = LogConfig::default();
        assert_eq!(config.filter_directives(), "info");

        config.level = LogLevel::Warn;
        config.directives = Some("emporium_commerce=debug".into());
        assert_eq!(config.filter_directives(), "warn,emporium_commerce=debug");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config: LogConfig = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.directives.is_none());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let _ = init(&config);
        assert!(matches!(
            init(&config),
            Err(ObservabilityError::AlreadyInitialized(_))
        ));
    }
}

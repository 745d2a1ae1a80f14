//! CLI configuration.

use std::path::Path;

use anyhow::{Context, Result};
use emporium_commerce::config::CommerceConfig;
use emporium_db::DbConfig;
use emporium_observability::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["emporium.toml", ".emporium.toml", "emporium.json"];

/// Everything the binary needs, loaded once at start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Postgres connection.
    #[serde(default)]
    pub database: DbConfig,

    /// Commerce core settings.
    #[serde(default)]
    pub commerce: CommerceConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content, is_json(path))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply `DATABASE_URL` and `EMPORIUM_LOG` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`.
    ///
    /// `EMPORIUM_LOG` is either a bare level or a list of filter directives.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.url = url;
        }
        if let Some(log) = lookup("EMPORIUM_LOG").filter(|v| !v.trim().is_empty()) {
            match log.parse::<LogLevel>() {
                Ok(level) => self.logging.level = level,
                Err(_) => self.logging.directives = Some(log),
            }
        }
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.database
            .validate()
            .context("Invalid [database] section")?;
        self.commerce
            .validate()
            .context("Invalid [commerce] section")?;
        self.logging
            .env_filter()
            .context("Invalid [logging] section")?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

/// Generate a default emporium.toml config file.
pub fn generate_default_config(database_url: &str) -> String {
    format!(
        r#"# Emporium configuration

[database]
url = "{database_url}"
max_connections = 10
acquire_timeout_secs = 5

[commerce]
currency = "USD"
max_quantity_per_item = 99

[commerce.checkout]
# Increment a coupon's usage count when an order is placed with it.
count_coupon_usage = false

[logging]
level = "info"
format = "human"
# directives = "sqlx=warn"
"#,
        database_url = database_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_commerce::Currency;
    use emporium_observability::LogFormat;

    #[test]
    fn test_default_config_parses() {
        let toml = generate_default_config("postgres://shop:pw@localhost/shop");
        let config = AppConfig::parse(&toml, false).unwrap();
        assert_eq!(config.database.url, "postgres://shop:pw@localhost/shop");
        assert_eq!(config.commerce.currency, Currency::USD);
        assert_eq!(config.commerce.max_quantity_per_item, 99);
        assert!(!config.commerce.checkout.count_coupon_usage);
        assert_eq!(config.logging.format, LogFormat::Human);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::parse("", false).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_json_config() {
        let json = r#"{"commerce": {"currency": "EUR", "checkout": {"count_coupon_usage": true}}}"#;
        let config = AppConfig::parse(json, true).unwrap();
        assert_eq!(config.commerce.currency, Currency::EUR);
        assert!(config.commerce.checkout.count_coupon_usage);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "DATABASE_URL" => Some("postgres://ci@db/ci".to_string()),
            "EMPORIUM_LOG" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.database.url, "postgres://ci@db/ci");
        assert_eq!(config.logging.level, LogLevel::Debug);

        config.apply_overrides(|key| (key == "EMPORIUM_LOG").then(|| "sqlx=warn".to_string()));
        assert_eq!(config.logging.directives.as_deref(), Some("sqlx=warn"));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_validate_rejects_bad_sections() {
        let mut config = AppConfig::default();
        config.commerce.max_quantity_per_item = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.url = "mysql://localhost/shop".to_string();
        assert!(config.validate().is_err());
    }
}

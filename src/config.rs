//! Configuration management for stage-replica
//!
//! Handles loading, validating and saving the YAML client configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::sync::DispatchMode;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Stage server endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Apply the local device's balance to resolved gains
    #[serde(default)]
    pub use_balance: bool,
    #[serde(default)]
    pub dispatch: DispatchMode,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Level or full filter directive (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            use_balance: false,
            dispatch: DispatchMode::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_api_url() -> String {
    "ws://localhost:4000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl ClientConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: ClientConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }
        if !["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            anyhow::bail!("api_url '{}' must use ws, wss, http or https", url);
        }

        // Plain levels are checked; anything with a directive goes to EnvFilter
        let level = self.logging.level.trim();
        if level.is_empty() {
            anyhow::bail!("logging.level cannot be empty");
        }
        if !level.contains('=') && !level.contains(',') && !LOG_LEVELS.contains(&level) {
            anyhow::bail!(
                "logging.level '{}' is not one of {}",
                level,
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_with_defaults() {
        let file = write_temp("api_url: wss://stage.example.org\n");
        let config = ClientConfig::load(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(config.api_url, "wss://stage.example.org");
        assert!(!config.use_balance);
        assert_eq!(config.dispatch, DispatchMode::Inline);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[tokio::test]
    async fn test_load_full() {
        let file = write_temp(
            "api_url: ws://localhost:4000\n\
             use_balance: true\n\
             dispatch: worker\n\
             logging:\n  level: stage_replica=debug,warn\n  format: json\n",
        );
        let config = ClientConfig::load(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert!(config.use_balance);
        assert_eq!(config.dispatch, DispatchMode::Worker);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid() {
        let file = write_temp("api_url: ftp://nope\n");
        let err = ClientConfig::load(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("api_url"));

        let file = write_temp("dispatch: threads\n");
        assert!(ClientConfig::load(file.path().to_str().unwrap())
            .await
            .is_err());

        assert!(ClientConfig::load("/nonexistent/stage.yaml").await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        let path = path.to_str().unwrap();

        let config = ClientConfig {
            use_balance: true,
            ..ClientConfig::default()
        };
        config.save(path).await.unwrap();

        assert_eq!(ClientConfig::load(path).await.unwrap(), config);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = ClientConfig::default();
        assert!(config.validate().is_ok());

        config.logging.level = "verbose".into();
        assert!(config.validate().is_err());

        config.logging.level = "stage_replica=trace".into();
        assert!(config.validate().is_ok());
    }
}

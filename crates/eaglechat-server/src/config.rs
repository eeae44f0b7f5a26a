//! Server configuration: `config.json` settings tree plus the
//! required environment contract.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

const VALID_LEVELS: &[&str] = &["DEBUG", "INFO", "WARN", "ERROR"];

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_log_directory")]
    pub log_directory: String,
}

fn default_log_level() -> String {
    "INFO".into()
}

fn default_retention_days() -> u32 {
    30
}

fn default_log_directory() -> String {
    "logs".into()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            retention_days: default_retention_days(),
            log_directory: default_log_directory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_title")]
    pub title: String,
    #[serde(default = "default_api_description")]
    pub description: String,
    #[serde(default = "default_api_version")]
    pub version: String,
    /// Relaxes origin checks for local testing. Never relaxes
    /// signature checks.
    #[serde(default)]
    pub development_mode: bool,
}

fn default_api_title() -> String {
    "Eagle Chat Server".into()
}

fn default_api_description() -> String {
    "Multi-tenant chatbot backend for WordPress".into()
}

fn default_api_version() -> String {
    "1.0.0".into()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            title: default_api_title(),
            description: default_api_description(),
            version: default_api_version(),
            development_mode: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackSettings {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    3
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub callback: CallbackSettings,
}

impl Settings {
    /// Load and validate `config.json`. A missing file yields the
    /// defaults; a present-but-invalid file is fatal.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let level = self.logging.level.to_ascii_uppercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "logging.level must be one of {VALID_LEVELS:?}, got {:?}",
                self.logging.level
            );
        }
        if !(1..=365).contains(&self.logging.retention_days) {
            anyhow::bail!(
                "logging.retention_days must be in [1, 365], got {}",
                self.logging.retention_days
            );
        }
        if self.callback.retry_attempts < 1 {
            anyhow::bail!("callback.retry_attempts must be at least 1");
        }
        Ok(())
    }
}

/// Required environment contract. Absence of any variable is fatal at
/// startup, before the listener binds.
#[derive(Clone)]
pub struct Env {
    /// Raw master secret bytes, decoded from base64 `MASTER_KEY`.
    pub master_key: Vec<u8>,
    pub store_url: String,
    pub store_service_key: String,
}

impl Env {
    pub fn from_env() -> anyhow::Result<Self> {
        let master_key_b64 = require("MASTER_KEY")?;
        let master_key = STANDARD
            .decode(master_key_b64.trim())
            .map_err(|e| anyhow::anyhow!("MASTER_KEY is not valid base64: {e}"))?;
        if master_key.is_empty() {
            anyhow::bail!("MASTER_KEY must not be empty");
        }

        Ok(Self {
            master_key,
            store_url: require("STORE_URL")?,
            store_service_key: require("STORE_SERVICE_KEY")?,
        })
    }
}

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("required environment variable {name} is not set"))
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets stay out of logs.
        f.debug_struct("Env")
            .field("store_url", &self.store_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let settings = Settings::parse(
            r#"{
                "logging": {"level": "DEBUG", "retention_days": 7, "log_directory": "/var/log/eaglechat"},
                "api": {"title": "T", "description": "D", "version": "2.0.0", "development_mode": true},
                "callback": {"retry_attempts": 5, "retry_delay_seconds": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(settings.logging.level, "DEBUG");
        assert_eq!(settings.logging.retention_days, 7);
        assert!(settings.api.development_mode);
        assert_eq!(settings.callback.retry_attempts, 5);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let settings = Settings::parse("{}").unwrap();
        assert_eq!(settings.logging.level, "INFO");
        assert_eq!(settings.logging.retention_days, 30);
        assert!(!settings.api.development_mode);
        assert_eq!(settings.callback.retry_attempts, 3);
        assert_eq!(settings.callback.retry_delay_seconds, 3);
    }

    #[test]
    fn rejects_out_of_range_retention() {
        assert!(Settings::parse(r#"{"logging": {"retention_days": 0}}"#).is_err());
        assert!(Settings::parse(r#"{"logging": {"retention_days": 366}}"#).is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(Settings::parse(r#"{"logging": {"level": "VERBOSE"}}"#).is_err());
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        assert!(Settings::parse(r#"{"callback": {"retry_attempts": 0}}"#).is_err());
    }
}

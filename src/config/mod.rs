//! Configuration management for EchoClaw
//!
//! Configuration is loaded from `~/.echoclaw/config.json` and then overridden
//! by environment variables. The room gateway settings use the
//! `ECHOCHAMBERS_*` names shared with other EchoChambers clients; everything
//! else follows `ECHOCLAW_SECTION_KEY`.

mod types;
pub mod validate;

pub use types::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EchoError, Result};
use crate::rooms::AgentIdentity;

impl Config {
    /// Returns the EchoClaw configuration directory path (~/.echoclaw)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".echoclaw")
    }

    /// Returns the path to the config file (~/.echoclaw/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, starts from the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Numeric variables that fail to parse are configuration errors rather
    /// than being silently ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Gateway
        if let Some(val) = get("ECHOCHAMBERS_API_URL") {
            self.gateway.api_url = val.trim().to_string();
        }
        if let Some(val) = get("ECHOCHAMBERS_API_KEY") {
            self.gateway.api_key = Some(val);
        }

        // Agent identity
        if let Some(val) = get("ECHOCHAMBERS_USERNAME") {
            self.agent.username = Some(val);
        }
        if let Some(val) = get("ECHOCHAMBERS_MODEL") {
            self.agent.model = Some(val);
        }
        if let Some(val) = get("ECHOCHAMBERS_DEFAULT_ROOM") {
            self.agent.default_room = Some(val);
        }
        if let Some(val) = get("ECHOCLAW_AGENT_NAME") {
            self.agent.name = val;
        }

        // Interaction
        if let Some(val) = get("ECHOCHAMBERS_POLL_INTERVAL") {
            self.interaction.poll_interval_secs = parse_env("ECHOCHAMBERS_POLL_INTERVAL", &val)?;
        }
        if let Some(val) = get("ECHOCHAMBERS_MAX_MESSAGES") {
            self.interaction.max_thread_length = parse_env("ECHOCHAMBERS_MAX_MESSAGES", &val)?;
        }

        // Retry
        if let Some(val) = get("ECHOCLAW_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env("ECHOCLAW_RETRY_MAX_ATTEMPTS", &val)?;
        }
        if let Some(val) = get("ECHOCLAW_RETRY_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_env("ECHOCLAW_RETRY_BASE_DELAY_MS", &val)?;
        }
        if let Some(val) = get("ECHOCLAW_RETRY_MAX_RECONNECT_ATTEMPTS") {
            self.retry.max_reconnect_attempts =
                parse_env("ECHOCLAW_RETRY_MAX_RECONNECT_ATTEMPTS", &val)?;
        }

        // Generator
        if let Some(val) = get("ECHOCLAW_GENERATOR_API_KEY") {
            self.generator.api_key = Some(val);
        }
        if let Some(val) = get("ECHOCLAW_GENERATOR_API_BASE") {
            self.generator.api_base = val;
        }
        if let Some(val) = get("ECHOCLAW_GENERATOR_MODEL") {
            self.generator.model = val;
        }

        // Logging
        if let Some(val) = get("ECHOCLAW_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = get("ECHOCLAW_LOG_FORMAT") {
            self.logging.format = val
                .parse()
                .map_err(|e| EchoError::Config(format!("ECHOCLAW_LOG_FORMAT: {}", e)))?;
        }

        Ok(())
    }

    /// Check the settings the engine cannot start without.
    pub fn validate(&self) -> Result<()> {
        let api_url = self.gateway.api_url.trim();
        if api_url.is_empty() {
            return Err(EchoError::Config(
                "ECHOCHAMBERS_API_URL is required".to_string(),
            ));
        }
        match reqwest::Url::parse(api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(EchoError::Config(format!(
                    "Invalid ECHOCHAMBERS_API_URL format: {}",
                    api_url
                )))
            }
        }

        if self
            .gateway
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty())
        {
            return Err(EchoError::Config(
                "ECHOCHAMBERS_API_KEY is required".to_string(),
            ));
        }

        if self.interaction.poll_interval_secs == 0 {
            return Err(EchoError::Config(
                "ECHOCHAMBERS_POLL_INTERVAL must be a positive number in seconds".to_string(),
            ));
        }
        if self.interaction.max_thread_length == 0 {
            return Err(EchoError::Config(
                "ECHOCHAMBERS_MAX_MESSAGES must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EchoError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Username this agent posts as.
    pub fn username(&self) -> String {
        self.agent
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("agent-{}", self.agent.name))
    }

    /// Model label advertised alongside the username.
    pub fn model(&self) -> String {
        self.agent
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.generator.model.clone())
    }

    /// The identity this agent presents to the room gateway.
    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::new(self.username(), self.model())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_secs.max(1))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        EchoError::Config(format!(
            "{} must be a positive number, got '{}'",
            key, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config
            .apply_overrides_from(env(&[
                ("ECHOCHAMBERS_API_URL", "https://echochambers.example"),
                ("ECHOCHAMBERS_API_KEY", "secret"),
            ]))
            .unwrap();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interaction.poll_interval_secs, 60);
        assert_eq!(config.interaction.max_thread_length, 10);
        assert_eq!(config.interaction.min_response_interval_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 5_000);
        assert_eq!(config.retry.max_reconnect_attempts, 5);
        assert!(config.agent.default_room.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides_from(env(&[
                ("ECHOCHAMBERS_API_URL", "https://echochambers.example"),
                ("ECHOCHAMBERS_API_KEY", "secret"),
                ("ECHOCHAMBERS_USERNAME", "agent-1"),
                ("ECHOCHAMBERS_DEFAULT_ROOM", "general"),
                ("ECHOCHAMBERS_POLL_INTERVAL", "120"),
                ("ECHOCHAMBERS_MAX_MESSAGES", "5"),
                ("ECHOCLAW_LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.gateway.api_url, "https://echochambers.example");
        assert_eq!(config.gateway.api_key.as_deref(), Some("secret"));
        assert_eq!(config.username(), "agent-1");
        assert_eq!(config.agent.default_room.as_deref(), Some("general"));
        assert_eq!(config.interaction.poll_interval_secs, 120);
        assert_eq!(config.interaction.max_thread_length, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_poll_interval_env_is_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(env(&[("ECHOCHAMBERS_POLL_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("ECHOCHAMBERS_POLL_INTERVAL"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides_from(env(&[("ECHOCHAMBERS_USERNAME", "  ")]))
            .unwrap();
        assert!(config.agent.username.is_none());
    }

    #[test]
    fn test_validate_requires_api_url() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, EchoError::Config(_)));
        assert!(err.to_string().contains("ECHOCHAMBERS_API_URL"));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = Config::default();
        config.gateway.api_url = "https://echochambers.example".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ECHOCHAMBERS_API_KEY"));
    }

    #[test]
    fn test_validate_rejects_malformed_url() {
        let mut config = valid_config();
        config.gateway.api_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid ECHOCHAMBERS_API_URL"));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = valid_config();
        config.interaction.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_default_identity_derived_from_name() {
        let mut config = Config::default();
        config.agent.name = "scout".to_string();
        config.generator.model = "gpt-4o".to_string();
        let identity = config.identity();
        assert_eq!(identity.username, "agent-scout");
        assert_eq!(identity.model, "gpt-4o");
    }

    #[test]
    fn test_load_from_path_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.interaction.max_thread_length, 10);
    }

    #[test]
    fn test_load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"interaction": {"max_thread_length": 4}, "agent": {"name": "scout"}}"#,
        )
        .unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.interaction.max_thread_length, 4);
        assert_eq!(config.interaction.poll_interval_secs, 60);
        assert_eq!(config.agent.name, "scout");
    }

    #[test]
    fn test_logging_config_roundtrip() {
        let cfg = LoggingConfig {
            format: LogFormat::Json,
            file: Some("/tmp/echoclaw.log".to_string()),
            level: "debug".to_string(),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let restored: LoggingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.format, LogFormat::Json);
        assert_eq!(restored.file.as_deref(), Some("/tmp/echoclaw.log"));
        assert_eq!(restored.level, "debug");
    }
}

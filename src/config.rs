use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use crate::orchestrator::{
    PromptSettings, DEFAULT_APOLOGY, DEFAULT_BASE_PROMPT, DEFAULT_TRAINING_PROMPT,
};
use crate::storage::repository::DEFAULT_DAILY_LIMIT;

/// Main configuration for the companion engine
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// HTTP server port
    #[validate(range(min = 1024, max = 65535))]
    pub server_port: u16,

    /// Database URL (SeaORM / SQLite)
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Model bridge base URL
    #[validate(length(min = 1))]
    pub model_url: String,

    /// Model identifier forwarded to the bridge
    pub model_name: String,

    #[validate(range(min = 1, max = 300))]
    pub model_timeout_secs: u64,

    /// Anonymization service base URL
    #[validate(length(min = 1))]
    pub scrubber_url: String,

    #[validate(range(min = 1, max = 120))]
    pub scrubber_timeout_secs: u64,

    /// Daily limit for owners without a quota row
    #[validate(range(min = 1))]
    pub default_daily_limit: i32,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,

    #[validate(length(min = 1))]
    pub base_system_prompt: String,

    #[validate(length(min = 1))]
    pub training_system_prompt: String,

    /// Reply shown when the model cannot answer
    #[validate(length(min = 1))]
    pub apology_message: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            // Load from ~/.companion/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.companion/config",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .required(false),
            )
            // Environment overrides: COMPANION__SERVER_PORT, COMPANION__MODEL_URL, etc.
            .add_source(config::Environment::with_prefix("COMPANION").separator("__"))
            .build()?;

        Self::finish(settings)
    }

    /// Defaults overlaid with one explicit file, without environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::from(path))
            .build()?;

        Self::finish(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server_port", 8080)?
            .set_default("database_url", "sqlite://companion.db")?
            .set_default("model_url", "http://localhost:5001")?
            .set_default("model_name", "companion-default")?
            .set_default("model_timeout_secs", 30)?
            .set_default("scrubber_url", "http://localhost:5002")?
            .set_default("scrubber_timeout_secs", 10)?
            .set_default("default_daily_limit", DEFAULT_DAILY_LIMIT)?
            .set_default("log_level", "info")?
            .set_default("base_system_prompt", DEFAULT_BASE_PROMPT)?
            .set_default("training_system_prompt", DEFAULT_TRAINING_PROMPT)?
            .set_default("apology_message", DEFAULT_APOLOGY)
    }

    fn finish(settings: config::Config) -> Result<Self, config::ConfigError> {
        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn scrubber_timeout(&self) -> Duration {
        Duration::from_secs(self.scrubber_timeout_secs)
    }

    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            base: self.base_system_prompt.clone(),
            training: self.training_system_prompt.clone(),
            apology: self.apology_message.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            database_url: "sqlite://companion.db".to_string(),
            model_url: "http://localhost:5001".to_string(),
            model_name: "companion-default".to_string(),
            model_timeout_secs: 30,
            scrubber_url: "http://localhost:5002".to_string(),
            scrubber_timeout_secs: 10,
            default_daily_limit: DEFAULT_DAILY_LIMIT,
            log_level: "info".to_string(),
            base_system_prompt: DEFAULT_BASE_PROMPT.to_string(),
            training_system_prompt: DEFAULT_TRAINING_PROMPT.to_string(),
            apology_message: DEFAULT_APOLOGY.to_string(),
        }
    }
}

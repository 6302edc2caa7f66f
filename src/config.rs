//! Configuration and settings management
//!
//! Loads settings from environment variables and defines runtime constants.

use crate::error::BotError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Telegram Bot API token (`TELEGRAM_BOT_TOKEN`)
    #[serde(default)]
    pub telegram_bot_token: String,
    /// Base URL of the content API serving events and FAQs (`API_MONGO_URL`)
    #[serde(default)]
    pub api_mongo_url: String,
    /// Question answering endpoint (`API_RAG_URL`)
    #[serde(default)]
    pub api_rag_url: String,
    /// Redis connection string (`REDIS_URL`)
    pub redis_url: Option<String>,
    /// Explicit Redis switch (`USE_REDIS`)
    pub use_redis: Option<bool>,
    /// Public webhook URL; its presence selects webhook mode (`WEBHOOK_URL`)
    pub webhook_url: Option<String>,
    /// Port for the health and webhook server (`PORT`)
    #[serde(default = "default_port")]
    pub port: u16,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Builds the layered configuration source: optional local file, then the
/// process environment.
///
/// # Errors
///
/// Returns a `ConfigError` if a source cannot be read.
pub fn build_config() -> Result<Config, config::ConfigError> {
    Config::builder()
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // UPPER_SNAKE_CASE variables map onto the snake_case fields; empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Load settings from the environment and validate the required ones.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ConfigMissing`] naming the first absent required
    /// variable, or [`BotError::Config`] if a value cannot be parsed.
    pub fn new() -> Result<Self, BotError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize and validate settings from an already built source.
    ///
    /// # Errors
    ///
    /// See [`Settings::new`].
    pub fn from_config(source: Config) -> Result<Self, BotError> {
        let mut settings: Self = source.try_deserialize()?;
        settings.validate()?;

        settings.api_mongo_url = settings.api_mongo_url.trim_end_matches('/').to_string();
        settings.webhook_url = settings
            .webhook_url
            .take()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        settings.webhook()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), BotError> {
        let required = [
            ("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token),
            ("API_MONGO_URL", &self.api_mongo_url),
            ("API_RAG_URL", &self.api_rag_url),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BotError::ConfigMissing(name));
            }
        }
        Ok(())
    }

    /// Whether the Redis cache should be attempted.
    ///
    /// `USE_REDIS` wins when set; otherwise Redis is used whenever
    /// `REDIS_URL` is present.
    #[must_use]
    pub fn redis_enabled(&self) -> bool {
        self.use_redis.unwrap_or(self.redis_url.is_some())
    }

    /// Parsed `WEBHOOK_URL`, or `None` for polling mode.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ConfigInvalid`] if the value is not an absolute URL.
    pub fn webhook(&self) -> Result<Option<url::Url>, BotError> {
        self.webhook_url
            .as_deref()
            .map(url::Url::parse)
            .transpose()
            .map_err(|e| BotError::ConfigInvalid("WEBHOOK_URL", e.to_string()))
    }

    /// Redis URL, falling back to a local instance.
    #[must_use]
    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }
}

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 10_000;
/// Redis instance used when `USE_REDIS=true` but `REDIS_URL` is unset
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
/// Connect and response timeout for Redis operations (milliseconds)
pub const REDIS_TIMEOUT_MS: u64 = 2000;

// HTTP configuration
/// Total timeout for outbound API calls
pub const API_TIMEOUT_SECS: u64 = 5;
/// Connect timeout for outbound API calls
pub const API_CONNECT_TIMEOUT_SECS: u64 = 3;

// Cache configuration
/// FAQ list and answers (1 hour)
pub const CACHE_TTL_FAQ_SECS: u64 = 3600;
/// Upcoming events (30 minutes)
pub const CACHE_TTL_EVENTS_SECS: u64 = 1800;
/// Assistant contacts (30 minutes)
pub const CACHE_TTL_ASSISTANTS_SECS: u64 = 1800;
/// RAG answers (5 minutes)
pub const CACHE_TTL_RAG_SECS: u64 = 300;
/// Maximum entries held by the in-memory cache
pub const MEMORY_CACHE_MAX_CAPACITY: u64 = 10_000;

// Free-text guard
/// Messages allowed per user within [`RATE_LIMIT_WINDOW_SECS`]
pub const RATE_LIMIT_MESSAGES: u32 = 5;
/// Rate limit window
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
/// Maximum question length forwarded to the RAG API
pub const MAX_MESSAGE_LENGTH: usize = 500;

// Menus
/// FAQ questions per inline keyboard message
pub const FAQ_PAGE_SIZE: usize = 5;
/// Community site linked from the main menu
pub const SUPERTEAM_URL: &str = "https://vn.superteam.fun/";

// Telegram API retry configuration
/// Retries after the first attempt for Telegram operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

// Session logging
/// Attempts made to deliver one session record
pub const SESSION_LOG_MAX_ATTEMPTS: usize = 3;
/// Base delay between session log attempts (grows linearly)
pub const SESSION_LOG_BACKOFF_MS: u64 = 1000;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get the outbound API timeout from env or default.
///
/// Environment variable: `API_TIMEOUT_SECS`.
#[must_use]
pub fn get_api_timeout_secs() -> u64 {
    env_u64("API_TIMEOUT_SECS", API_TIMEOUT_SECS)
}

/// Get the FAQ cache TTL from env or default.
///
/// Environment variable: `CACHE_TTL_FAQ_SECS`.
#[must_use]
pub fn get_faq_ttl() -> Duration {
    Duration::from_secs(env_u64("CACHE_TTL_FAQ_SECS", CACHE_TTL_FAQ_SECS))
}

/// Get the events cache TTL from env or default.
///
/// Environment variable: `CACHE_TTL_EVENTS_SECS`.
#[must_use]
pub fn get_events_ttl() -> Duration {
    Duration::from_secs(env_u64("CACHE_TTL_EVENTS_SECS", CACHE_TTL_EVENTS_SECS))
}

/// Get the assistants cache TTL from env or default.
///
/// Environment variable: `CACHE_TTL_ASSISTANTS_SECS`.
#[must_use]
pub fn get_assistants_ttl() -> Duration {
    Duration::from_secs(env_u64(
        "CACHE_TTL_ASSISTANTS_SECS",
        CACHE_TTL_ASSISTANTS_SECS,
    ))
}

/// Get the RAG answer cache TTL from env or default.
///
/// Environment variable: `CACHE_TTL_RAG_SECS`.
#[must_use]
pub fn get_rag_ttl() -> Duration {
    Duration::from_secs(env_u64("CACHE_TTL_RAG_SECS", CACHE_TTL_RAG_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> Config {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder
                .set_override(*key, *value)
                .expect("override key is valid");
        }
        builder.build().expect("in-memory config builds")
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("telegram_bot_token", "123456:ABC"),
        ("api_mongo_url", "https://content.example/api/"),
        ("api_rag_url", "https://rag.example/ask"),
    ];

    #[test]
    fn test_required_settings_load_with_defaults() {
        let settings = Settings::from_config(source(&REQUIRED)).expect("settings are valid");

        assert_eq!(settings.api_mongo_url, "https://content.example/api");
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(settings.webhook_url.is_none());
        assert!(!settings.redis_enabled());
    }

    #[test]
    fn test_each_missing_variable_is_reported() {
        for (skipped, name) in [
            (0, "TELEGRAM_BOT_TOKEN"),
            (1, "API_MONGO_URL"),
            (2, "API_RAG_URL"),
        ] {
            let pairs: Vec<_> = REQUIRED
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skipped)
                .map(|(_, pair)| *pair)
                .collect();

            match Settings::from_config(source(&pairs)) {
                Err(BotError::ConfigMissing(missing)) => assert_eq!(missing, name),
                other => panic!("expected ConfigMissing({name}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_required_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("api_rag_url", "   ");

        let err = Settings::from_config(source(&pairs)).expect_err("blank url rejected");
        assert!(err.to_string().contains("API_RAG_URL"));
    }

    #[test]
    fn test_optional_settings_parse() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("port", "8080"),
            ("use_redis", "true"),
            ("webhook_url", " https://bot.example/hook "),
        ]);

        let settings = Settings::from_config(source(&pairs)).expect("settings are valid");
        assert_eq!(settings.port, 8080);
        assert!(settings.redis_enabled());
        assert_eq!(settings.redis_url(), DEFAULT_REDIS_URL);
        assert_eq!(
            settings.webhook_url.as_deref(),
            Some("https://bot.example/hook")
        );
    }

    #[test]
    fn test_redis_url_implies_redis_unless_disabled() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("redis_url", "redis://cache:6379"));
        let settings = Settings::from_config(source(&pairs)).expect("settings are valid");
        assert!(settings.redis_enabled());

        pairs.push(("use_redis", "false"));
        let settings = Settings::from_config(source(&pairs)).expect("settings are valid");
        assert!(!settings.redis_enabled());
    }

    #[test]
    fn test_relative_webhook_url_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("webhook_url", "/hook"));

        match Settings::from_config(source(&pairs)) {
            Err(BotError::ConfigInvalid(name, _)) => assert_eq!(name, "WEBHOOK_URL"),
            other => panic!("expected ConfigInvalid(WEBHOOK_URL), got {other:?}"),
        }
    }
}

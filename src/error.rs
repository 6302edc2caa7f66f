//! Error taxonomy shared by the configuration, cache and API layers.

use thiserror::Error;

/// Errors surfaced by the bot's library layers.
///
/// Only the configuration variants are fatal; the remaining variants are
/// recovered from by the handlers.
#[derive(Debug, Error)]
pub enum BotError {
    /// A required environment variable is absent or empty.
    #[error("missing required environment variable {0}")]
    ConfigMissing(&'static str),
    /// A variable is present but its value is unusable.
    #[error("invalid value for {0}: {1}")]
    ConfigInvalid(&'static str, String),
    /// The configuration sources could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    /// The content API (events, FAQs, assistants) failed or timed out.
    #[error("content API unavailable: {0}")]
    ContentUnavailable(String),
    /// The RAG API failed or timed out.
    #[error("RAG API unavailable: {0}")]
    RagUnavailable(String),
    /// The Redis cache failed; the in-memory store takes over.
    #[error("cache degraded: {0}")]
    CacheDegraded(String),
}

impl BotError {
    /// Whether the error should stop the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing(_) | Self::ConfigInvalid(..) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_names_variable() {
        let err = BotError::ConfigMissing("API_RAG_URL");
        assert_eq!(
            err.to_string(),
            "missing required environment variable API_RAG_URL"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_upstream_errors_are_recoverable() {
        assert!(!BotError::ContentUnavailable("503".into()).is_fatal());
        assert!(!BotError::RagUnavailable("timeout".into()).is_fatal());
        assert!(!BotError::CacheDegraded("refused".into()).is_fatal());
    }
}

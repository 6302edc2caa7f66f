use super::{AssistantEntry, ContentApi, EventEntry, FaqEntry, RagApi, SessionRecord};
use crate::cache::{keys, Cache};
use crate::config::{
    get_assistants_ttl, get_events_ttl, get_faq_ttl, get_rag_ttl, SESSION_LOG_BACKOFF_MS,
    SESSION_LOG_MAX_ATTEMPTS,
};
use crate::error::BotError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

/// Content API reads served through the cache.
#[derive(Clone)]
pub struct CachedContent {
    api: Arc<dyn ContentApi>,
    cache: Arc<Cache>,
}

impl CachedContent {
    /// Wraps `api` with `cache`.
    #[must_use]
    pub fn new(api: Arc<dyn ContentApi>, cache: Arc<Cache>) -> Self {
        Self { api, cache }
    }

    async fn read_through<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, BotError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BotError>>,
    {
        if let Some(hit) = self.cache.get_json(key).await {
            debug!("Cache hit for {key}");
            return Ok(hit);
        }

        let fresh = fetch().await?;
        self.cache.set_json(key, &fresh, ttl).await;
        Ok(fresh)
    }

    /// Upcoming events.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ContentUnavailable`] on a cache miss the API cannot serve.
    pub async fn list_events(&self) -> Result<Vec<EventEntry>, BotError> {
        self.read_through(keys::EVENTS, get_events_ttl(), || self.api.list_events())
            .await
    }

    /// All FAQ entries.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ContentUnavailable`] on a cache miss the API cannot serve.
    pub async fn list_faqs(&self) -> Result<Vec<FaqEntry>, BotError> {
        self.read_through(keys::FAQS, get_faq_ttl(), || self.api.list_faqs())
            .await
    }

    /// Assistant contacts.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ContentUnavailable`] on a cache miss the API cannot serve.
    pub async fn list_assistants(&self) -> Result<Vec<AssistantEntry>, BotError> {
        self.read_through(keys::ASSISTANTS, get_assistants_ttl(), || {
            self.api.list_assistants()
        })
        .await
    }

    /// One FAQ entry by id, or `None` if the id is unknown.
    ///
    /// Found entries are cached on their own so a later FAQ list refresh does
    /// not invalidate answers users are reading.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ContentUnavailable`] if the FAQ list cannot be loaded.
    pub async fn get_faq(&self, id: &str) -> Result<Option<FaqEntry>, BotError> {
        let key = keys::faq_answer(id);
        if let Some(hit) = self.cache.get_json::<FaqEntry>(&key).await {
            return Ok(Some(hit));
        }

        let found = self.list_faqs().await?.into_iter().find(|faq| faq.id == id);
        if let Some(faq) = &found {
            self.cache.set_json(&key, faq, get_faq_ttl()).await;
        }
        Ok(found)
    }

    /// Posts `record` to the session log in the background.
    ///
    /// Up to [`SESSION_LOG_MAX_ATTEMPTS`] attempts with linearly growing
    /// delays; failures are only logged.
    pub fn record_session(&self, record: SessionRecord) -> tokio::task::JoinHandle<()> {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let delays = (1..SESSION_LOG_MAX_ATTEMPTS as u64)
                .map(|n| Duration::from_millis(SESSION_LOG_BACKOFF_MS * n));

            match Retry::spawn(delays, || api.record_session(&record)).await {
                Ok(()) => info!("Session saved: {}", record.session_id),
                Err(e) => warn!(
                    "Failed to save session {} after {} attempts: {e}",
                    record.session_id, SESSION_LOG_MAX_ATTEMPTS
                ),
            }
        })
    }
}

/// RAG answers served through the cache.
#[derive(Clone)]
pub struct CachedRag {
    api: Arc<dyn RagApi>,
    cache: Arc<Cache>,
}

impl CachedRag {
    /// Wraps `api` with `cache`.
    #[must_use]
    pub fn new(api: Arc<dyn RagApi>, cache: Arc<Cache>) -> Self {
        Self { api, cache }
    }

    /// Answers `question` for the user identified by `context`.
    ///
    /// A cached answer for the same user and question is reused; otherwise a
    /// single request is made. Empty answers are returned but not cached.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::RagUnavailable`] if the request fails.
    pub async fn ask(&self, question: &str, context: Option<&str>) -> Result<String, BotError> {
        let key = keys::rag_answer(context, question);
        if let Some(hit) = self.cache.get(&key).await {
            info!("Retrieved RAG response from cache");
            return Ok(hit);
        }

        let answer = self.api.ask(question, context).await?;
        if !answer.trim().is_empty() {
            self.cache.set(&key, &answer, get_rag_ttl()).await;
        }
        Ok(answer)
    }
}

//! Read-through cache layer
//!
//! [`Cache`] fronts one [`CacheStore`]: Redis when it is configured and
//! reachable, otherwise a [`MemoryCache`]. The first Redis failure switches
//! the process to the memory store for good.

mod memory;
mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

use crate::config::{Settings, REDIS_TIMEOUT_MS};
use crate::error::BotError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimal key/value contract shared by the cache backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` on a miss or an expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>, BotError>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BotError>;

    /// Whether the backend is currently able to serve requests.
    fn is_available(&self) -> bool;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Cache keys, derived from the request they stand in for.
pub mod keys {
    use crate::utils::sha256_hex;

    /// Full FAQ list.
    pub const FAQS: &str = "faqs_cache";
    /// Upcoming events.
    pub const EVENTS: &str = "events_cache";
    /// Assistant contacts.
    pub const ASSISTANTS: &str = "assistants_cache";

    /// A single FAQ answer.
    #[must_use]
    pub fn faq_answer(faq_id: &str) -> String {
        format!("faq_answer:{faq_id}")
    }

    /// A RAG answer for one user and question.
    #[must_use]
    pub fn rag_answer(context: Option<&str>, question: &str) -> String {
        format!(
            "rag_response:{}:{}",
            context.unwrap_or("anonymous"),
            sha256_hex(question)
        )
    }
}

/// Process-wide cache facade.
pub struct Cache {
    primary: Option<Arc<dyn CacheStore>>,
    fallback: MemoryCache,
    degraded: AtomicBool,
}

impl Cache {
    /// Memory-only cache, used when Redis is not configured.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            primary: None,
            fallback: MemoryCache::default(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Cache that serves from `primary` until its first failure.
    #[must_use]
    pub fn with_primary(primary: Arc<dyn CacheStore>) -> Self {
        Self {
            primary: Some(primary),
            ..Self::in_memory()
        }
    }

    /// Cache for a configured backend that could not be reached at startup.
    #[must_use]
    pub fn degraded(err: &BotError) -> Self {
        let cache = Self::in_memory();
        cache.degrade(err);
        cache
    }

    /// Selects the backend from `settings`.
    ///
    /// Never fails: an unreachable Redis yields a degraded memory cache.
    pub async fn connect(settings: &Settings) -> Self {
        if !settings.redis_enabled() {
            info!("Redis disabled, using in-memory cache.");
            return Self::in_memory();
        }

        let timeout = Duration::from_millis(REDIS_TIMEOUT_MS);
        match RedisCache::connect(settings.redis_url(), timeout).await {
            Ok(redis) => Self::with_primary(Arc::new(redis)),
            Err(e) => Self::degraded(&e),
        }
    }

    /// Whether a configured primary backend has failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Whether the active backend can serve requests.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.active().is_available()
    }

    /// Name of the backend currently serving requests.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.active().name()
    }

    fn active(&self) -> &dyn CacheStore {
        match &self.primary {
            Some(primary) if !self.is_degraded() => &**primary,
            _ => &self.fallback,
        }
    }

    fn degrade(&self, err: &BotError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!("{err}; continuing with in-memory cache for the rest of this process");
        }
    }

    /// Returns the cached value for `key`, or `None` on a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.active().get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.degrade(&e);
                self.fallback.get(key).await.ok().flatten()
            }
        }
    }

    /// Stores `value` under `key` for `ttl`.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Err(e) = self.active().set(key, value, ttl).await {
            self.degrade(&e);
            // Memory writes are infallible
            let _ = self.fallback.set(key, value, ttl).await;
        }
    }

    /// Returns the cached value for `key` decoded from JSON.
    ///
    /// Undecodable entries are treated as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring undecodable cache entry {key}: {e}");
                None
            }
        }
    }

    /// Stores `value` as JSON under `key` for `ttl`.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => warn!("Failed to encode cache entry {key}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Backend that fails every call and counts how often it was hit.
    #[derive(Default)]
    struct BrokenStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, BotError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BotError::CacheDegraded("connection reset".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), BotError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BotError::CacheDegraded("connection reset".into()))
        }

        fn is_available(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let cache = Cache::in_memory();
        cache.set("k", "v", Duration::from_secs(10)).await;

        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert!(!cache.is_degraded());
        assert!(cache.is_available());
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_first_failure_switches_to_memory_for_good() {
        let broken = Arc::new(BrokenStore::default());
        let cache = Cache::with_primary(broken.clone());
        assert_eq!(cache.backend_name(), "broken");

        cache.set("k", "v", Duration::from_secs(10)).await;
        assert!(cache.is_degraded());
        assert_eq!(cache.backend_name(), "memory");

        // Value written during the failure is served from memory
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        cache.set("k2", "v2", Duration::from_secs(10)).await;
        assert_eq!(cache.get("k2").await.as_deref(), Some("v2"));

        // No further traffic reaches the failed backend
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_redis_at_startup_degrades() {
        let settings = Settings {
            telegram_bot_token: "123:abc".into(),
            api_mongo_url: "http://127.0.0.1:9".into(),
            api_rag_url: "http://127.0.0.1:9/ask".into(),
            redis_url: Some("redis://127.0.0.1:1".into()),
            ..Settings::default()
        };

        let cache = Cache::connect(&settings).await;

        assert!(cache.is_degraded());
        assert!(cache.is_available());
        cache.set("events_cache", "[]", Duration::from_secs(10)).await;
        assert_eq!(cache.get("events_cache").await.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = Cache::in_memory();
        cache
            .set_json("nums", &vec![1, 2, 3], Duration::from_secs(10))
            .await;
        cache.set("garbage", "{not json", Duration::from_secs(10)).await;

        assert_eq!(cache.get_json::<Vec<i32>>("nums").await, Some(vec![1, 2, 3]));
        assert_eq!(cache.get_json::<Vec<i32>>("garbage").await, None);
    }

    #[test]
    fn test_rag_key_depends_on_user_and_question() {
        let a = keys::rag_answer(Some("1"), "What is SuperTeam?");
        let b = keys::rag_answer(Some("2"), "What is SuperTeam?");
        let c = keys::rag_answer(Some("1"), "When is the summit?");

        assert!(a.starts_with("rag_response:1:"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(keys::faq_answer("7"), "faq_answer:7");
    }
}

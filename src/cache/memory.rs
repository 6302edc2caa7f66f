//! In-process cache store backed by `moka`.

use super::CacheStore;
use crate::error::BotError;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    payload: String,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-memory key/value store with per-entry TTL.
///
/// Expired entries are never returned from [`CacheStore::get`]; their
/// memory is reclaimed by `moka`'s housekeeping on later reads and writes.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl MemoryCache {
    /// Creates a store holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(crate::config::MEMORY_CACHE_MAX_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BotError> {
        Ok(self.entries.get(key).await.map(|entry| entry.payload))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BotError> {
        let entry = Entry {
            payload: value.to_string(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() -> Result<(), BotError> {
        let cache = MemoryCache::new(100);
        cache.set("faqs_cache", "[]", Duration::from_secs(60)).await?;

        assert_eq!(cache.get("faqs_cache").await?.as_deref(), Some("[]"));
        assert_eq!(cache.get("events_cache").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() -> Result<(), BotError> {
        let cache = MemoryCache::new(100);
        cache.set("short", "1", Duration::from_millis(50)).await?;
        cache.set("long", "2", Duration::from_secs(60)).await?;
        assert_eq!(cache.get("short").await?.as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get("short").await?, None);
        assert_eq!(cache.get("long").await?.as_deref(), Some("2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() -> Result<(), BotError> {
        let cache = MemoryCache::new(100);
        cache.set("key", "old", Duration::from_millis(50)).await?;
        cache.set("key", "new", Duration::from_secs(60)).await?;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.get("key").await?.as_deref(), Some("new"));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_writers() -> Result<(), BotError> {
        let cache = MemoryCache::new(1000);
        let mut tasks = Vec::new();
        for i in 0..32 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .set(&format!("key:{i}"), &i.to_string(), Duration::from_secs(60))
                    .await
            }));
        }
        for task in tasks {
            task.await.expect("task joins")?;
        }

        for i in 0..32 {
            let expected = i.to_string();
            assert_eq!(
                cache.get(&format!("key:{i}")).await?.as_deref(),
                Some(expected.as_str())
            );
        }
        Ok(())
    }
}

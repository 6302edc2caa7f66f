//! Free-text flood protection
//!
//! Questions are forwarded to the RAG service, which is slow and shared by
//! every user. Before a question is accepted it must pass three checks: the
//! user has no other question in flight, the user is within the per-window
//! message budget, and the text only uses whitelisted characters.

use crate::config::{
    MAX_MESSAGE_LENGTH, MEMORY_CACHE_MAX_CAPACITY, RATE_LIMIT_MESSAGES, RATE_LIMIT_WINDOW_SECS,
};
use crate::utils::hash_user_id;
use lazy_regex::{lazy_regex, Lazy, Regex};
use moka::future::Cache;
use moka::Entry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

static ALLOWED_CHARS: Lazy<Regex> = lazy_regex!(r"^[a-zA-Z0-9\s.,!?-]+$");
static HTML_TAG: Lazy<Regex> = lazy_regex!(r"<[^>]+>");
static DISALLOWED: Lazy<Regex> = lazy_regex!(r"[^\w\s.,!?-]");

/// Why a free-text message was not accepted as a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another question from the same user is still being answered; the
    /// message is dropped without a reply
    Busy,
    /// Too many messages inside the current window
    RateLimited,
    /// Empty, or contains characters outside the whitelist
    InvalidCharacters,
}

#[derive(Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window message counter per user.
///
/// Entries idle for longer than a window are evicted by `moka`, so the
/// counter never grows with the number of users who ever wrote to the bot.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<i64, Window>,
    limit: u32,
    window: Duration,
    /// Counter for rejected messages (for logging throttling)
    rejected_count: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Allows `limit` messages per user in every `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration, max_capacity: u64) -> Self {
        let windows = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(window)
            .build();

        Self {
            windows,
            limit,
            window,
            rejected_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counts one message from `user_id` and reports whether it is allowed.
    ///
    /// The read-modify-write runs atomically per key, so concurrent messages
    /// from the same user cannot both take the last slot.
    pub async fn check(&self, user_id: i64) -> bool {
        let now = Instant::now();
        let window = self.window;

        let entry = self
            .windows
            .entry(user_id)
            .and_upsert_with(|existing: Option<Entry<i64, Window>>| {
                let next = match existing.map(Entry::into_value) {
                    Some(current) if now.duration_since(current.started) < window => Window {
                        count: current.count.saturating_add(1),
                        ..current
                    },
                    _ => Window {
                        started: now,
                        count: 1,
                    },
                };
                std::future::ready(next)
            })
            .await;

        if entry.value().count <= self.limit {
            return true;
        }

        let rejected = self.rejected_count.fetch_add(1, Ordering::Relaxed) + 1;
        if rejected == 1 || rejected.is_multiple_of(100) {
            info!(
                "Rate limited {rejected} messages (recent: user {})",
                hash_user_id(user_id)
            );
        }
        false
    }

    /// Total number of rejected messages.
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            RATE_LIMIT_MESSAGES,
            Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            MEMORY_CACHE_MAX_CAPACITY,
        )
    }
}

/// Users with a question currently being answered.
#[derive(Default)]
pub struct InFlight {
    users: Mutex<HashSet<i64>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        // A panic while holding the lock cannot leave the set inconsistent.
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Marks `user_id` busy, or returns `None` if it already is.
    pub fn try_begin(&self, user_id: i64) -> Option<InFlightGuard<'_>> {
        if self.lock().insert(user_id) {
            Some(InFlightGuard {
                owner: self,
                user_id,
            })
        } else {
            None
        }
    }

    /// Whether `user_id` has a question in flight.
    #[must_use]
    pub fn contains(&self, user_id: i64) -> bool {
        self.lock().contains(&user_id)
    }
}

/// Releases the user's in-flight slot on drop.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    user_id: i64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.user_id);
    }
}

/// A question that passed every check.
pub struct Admitted<'a> {
    /// Sanitized question text
    pub question: String,
    _slot: InFlightGuard<'a>,
}

/// Combined checks applied to every free-text message.
#[derive(Default)]
pub struct MessageGuard {
    rate: RateLimiter,
    in_flight: InFlight,
}

impl MessageGuard {
    /// Creates a guard with a custom rate limiter.
    #[must_use]
    pub fn new(rate: RateLimiter) -> Self {
        Self {
            rate,
            in_flight: InFlight::default(),
        }
    }

    /// Runs the checks for one message from `user_id`.
    ///
    /// The returned value keeps the user marked busy until it is dropped.
    ///
    /// # Errors
    ///
    /// Returns the first check the message failed.
    pub async fn admit(&self, user_id: i64, text: &str) -> Result<Admitted<'_>, Rejection> {
        let Some(slot) = self.in_flight.try_begin(user_id) else {
            debug!(
                "Dropping message from user {}: question already in flight",
                hash_user_id(user_id)
            );
            return Err(Rejection::Busy);
        };

        if !self.rate.check(user_id).await {
            return Err(Rejection::RateLimited);
        }

        if !is_allowed(text) {
            return Err(Rejection::InvalidCharacters);
        }

        let question = sanitize(text);
        if question.trim().is_empty() {
            return Err(Rejection::InvalidCharacters);
        }

        Ok(Admitted {
            question,
            _slot: slot,
        })
    }

    /// Whether `user_id` has a question in flight.
    #[must_use]
    pub fn is_busy(&self, user_id: i64) -> bool {
        self.in_flight.contains(user_id)
    }
}

/// Whether `text` only uses letters, digits, whitespace and basic punctuation.
#[must_use]
pub fn is_allowed(text: &str) -> bool {
    ALLOWED_CHARS.is_match(text)
}

/// Strips HTML tags and disallowed characters and caps the length.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let without_tags = HTML_TAG.replace_all(text, "");
    let cleaned = DISALLOWED.replace_all(&without_tags, "");
    crate::utils::truncate_str(cleaned.trim(), MAX_MESSAGE_LENGTH)
}

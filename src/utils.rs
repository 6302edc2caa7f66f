//! Utility functions for text splitting, hashing and retrying Telegram calls.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Splits a long plain-text message into parts that fit Telegram's limit.
///
/// Lines are kept whole where possible; a single line longer than
/// `max_length` is split on grapheme boundaries.
///
/// # Examples
///
/// ```
/// use superteam_bot::utils::split_long_message;
/// let long_msg = "A very long answer...\n".repeat(300);
/// let parts = split_long_message(&long_msg, 4000);
/// assert!(parts.len() > 1);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }

    if message.len() <= max_length {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for line in message.lines() {
        if line.len() > max_length {
            if !current.is_empty() {
                parts.push(current.trim_end().to_string());
                current.clear();
            }

            let mut chunk = String::new();
            for grapheme in line.graphemes(true) {
                if chunk.len() + grapheme.len() > max_length {
                    parts.push(std::mem::take(&mut chunk));
                }
                chunk.push_str(grapheme);
            }
            current.push_str(&chunk);
            current.push('\n');
            continue;
        }

        if current.len() + line.len() + 1 > max_length && !current.is_empty() {
            parts.push(current.trim_end().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }

    if !current.trim_end().is_empty() {
        parts.push(current.trim_end().to_string());
    }

    parts
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// # Examples
///
/// ```
/// use superteam_bot::utils::truncate_str;
/// assert_eq!(truncate_str("Xin chào!", 8), "Xin chào");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Hex-encoded SHA-256 digest of `input`.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Short, stable pseudonym for a Telegram user id, used in logs.
#[must_use]
pub fn hash_user_id(user_id: i64) -> String {
    let mut digest = sha256_hex(&user_id.to_string());
    digest.truncate(8);
    digest
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Strategy: exponential backoff with jitter, starting at
/// [`TELEGRAM_API_INITIAL_BACKOFF_MS`](crate::config::TELEGRAM_API_INITIAL_BACKOFF_MS)
/// and capped at
/// [`TELEGRAM_API_MAX_BACKOFF_MS`](crate::config::TELEGRAM_API_MAX_BACKOFF_MS).
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::TELEGRAM_API_MAX_RETRIES;

    Retry::spawn(telegram_retry_delays(), operation)
        .await
        .map_err(|e| {
            warn!(
                "Telegram API operation failed after {} attempts: {}",
                TELEGRAM_API_MAX_RETRIES + 1,
                e
            );
            e
        })
}

/// Delays between Telegram attempts, one per retry after the first try.
fn telegram_retry_delays() -> impl Iterator<Item = Duration> {
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES)
}

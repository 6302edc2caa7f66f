//! Resilient reply delivery with automatic retry for Telegram API operations.
//!
//! Every send and edit is retried on transient failures using exponential
//! backoff with jitter. Replies longer than Telegram's limit are split on
//! line boundaries; the keyboard stays on the last part.
//!
//! # Usage
//!
//! ```ignore
//! use superteam_bot::bot::resilient::{deliver, deliver_into_placeholder, send_placeholder};
//!
//! let placeholder = send_placeholder(&bot, chat_id).await?;
//! deliver_into_placeholder(&bot, chat_id, placeholder.id, &reply).await?;
//! ```

use crate::bot::views::menu::PROCESSING;
use crate::bot::views::Reply;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId};
use tracing::{debug, warn};

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096 characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Splits `reply` into messages that fit [`TELEGRAM_MESSAGE_LIMIT`].
#[must_use]
pub fn split_reply(reply: &Reply) -> Vec<Reply> {
    let texts = crate::utils::split_long_message(&reply.text, TELEGRAM_MESSAGE_LIMIT);
    if texts.len() <= 1 {
        return vec![reply.clone()];
    }

    let last = texts.len() - 1;
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Reply {
            text,
            parse_mode: reply.parse_mode,
            keyboard: if i == last {
                reply.keyboard.clone()
            } else {
                None
            },
        })
        .collect()
}

/// Send one message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_reply_resilient(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<Message> {
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot.send_message(chat_id, reply.text.clone());
        if let Some(pm) = reply.parse_mode {
            req = req.parse_mode(pm);
        }
        if let Some(keyboard) = &reply.keyboard {
            req = req.reply_markup(keyboard.clone());
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_reply_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    reply: &Reply,
) -> Result<Message> {
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot.edit_message_text(chat_id, msg_id, reply.text.clone());
        if let Some(pm) = reply.parse_mode {
            req = req.parse_mode(pm);
        }
        if let Some(keyboard) = &reply.keyboard {
            req = req.reply_markup(keyboard.clone());
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Sends every reply in order, splitting long ones.
///
/// # Errors
///
/// Stops at the first message that cannot be sent.
pub async fn deliver(bot: &Bot, chat_id: ChatId, replies: &[Reply]) -> Result<()> {
    for reply in replies {
        for part in split_reply(reply) {
            send_reply_resilient(bot, chat_id, &part).await?;
        }
    }
    Ok(())
}

/// Sends the "Processing your question..." placeholder.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_placeholder(bot: &Bot, chat_id: ChatId) -> Result<Message> {
    send_reply_resilient(bot, chat_id, &Reply::plain(PROCESSING)).await
}

/// What to do with the first part after the placeholder edit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFallback {
    /// The placeholder already shows the text
    Keep,
    /// Send the part as a new message
    Resend,
}

/// Classifies a failed placeholder edit by its error text.
#[must_use]
pub fn edit_fallback(err_msg: &str) -> EditFallback {
    const ERROR_NOT_MODIFIED: &str = "message is not modified";
    const ERROR_NOT_FOUND: &str = "message to edit not found";

    if err_msg.contains(ERROR_NOT_MODIFIED) {
        debug!("Placeholder already up to date: {err_msg}");
        EditFallback::Keep
    } else if err_msg.contains(ERROR_NOT_FOUND) {
        debug!("Placeholder gone, sending a new message: {err_msg}");
        EditFallback::Resend
    } else {
        warn!("Failed to edit placeholder after retries: {err_msg}");
        EditFallback::Resend
    }
}

/// Replaces the placeholder with `reply`.
///
/// The first part is edited into the placeholder; if the placeholder is gone
/// or the edit keeps failing it is sent as a new message instead. Remaining
/// parts follow as new messages.
///
/// # Errors
///
/// Returns an error if a part can be neither edited in nor sent.
pub async fn deliver_into_placeholder(
    bot: &Bot,
    chat_id: ChatId,
    placeholder: MessageId,
    reply: &Reply,
) -> Result<()> {
    let mut parts = split_reply(reply).into_iter();
    if let Some(first) = parts.next() {
        if let Err(e) = edit_reply_resilient(bot, chat_id, placeholder, &first).await {
            if edit_fallback(&e.to_string()) == EditFallback::Resend {
                send_reply_resilient(bot, chat_id, &first).await?;
            }
        }
    }

    for part in parts {
        send_reply_resilient(bot, chat_id, &part).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::views::menu::back_keyboard;
    use teloxide::types::ParseMode;

    #[test]
    fn test_short_reply_is_untouched() {
        let reply = Reply::html("<b>hi</b>").with_keyboard(back_keyboard());
        assert_eq!(split_reply(&reply), vec![reply]);
    }

    #[test]
    fn test_keyboard_stays_on_last_part() {
        let text = "line of an answer\n".repeat(500);
        let reply = Reply::html(text).with_keyboard(back_keyboard());
        let parts = split_reply(&reply);

        assert!(parts.len() > 1);
        assert!(parts
            .iter()
            .all(|p| p.text.chars().count() <= TELEGRAM_MESSAGE_LIMIT));
        assert!(parts.iter().all(|p| p.parse_mode == Some(ParseMode::Html)));
        let (last, rest) = parts.split_last().expect("at least one part");
        assert!(last.keyboard.is_some());
        assert!(rest.iter().all(|p| p.keyboard.is_none()));
    }

    #[test]
    fn test_unchanged_placeholder_is_not_resent() {
        assert_eq!(
            edit_fallback(
                "Telegram edit error: Bad Request: message is not modified: specified new \
                 message content and reply markup are exactly the same"
            ),
            EditFallback::Keep
        );
        assert_eq!(
            edit_fallback("Telegram edit error: Bad Request: message to edit not found"),
            EditFallback::Resend
        );
        assert_eq!(
            edit_fallback("Telegram edit error: network error"),
            EditFallback::Resend
        );
    }
}

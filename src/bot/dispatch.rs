//! Update routing and the dispatch boundary
//!
//! Every endpoint runs its handler under `catch_unwind`, logs any failure and
//! returns success to the dispatcher, so one bad update never stops the
//! transport loop.

use crate::api::UserInfo;
use crate::bot::handlers::{self, BotContext, Command};
use crate::bot::resilient::{deliver, deliver_into_placeholder, send_placeholder};
use crate::bot::state::{Menu, MenuDialogue, MenuStorage};
use crate::bot::views::menu::{CALLBACK_LOADING, GENERIC_ERROR};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, User};
use tracing::{debug, error, warn};

/// Converts the Telegram sender into the bot's user record.
#[must_use]
pub fn user_info(user: &User) -> UserInfo {
    UserInfo {
        id: user.id.0.cast_signed(),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}

fn message_user(msg: &Message) -> UserInfo {
    msg.from.as_ref().map_or_else(
        || UserInfo {
            id: msg.chat.id.0,
            ..UserInfo::default()
        },
        user_info,
    )
}

/// Builds the update handler tree.
#[must_use]
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, MenuStorage, Menu>()
                .endpoint(handle_callback),
        )
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, MenuStorage, Menu>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some_and(is_command_like))
                        .endpoint(ignore_unknown_command),
                )
                .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text)),
        )
}

/// Whether `text` starts with a bot command, known or not.
///
/// Such messages never reach the question flow.
#[must_use]
pub fn is_command_like(text: &str) -> bool {
    text.strip_prefix('/')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn ignore_unknown_command(msg: Message) -> Result<(), teloxide::RequestError> {
    debug!(
        "Ignoring unknown command in chat {}: {}",
        msg.chat.id,
        msg.text().unwrap_or_default()
    );
    respond(())
}

/// Runs `work`, turning errors and panics into a log line and a generic
/// error message for the chat.
async fn guarded<F>(bot: &Bot, chat_id: ChatId, label: &str, work: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    let failure = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(_) => "handler panicked".to_string(),
    };

    error!("{label} handler error: {failure}");
    if let Err(e) = bot.send_message(chat_id, GENERIC_ERROR).await {
        warn!("Failed to report handler error to chat {chat_id}: {e}");
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: MenuDialogue,
    ctx: Arc<BotContext>,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id;
    let user = message_user(&msg);

    guarded(&bot, chat_id, "Command", async {
        let replies = handlers::handle_command(&ctx, &dialogue, &user, cmd).await?;
        deliver(&bot, chat_id, &replies).await
    })
    .await;
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: MenuDialogue,
    ctx: Arc<BotContext>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot
        .answer_callback_query(q.id.clone())
        .text(CALLBACK_LOADING)
        .await
    {
        warn!("Failed to answer callback query: {e}");
    }

    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.message.as_ref().map(|m| m.chat().id))
    else {
        return respond(());
    };
    let user = user_info(&q.from);

    guarded(&bot, chat_id, "Callback", async {
        let replies = handlers::handle_callback(&ctx, &dialogue, &user, data).await?;
        deliver(&bot, chat_id, &replies).await
    })
    .await;
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    dialogue: MenuDialogue,
    ctx: Arc<BotContext>,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id;
    let user = message_user(&msg);
    let text = msg.text().unwrap_or_default();

    guarded(&bot, chat_id, "Text", async {
        let admitted = match ctx.guard.admit(user.id, text).await {
            Ok(admitted) => admitted,
            Err(rejection) => {
                return match handlers::rejection_reply(rejection) {
                    Some(reply) => deliver(&bot, chat_id, &[reply]).await,
                    None => Ok(()),
                };
            }
        };

        let placeholder = send_placeholder(&bot, chat_id).await?;
        let reply = handlers::answer_question(&ctx, &dialogue, &user, &admitted.question).await?;
        deliver_into_placeholder(&bot, chat_id, placeholder.id, &reply).await
    })
    .await;
    respond(())
}

use crate::api::{CachedContent, CachedRag, SessionRecord, UserInfo};
use crate::bot::guard::{MessageGuard, Rejection};
use crate::bot::state::{MenuDialogue, MenuEvent};
use crate::bot::views::menu::{self, MenuAction, Reply};
use crate::utils::hash_user_id;
use anyhow::{anyhow, Result};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

/// Session log action for a question typed by the user
pub const ACTION_QUESTION: &str = "freely asking";
/// Session log action for the answer sent back
pub const ACTION_RESPONSE: &str = "response";
/// Session log factor of user-written messages
pub const FACTOR_USER: &str = "user";
/// Session log factor of RAG-written messages
pub const FACTOR_RAG: &str = "RAG";

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    /// Show the welcome message and main menu
    #[command(description = "Start the bot and display main menu.")]
    Start,
    /// Show the help text
    #[command(description = "Display the help message.")]
    Help,
    /// Show upcoming events
    #[command(description = "Show upcoming events.")]
    Events,
    /// Show the FAQ list
    #[command(description = "Display frequently asked questions.")]
    Faqs,
    /// Show assistant contacts
    #[command(description = "List available assistants.")]
    Assistants,
}

impl Command {
    /// The command as typed, used as the session log action.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::Help => "/help",
            Self::Events => "/events",
            Self::Faqs => "/faqs",
            Self::Assistants => "/assistants",
        }
    }
}

/// Everything the handlers need besides the update itself.
pub struct BotContext {
    /// Events, FAQs and assistants
    pub content: CachedContent,
    /// Question answering
    pub rag: CachedRag,
    /// Free-text flood protection
    pub guard: MessageGuard,
}

impl BotContext {
    /// Creates a context with the default guard.
    #[must_use]
    pub fn new(content: CachedContent, rag: CachedRag) -> Self {
        Self {
            content,
            rag,
            guard: MessageGuard::default(),
        }
    }

    /// Records one interaction in the background.
    pub fn log_interaction(&self, user: &UserInfo, action: &str, message: &str, factor: &str) {
        drop(
            self.content
                .record_session(SessionRecord::new(user, action, message, factor)),
        );
    }
}

async fn advance(dialogue: &MenuDialogue, event: MenuEvent) -> Result<()> {
    let current = dialogue
        .get_or_default()
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    dialogue
        .update(current.next(&event))
        .await
        .map_err(|e| anyhow!(e.to_string()))
}

/// Handles a bot command.
///
/// # Errors
///
/// Returns an error only if the dialogue storage fails; upstream outages are
/// rendered as replies.
pub async fn handle_command(
    ctx: &BotContext,
    dialogue: &MenuDialogue,
    user: &UserInfo,
    cmd: Command,
) -> Result<Vec<Reply>> {
    info!("User {} sent {}", hash_user_id(user.id), cmd.action());
    ctx.log_interaction(user, cmd.action(), "", FACTOR_USER);

    match cmd {
        Command::Start => start(dialogue, user).await,
        Command::Help => {
            advance(dialogue, MenuEvent::Info).await?;
            Ok(vec![Reply::html(menu::HELP_TEXT)])
        }
        Command::Events => events(ctx, dialogue).await,
        Command::Faqs => faqs(ctx, dialogue).await,
        Command::Assistants => assistants(ctx, dialogue).await,
    }
}

/// Handles an inline button press carrying `data`.
///
/// Unknown payloads produce no reply.
///
/// # Errors
///
/// See [`handle_command`].
pub async fn handle_callback(
    ctx: &BotContext,
    dialogue: &MenuDialogue,
    user: &UserInfo,
    data: &str,
) -> Result<Vec<Reply>> {
    ctx.log_interaction(user, data, "", FACTOR_USER);

    let Some(action) = MenuAction::parse(data) else {
        warn!(
            "Ignoring unknown callback data from user {}: {data}",
            hash_user_id(user.id)
        );
        return Ok(Vec::new());
    };

    match action {
        MenuAction::KnowledgePortal => {
            advance(dialogue, MenuEvent::AskTopic).await?;
            Ok(vec![Reply::plain(menu::KNOWLEDGE_PORTAL_PROMPT)])
        }
        MenuAction::SolanaSummit => {
            advance(dialogue, MenuEvent::AskTopic).await?;
            Ok(vec![Reply::plain(menu::SOLANA_SUMMIT_PROMPT)])
        }
        MenuAction::Events => events(ctx, dialogue).await,
        MenuAction::AccessSuperTeam => {
            advance(dialogue, MenuEvent::Info).await?;
            Ok(vec![
                Reply::plain(menu::ACCESS_PROMPT).with_keyboard(menu::access_keyboard())
            ])
        }
        MenuAction::Assistant => assistants(ctx, dialogue).await,
        MenuAction::Faq => faqs(ctx, dialogue).await,
        MenuAction::FaqAnswer(faq_id) => faq_answer(ctx, dialogue, &faq_id).await,
        MenuAction::Back => {
            advance(dialogue, MenuEvent::Back).await?;
            Ok(vec![
                Reply::plain(menu::MENU_PROMPT).with_keyboard(menu::main_menu_keyboard())
            ])
        }
    }
}

async fn start(dialogue: &MenuDialogue, user: &UserInfo) -> Result<Vec<Reply>> {
    advance(dialogue, MenuEvent::Start).await?;

    Ok(vec![
        Reply::plain(menu::welcome_message(&user.first_name)),
        Reply::html(menu::START_GUIDE),
        Reply::plain(menu::MENU_PROMPT).with_keyboard(menu::main_menu_keyboard()),
    ])
}

async fn events(ctx: &BotContext, dialogue: &MenuDialogue) -> Result<Vec<Reply>> {
    let events = match ctx.content.list_events().await {
        Ok(events) => events,
        Err(e) => {
            warn!("Error getting events: {e}");
            return Ok(vec![Reply::plain(menu::EVENTS_UNAVAILABLE)]);
        }
    };

    advance(dialogue, MenuEvent::OpenEvents).await?;
    info!("Found {} events", events.len());

    let reply = if events.is_empty() {
        Reply::plain(menu::NO_EVENTS)
    } else {
        Reply::html(menu::format_events(&events))
    };
    Ok(vec![reply.with_keyboard(menu::back_keyboard())])
}

async fn assistants(ctx: &BotContext, dialogue: &MenuDialogue) -> Result<Vec<Reply>> {
    let assistants = match ctx.content.list_assistants().await {
        Ok(assistants) => assistants,
        Err(e) => {
            warn!("Error getting assistants: {e}");
            return Ok(vec![Reply::plain(menu::ASSISTANTS_UNAVAILABLE)]);
        }
    };

    advance(dialogue, MenuEvent::Info).await?;

    let reply = if assistants.is_empty() {
        Reply::plain(menu::NO_ASSISTANTS)
    } else {
        Reply::html(menu::format_assistants(&assistants))
    };
    Ok(vec![reply.with_keyboard(menu::back_keyboard())])
}

async fn faqs(ctx: &BotContext, dialogue: &MenuDialogue) -> Result<Vec<Reply>> {
    let faqs = match ctx.content.list_faqs().await {
        Ok(faqs) => faqs,
        Err(e) => {
            warn!("Error getting FAQs: {e}");
            return Ok(vec![Reply::plain(menu::FAQS_UNAVAILABLE)]);
        }
    };

    let pages = menu::faq_keyboards(&faqs);
    if pages.is_empty() {
        advance(dialogue, MenuEvent::Info).await?;
        return Ok(vec![
            Reply::plain(menu::NO_FAQS).with_keyboard(menu::back_keyboard())
        ]);
    }

    advance(dialogue, MenuEvent::OpenFaqs).await?;
    Ok(pages
        .into_iter()
        .map(|keyboard| Reply::html(menu::FAQ_LIST_HEADER).with_keyboard(keyboard))
        .collect())
}

async fn faq_answer(ctx: &BotContext, dialogue: &MenuDialogue, faq_id: &str) -> Result<Vec<Reply>> {
    if faq_id.is_empty() {
        return Ok(vec![Reply::plain(menu::INVALID_FAQ_ID)]);
    }

    info!("Fetching FAQ answer for ID: {faq_id}");
    match ctx.content.get_faq(faq_id).await {
        Ok(Some(faq)) => {
            advance(dialogue, MenuEvent::OpenFaq(faq.id.clone())).await?;
            Ok(vec![
                Reply::html(menu::format_faq_answer(&faq)).with_keyboard(menu::back_keyboard())
            ])
        }
        Ok(None) => {
            warn!("FAQ with ID {faq_id} not found");
            Ok(vec![Reply::plain(menu::FAQ_NOT_FOUND)])
        }
        Err(e) => {
            warn!("Error getting FAQ answer: {e}");
            Ok(vec![Reply::plain(menu::FAQ_ANSWER_UNAVAILABLE)])
        }
    }
}

/// The reply for a message the guard turned away, if any.
///
/// A message dropped because another question is in flight gets no reply.
#[must_use]
pub fn rejection_reply(rejection: Rejection) -> Option<Reply> {
    match rejection {
        Rejection::Busy => None,
        Rejection::RateLimited => Some(Reply::plain(menu::RATE_LIMITED)),
        Rejection::InvalidCharacters => Some(Reply::plain(menu::INVALID_CHARACTERS)),
    }
}

/// Answers an admitted free-text question with exactly one RAG lookup.
///
/// The answer is sent as plain text. RAG failures become a friendly reply.
///
/// # Errors
///
/// See [`handle_command`].
pub async fn answer_question(
    ctx: &BotContext,
    dialogue: &MenuDialogue,
    user: &UserInfo,
    question: &str,
) -> Result<Reply> {
    info!("Processing message from user {}", hash_user_id(user.id));
    ctx.log_interaction(user, ACTION_QUESTION, question, FACTOR_USER);

    let context = user.id.to_string();
    let text = match ctx.rag.ask(question, Some(&context)).await {
        Ok(answer) if answer.trim().is_empty() => menu::RAG_FALLBACK.to_string(),
        Ok(answer) => answer,
        Err(e) => {
            warn!("Error getting RAG response: {e}");
            menu::RAG_UNAVAILABLE.to_string()
        }
    };

    ctx.log_interaction(user, ACTION_RESPONSE, &text, FACTOR_RAG);
    advance(dialogue, MenuEvent::Question).await?;
    Ok(Reply::plain(text))
}

//! Menu UI components
//!
//! Contains callback payloads, keyboards, text messages, and formatters for
//! the main menu, FAQ, events and assistant screens.

use crate::api::{AssistantEntry, EventEntry, FaqEntry};
use crate::config::{FAQ_PAGE_SIZE, SUPERTEAM_URL};
use html_escape::{encode_double_quoted_attribute, encode_text};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Callback constants
// ─────────────────────────────────────────────────────────────────────────────

/// Callback data for the "Knowledge Portal" button
pub const CB_KNOWLEDGE_PORTAL: &str = "knowledge_portal";
/// Callback data for the "Solana Summit Event" button
pub const CB_SOLANA_SUMMIT: &str = "solana_summit";
/// Callback data for the "Events" button
pub const CB_EVENTS: &str = "events";
/// Callback data for the "Access Solana SuperTeam" button
pub const CB_ACCESS: &str = "access_solona";
/// Callback data for the "Assistant" button
pub const CB_ASSISTANT: &str = "assistant";
/// Callback data for the "FAQ" button
pub const CB_FAQ: &str = "faq";
/// Prefix of the callback data of a FAQ question button
pub const CB_FAQ_ANSWER_PREFIX: &str = "faq_answer_";
/// Callback data for the "Back" button
pub const CB_BACK: &str = "back";

/// A decoded inline button press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuAction {
    /// Prompt for a question about the community
    KnowledgePortal,
    /// Prompt for a question about the summit
    SolanaSummit,
    /// Show upcoming events
    Events,
    /// Show the website link
    AccessSuperTeam,
    /// Show assistant contacts
    Assistant,
    /// Show the FAQ list
    Faq,
    /// Show one FAQ answer; the id may be empty if the payload was truncated
    FaqAnswer(String),
    /// Return to the main menu
    Back,
}

impl MenuAction {
    /// Decodes callback data, or `None` for payloads this bot never sends.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix(CB_FAQ_ANSWER_PREFIX) {
            return Some(Self::FaqAnswer(id.trim().to_string()));
        }

        match data {
            CB_KNOWLEDGE_PORTAL => Some(Self::KnowledgePortal),
            CB_SOLANA_SUMMIT => Some(Self::SolanaSummit),
            CB_EVENTS => Some(Self::Events),
            CB_ACCESS => Some(Self::AccessSuperTeam),
            CB_ASSISTANT => Some(Self::Assistant),
            CB_FAQ => Some(Self::Faq),
            CB_BACK => Some(Self::Back),
            _ => None,
        }
    }

    /// Encodes the action as callback data.
    #[must_use]
    pub fn callback_data(&self) -> String {
        match self {
            Self::KnowledgePortal => CB_KNOWLEDGE_PORTAL.to_string(),
            Self::SolanaSummit => CB_SOLANA_SUMMIT.to_string(),
            Self::Events => CB_EVENTS.to_string(),
            Self::AccessSuperTeam => CB_ACCESS.to_string(),
            Self::Assistant => CB_ASSISTANT.to_string(),
            Self::Faq => CB_FAQ.to_string(),
            Self::FaqAnswer(id) => format!("{CB_FAQ_ANSWER_PREFIX}{id}"),
            Self::Back => CB_BACK.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────────────────────────────────────

/// A rendered message, ready to be delivered to a chat.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// Message text
    pub text: String,
    /// `None` sends the text verbatim
    pub parse_mode: Option<ParseMode>,
    /// Inline keyboard attached to the message
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    /// Text sent without any markup parsing.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    /// Text parsed as Telegram HTML; dynamic parts must already be escaped.
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(ParseMode::Html),
            keyboard: None,
        }
    }

    /// Attaches an inline keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Command overview sent after the greeting
pub const START_GUIDE: &str = "<b>Available Commands:</b>
• /start - Start the bot and display main menu
• /events - Show upcoming events
• /faqs - Display frequently asked questions
• /assistants - List available assistants
• /help - Display this help message

<b>Bot Features:</b>
• Ask questions about Solana SuperTeam
• Get information about events
• Browse FAQs
• Connect with assistants

Use the buttons below to navigate or type your question anytime.";

/// Reply to `/help`
pub const HELP_TEXT: &str = "<b>Solana SuperTeam Bot Help</b>

<b>Available Commands:</b>
• /start - Start the bot and display main menu
• /events - Show upcoming events
• /faqs - Display frequently asked questions
• /assistants - List available assistants
• /help - Display this help message

<b>How to Use:</b>
1. Use the menu buttons to navigate
2. Type your questions directly
3. Browse FAQs for common questions
4. Check upcoming events with /events
5. Find assistants with /assistants

If you need further assistance, please contact an admin.";

/// Text above the main menu keyboard
pub const MENU_PROMPT: &str = "What would you like to know?";
/// Prompt after "Knowledge Portal"
pub const KNOWLEDGE_PORTAL_PROMPT: &str = "What would you like to know about Solana Superteam?";
/// Prompt after "Solana Summit Event"
pub const SOLANA_SUMMIT_PROMPT: &str =
    "What would you like to know about the Solana Summit event?";
/// Text above the website link
pub const ACCESS_PROMPT: &str = "Click below to access Solana SuperTeam:";
/// Header of every FAQ keyboard message
pub const FAQ_LIST_HEADER: &str = "📋 <b>Frequently Asked Questions:</b>";

/// Content API down while loading events
pub const EVENTS_UNAVAILABLE: &str = "Unable to fetch events at this time. Please try again later.";
/// Content API down while loading assistants
pub const ASSISTANTS_UNAVAILABLE: &str =
    "Unable to fetch assistants at this time. Please try again later.";
/// Content API down while loading FAQs
pub const FAQS_UNAVAILABLE: &str = "Unable to fetch FAQs at this time. Please try again later.";
/// Content API down while loading one answer
pub const FAQ_ANSWER_UNAVAILABLE: &str =
    "Unable to fetch FAQ answer at this time. Please try again later.";

/// Empty event list
pub const NO_EVENTS: &str = "No upcoming events found.";
/// Empty assistant list
pub const NO_ASSISTANTS: &str = "No assistants available at the moment.";
/// Empty FAQ list
pub const NO_FAQS: &str = "No FAQs available at the moment.";
/// Selected FAQ no longer exists
pub const FAQ_NOT_FOUND: &str =
    "This question is no longer available. Please select another question.";
/// FAQ button without an id
pub const INVALID_FAQ_ID: &str = "Invalid FAQ ID. Please try again or select another question.";

/// Placeholder shown while the RAG service works
pub const PROCESSING: &str = "Processing your question...";
/// The RAG service had no answer
pub const RAG_FALLBACK: &str =
    "I don't know how to answer that. Let me forward this to the admin team.";
/// The RAG service could not be reached
pub const RAG_UNAVAILABLE: &str =
    "Sorry, I cannot process your request at this time. Please try again later.";
/// Too many messages in the rate-limit window
pub const RATE_LIMITED: &str =
    "You have sent too many messages. Please wait a moment and try again later.";
/// Message failed the character whitelist
pub const INVALID_CHARACTERS: &str =
    "Your message contains invalid characters. Please use only letters, numbers and basic characters.";
/// Popup shown on every button press
pub const CALLBACK_LOADING: &str = "Loading...";
/// Unexpected failure inside a handler
pub const GENERIC_ERROR: &str = "❌ An error occurred. Please try again later.";

/// Greeting for `/start`; plain text, so the name needs no escaping.
#[must_use]
pub fn welcome_message(first_name: &str) -> String {
    format!(
        "Hello {first_name}! Welcome to the Solana SuperTeam Bot. I can help you with information about Solana SuperTeam and events."
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatters
// ─────────────────────────────────────────────────────────────────────────────

fn push_line(out: &mut String, icon: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        out.push_str(icon);
        out.push(' ');
        out.push_str(&encode_text(value));
        out.push('\n');
    }
}

/// Renders the event list as HTML, one block per event.
///
/// Every tag opens and closes on the same line, so the text may be split on
/// line boundaries.
#[must_use]
pub fn format_events(events: &[EventEntry]) -> String {
    let mut out = String::from("📅 <b>Upcoming Events:</b>\n\n");

    for event in events {
        let title = if event.title.trim().is_empty() {
            "No name"
        } else {
            event.title.trim()
        };
        out.push_str(&format!("🎯 <b>{}</b>\n", encode_text(title)));
        push_line(&mut out, "📝", Some(&event.description));
        push_line(&mut out, "📆", Some(&event.date));
        push_line(&mut out, "🕒", Some(&event.time));
        push_line(&mut out, "📍", event.address.as_deref());
        push_line(&mut out, "💰", event.price.as_deref());
        if let Some(link) = event.link.as_deref().filter(|l| l.starts_with("http")) {
            out.push_str(&format!(
                "🔗 <a href=\"{}\">Details</a>\n",
                encode_double_quoted_attribute(link)
            ));
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

/// Renders the assistant contact list as HTML.
#[must_use]
pub fn format_assistants(assistants: &[AssistantEntry]) -> String {
    let mut out = String::from("🆘 <b>Available Assistants:</b>\n\n");

    for assistant in assistants {
        let or = |value: &str, default: &'static str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                encode_text(value.trim()).into_owned()
            }
        };
        out.push_str(&format!("👤 <b>{}</b>\n", or(&assistant.name, "No name")));
        out.push_str(&format!(
            "🔹 Type: {}\n",
            or(&assistant.support_type, "No type")
        ));
        out.push_str(&format!(
            "📞 Contact: {}\n\n",
            or(&assistant.phone_number, "No phone number")
        ));
    }

    out.trim_end().to_string()
}

/// Renders one FAQ answer as HTML.
#[must_use]
pub fn format_faq_answer(faq: &FaqEntry) -> String {
    let answer = if faq.answer.trim().is_empty() {
        "No answer available"
    } else {
        faq.answer.trim()
    };
    format!(
        "❓ <b>{}</b>\n\n❗ {}",
        encode_text(faq.question.trim()),
        encode_text(answer)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Longest FAQ question shown on a button before it is cut.
const FAQ_BUTTON_MAX_CHARS: usize = 60;

/// The main menu, three rows of two buttons.
#[must_use]
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("Knowledge Portal", CB_KNOWLEDGE_PORTAL),
            InlineKeyboardButton::callback("Solana Summit Event", CB_SOLANA_SUMMIT),
        ],
        vec![
            InlineKeyboardButton::callback("Events", CB_EVENTS),
            InlineKeyboardButton::callback("Access Solana SuperTeam", CB_ACCESS),
        ],
        vec![
            InlineKeyboardButton::callback("Assistant", CB_ASSISTANT),
            InlineKeyboardButton::callback("FAQ", CB_FAQ),
        ],
    ])
}

fn back_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback("⬅️ Back", CB_BACK)
}

/// A single "Back" button.
#[must_use]
pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![back_button()]])
}

/// The website link followed by "Back".
#[must_use]
pub fn access_keyboard() -> InlineKeyboardMarkup {
    match url::Url::parse(SUPERTEAM_URL) {
        Ok(url) => InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::url("Access Solana SuperTeam", url)],
            vec![back_button()],
        ]),
        Err(e) => {
            debug!("Invalid website URL {SUPERTEAM_URL}: {e}");
            back_keyboard()
        }
    }
}

/// FAQ question keyboards, one per group of [`FAQ_PAGE_SIZE`] questions.
///
/// The last keyboard also carries "Back". Entries without an id cannot be
/// opened and are left out.
#[must_use]
pub fn faq_keyboards(faqs: &[FaqEntry]) -> Vec<InlineKeyboardMarkup> {
    let selectable: Vec<&FaqEntry> = faqs.iter().filter(|faq| !faq.id.is_empty()).collect();
    let mut pages: Vec<Vec<Vec<InlineKeyboardButton>>> = selectable
        .chunks(FAQ_PAGE_SIZE)
        .map(|group| {
            group
                .iter()
                .map(|faq| {
                    let label = crate::utils::truncate_str(faq.question.trim(), FAQ_BUTTON_MAX_CHARS);
                    vec![InlineKeyboardButton::callback(
                        label,
                        MenuAction::FaqAnswer(faq.id.clone()).callback_data(),
                    )]
                })
                .collect()
        })
        .collect();

    if let Some(last) = pages.last_mut() {
        last.push(vec![back_button()]);
    }

    pages.into_iter().map(InlineKeyboardMarkup::new).collect()
}

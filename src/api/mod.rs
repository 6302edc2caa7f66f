//! Clients for the external content and RAG services
//!
//! The bot only reads FAQ, event and assistant data; the single write is the
//! interaction log posted to the content API's session endpoint.

/// Read-through caching in front of the clients
pub mod cached;
/// Content API client (events, FAQs, assistants, session log)
pub mod content;
/// Shared HTTP plumbing
pub mod http;
/// RAG question answering client
pub mod rag;

pub use cached::{CachedContent, CachedRag};
pub use content::ContentClient;
pub use rag::RagClient;

use crate::error::BotError;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A frequently asked question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    /// Identifier; the API sends either a string or a number
    #[serde(default, alias = "_id", deserialize_with = "lenient::string")]
    pub id: String,
    /// Question text shown on the button
    #[serde(default, deserialize_with = "lenient::string")]
    pub question: String,
    /// Answer text
    #[serde(default, deserialize_with = "lenient::string")]
    pub answer: String,
    /// Optional grouping
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub category: Option<String>,
}

/// An upcoming community event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Event name (`name` in the API payload)
    #[serde(default, alias = "name", deserialize_with = "lenient::string")]
    pub title: String,
    /// Free-form description
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Date as sent by the API
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    /// Time as sent by the API
    #[serde(default, deserialize_with = "lenient::string")]
    pub time: String,
    /// Venue
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    /// Ticket price
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub price: Option<String>,
    /// Registration or details link
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub link: Option<String>,
}

/// A community assistant who can be contacted for support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantEntry {
    /// Display name
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Kind of support offered
    #[serde(default, deserialize_with = "lenient::string")]
    pub support_type: String,
    /// Contact number
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone_number: String,
}

/// The Telegram user behind an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Telegram user id
    pub id: i64,
    /// `@username`, if set
    pub username: Option<String>,
    /// First name
    pub first_name: String,
    /// Last name, if set
    pub last_name: Option<String>,
}

/// One interaction, as recorded by the content API's session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    /// Random id of this record
    pub session_id: String,
    /// Telegram user id
    pub user_id: i64,
    /// Username or empty
    pub username: String,
    /// First name or empty
    pub first_name: String,
    /// Last name or empty
    pub last_name: String,
    /// Local (UTC+7) timestamp in RFC 3339
    pub timestamp: String,
    /// Command, callback payload or free-text marker
    pub action: String,
    /// Message body, if any
    pub message: String,
    /// Who produced the message: `user` or `RAG`
    pub factor: String,
}

/// Offset of the community's home timezone (Asia/Ho_Chi_Minh, no DST).
const LOCAL_UTC_OFFSET_SECS: i32 = 7 * 3600;

impl SessionRecord {
    /// Builds a record for `user` stamped with the current local time.
    #[must_use]
    pub fn new(user: &UserInfo, action: &str, message: &str, factor: &str) -> Self {
        let timestamp = FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECS)
            .map_or_else(
                || Utc::now().to_rfc3339(),
                |tz| Utc::now().with_timezone(&tz).to_rfc3339(),
            );

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id,
            username: user.username.clone().unwrap_or_default(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone().unwrap_or_default(),
            timestamp,
            action: action.to_string(),
            message: message.to_string(),
            factor: factor.to_string(),
        }
    }
}

/// Read access to the content API.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Upcoming events.
    async fn list_events(&self) -> Result<Vec<EventEntry>, BotError>;

    /// All FAQ entries.
    async fn list_faqs(&self) -> Result<Vec<FaqEntry>, BotError>;

    /// Assistant contacts.
    async fn list_assistants(&self) -> Result<Vec<AssistantEntry>, BotError>;

    /// Appends one record to the interaction log.
    async fn record_session(&self, record: &SessionRecord) -> Result<(), BotError>;

    /// A single FAQ entry; the API has no per-entry endpoint, so the list is
    /// searched.
    async fn get_faq(&self, id: &str) -> Result<Option<FaqEntry>, BotError> {
        Ok(self.list_faqs().await?.into_iter().find(|faq| faq.id == id))
    }
}

/// Question answering backed by the RAG service.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Answers `question`; `context` identifies the asking user.
    async fn ask(&self, question: &str, context: Option<&str>) -> Result<String, BotError>;
}

/// Deserializers tolerant of the loosely typed content API payloads.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn render(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(render(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(render(Value::deserialize(deserializer)?).filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_faq_accepts_numeric_id() {
        let faq: FaqEntry = serde_json::from_value(json!({
            "id": 12,
            "question": "What is SuperTeam?",
            "answer": "A community.",
        }))
        .expect("faq decodes");

        assert_eq!(faq.id, "12");
        assert_eq!(faq.category, None);
    }

    #[test]
    fn test_event_reads_name_and_numeric_price() {
        let event: EventEntry = serde_json::from_value(json!({
            "name": "Solana Summit",
            "description": "Annual meetup",
            "date": "2025-05-01",
            "time": "18:00",
            "price": 0,
            "address": null,
        }))
        .expect("event decodes");

        assert_eq!(event.title, "Solana Summit");
        assert_eq!(event.price.as_deref(), Some("0"));
        assert_eq!(event.address, None);
        assert_eq!(event.link, None);
    }

    #[test]
    fn test_session_record_defaults_missing_names() {
        let user = UserInfo {
            id: 42,
            username: None,
            first_name: "Lan".into(),
            last_name: None,
        };
        let record = SessionRecord::new(&user, "/start", "", "user");

        assert_eq!(record.user_id, 42);
        assert_eq!(record.username, "");
        assert_eq!(record.last_name, "");
        assert!(record.timestamp.ends_with("+07:00"));
        assert_eq!(record.session_id.len(), 36);
    }
}

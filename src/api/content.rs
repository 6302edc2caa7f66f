use super::http::{get_json, post_json_discard};
use super::{AssistantEntry, ContentApi, EventEntry, FaqEntry, SessionRecord};
use crate::error::BotError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

const EVENTS_PATH: &str = "/knowledge/closest-events";
const FAQS_PATH: &str = "/faq";
const ASSISTANTS_PATH: &str = "/sos";
const SESSION_PATH: &str = "/session";

/// HTTP client for the MongoDB-backed content API.
#[derive(Clone)]
pub struct ContentClient {
    http: HttpClient,
    base_url: String,
}

impl ContentClient {
    /// Creates a client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        wrapper: &str,
    ) -> Result<Vec<T>, BotError> {
        let body = get_json(&self.http, &self.url(path))
            .await
            .map_err(|e| BotError::ContentUnavailable(format!("GET {path}: {e}")))?;
        extract_list(body, wrapper)
            .map_err(|e| BotError::ContentUnavailable(format!("GET {path}: {e}")))
    }
}

#[async_trait]
impl ContentApi for ContentClient {
    async fn list_events(&self) -> Result<Vec<EventEntry>, BotError> {
        self.fetch_list(EVENTS_PATH, "events").await
    }

    async fn list_faqs(&self) -> Result<Vec<FaqEntry>, BotError> {
        self.fetch_list(FAQS_PATH, "faqs").await
    }

    async fn list_assistants(&self) -> Result<Vec<AssistantEntry>, BotError> {
        self.fetch_list(ASSISTANTS_PATH, "assistants").await
    }

    async fn record_session(&self, record: &SessionRecord) -> Result<(), BotError> {
        post_json_discard(&self.http, &self.url(SESSION_PATH), record)
            .await
            .map_err(|e| BotError::ContentUnavailable(format!("POST {SESSION_PATH}: {e}")))
    }
}

/// Accepts either a bare JSON array or an object wrapping the array under
/// `wrapper`. Items that do not decode are skipped.
fn extract_list<T: DeserializeOwned>(body: Value, wrapper: &str) -> Result<Vec<T>, String> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(wrapper) {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(format!("`{wrapper}` is not a list: {other}")),
            None => Vec::new(),
        },
        other => return Err(format!("unexpected payload: {other}")),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping malformed {wrapper} entry: {e}");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_bare_and_wrapped_lists() {
        let bare: Vec<FaqEntry> =
            extract_list(json!([{"id": "1", "question": "q", "answer": "a"}]), "faqs")
                .expect("bare list");
        let wrapped: Vec<FaqEntry> = extract_list(
            json!({"faqs": [{"id": "1", "question": "q", "answer": "a"}]}),
            "faqs",
        )
        .expect("wrapped list");

        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn test_extract_object_without_wrapper_is_empty() {
        let events: Vec<EventEntry> =
            extract_list(json!({"status": "ok"}), "events").expect("empty list");
        assert!(events.is_empty());
    }

    #[test]
    fn test_extract_rejects_scalars() {
        let result: Result<Vec<EventEntry>, _> = extract_list(json!("oops"), "events");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_skips_malformed_items() {
        let faqs: Vec<FaqEntry> = extract_list(
            json!([{"id": "1", "question": "q", "answer": "a"}, "not an object"]),
            "faqs",
        )
        .expect("list decodes");
        assert_eq!(faqs.len(), 1);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ContentClient::new(HttpClient::new(), "https://content.example/api/");
        assert_eq!(
            client.url(FAQS_PATH),
            "https://content.example/api/faq"
        );
    }
}

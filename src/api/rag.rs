use super::http::post_json;
use super::RagApi;
use crate::error::BotError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

/// HTTP client for the RAG question answering endpoint.
///
/// Makes exactly one attempt per question; the service is expected to be
/// slow after cold starts and failures are surfaced to the user instead.
#[derive(Clone)]
pub struct RagClient {
    http: HttpClient,
    url: String,
}

impl RagClient {
    /// Creates a client posting questions to `url`.
    #[must_use]
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RagApi for RagClient {
    async fn ask(&self, question: &str, context: Option<&str>) -> Result<String, BotError> {
        let request = AskRequest {
            query: question,
            user_id: context,
        };

        let body = post_json(&self.http, &self.url, &request)
            .await
            .map_err(BotError::RagUnavailable)?;

        Ok(extract_answer(body))
    }
}

/// Picks the answer out of the RAG payload: `response`, then `answer`, then
/// the payload itself.
fn extract_answer(body: Value) -> String {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    if let Some(answer) = field("response").or_else(|| field("answer")) {
        return answer;
    }

    match body {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

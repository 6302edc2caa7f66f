//! HTTP utilities for the API clients
//!
//! Provides the shared client constructor and request helpers; callers map
//! the returned failure description onto their own error variant.

use crate::config::{get_api_timeout_secs, API_CONNECT_TIMEOUT_SECS};
use reqwest::{Client as HttpClient, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Creates an HTTP client with the standard API timeouts.
///
/// Uses `API_TIMEOUT_SECS` (default 5s) for the whole request and a 3s
/// connect timeout, so a cold upstream cannot stall a handler.
#[must_use]
pub fn create_http_client() -> HttpClient {
    create_http_client_with_timeout(Duration::from_secs(get_api_timeout_secs()))
}

/// Creates an HTTP client with a custom total timeout.
#[must_use]
pub fn create_http_client_with_timeout(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(API_CONNECT_TIMEOUT_SECS).min(timeout))
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Sends a GET request and returns the parsed JSON body.
///
/// # Errors
///
/// Returns a description of the failure on connectivity errors, timeouts,
/// non-success status codes or undecodable bodies.
pub async fn get_json(client: &HttpClient, url: &str) -> Result<Value, String> {
    let response = client.get(url).send().await.map_err(describe_transport)?;
    read_json(response).await
}

/// Sends a POST request with a JSON body and returns the parsed JSON body.
///
/// # Errors
///
/// See [`get_json`].
pub async fn post_json<B: Serialize + ?Sized>(
    client: &HttpClient,
    url: &str,
    body: &B,
) -> Result<Value, String> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(describe_transport)?;
    read_json(response).await
}

/// Sends a POST request with a JSON body, ignoring the response body.
///
/// # Errors
///
/// See [`get_json`].
pub async fn post_json_discard<B: Serialize + ?Sized>(
    client: &HttpClient,
    url: &str,
    body: &B,
) -> Result<(), String> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(describe_transport)?;
    check_status(response).await.map(|_| ())
}

async fn read_json(response: Response) -> Result<Value, String> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| format!("invalid JSON body: {e}"))
}

async fn check_status(response: Response) -> Result<Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(describe_status(status, &error_text))
}

fn describe_transport(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        format!("network error: {err}")
    }
}

/// Renders a non-success response without leaking HTML error pages.
fn describe_status(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        format!("HTTP {status} (server returned HTML error page)")
    } else if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status} - {}", crate::utils::truncate_str(body, 200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_html_error_pages_are_hidden() {
        let text = describe_status(
            StatusCode::BAD_GATEWAY,
            "<!DOCTYPE html><html><body>nginx</body></html>",
        );
        assert_eq!(
            text,
            "HTTP 502 Bad Gateway (server returned HTML error page)"
        );
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let text = describe_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(text.starts_with("HTTP 500 Internal Server Error - "));
        assert!(text.len() < 300);
    }
}

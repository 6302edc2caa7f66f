//! Liveness endpoint for hosting platforms.
//!
//! Answers `GET`/`HEAD` on `/health` and `/` without touching any upstream
//! service, so the probe stays green while the content or RAG API is down.

use axum::{http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Name reported in the health payload
pub const SERVICE_NAME: &str = "superteam-bot";

/// `GET /health` and `GET /`; `HEAD` is served by the same route without a body.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Builds the health router; every other path answers 404.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(health))
        .fallback(not_found)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<S>(listener: TcpListener, app: Router, shutdown: S)
where
    S: Future<Output = ()> + Send + 'static,
{
    match listener.local_addr() {
        Ok(addr) => info!("HTTP server listening on {addr}"),
        Err(e) => error!("HTTP server listener has no local address: {e}"),
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("HTTP server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn call(method: Method, uri: &str) -> axum::http::Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        router().oneshot(request).await.expect("router is infallible")
    }

    #[tokio::test]
    async fn test_health_returns_status_json() {
        let resp = call(Method::GET, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = resp
            .into_body()
            .collect()
            .await
            .expect("body reads")
            .to_bytes();
        let json: Value = serde_json::from_slice(&body).expect("body is JSON");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_root_and_head_are_healthy() {
        assert_eq!(call(Method::GET, "/").await.status(), StatusCode::OK);
        assert_eq!(call(Method::HEAD, "/health").await.status(), StatusCode::OK);
        assert_eq!(call(Method::HEAD, "/").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        assert_eq!(
            call(Method::GET, "/metrics").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            call(Method::HEAD, "/nope").await.status(),
            StatusCode::NOT_FOUND
        );
    }
}

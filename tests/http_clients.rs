use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use superteam_bot::api::http::{create_http_client, create_http_client_with_timeout};
use superteam_bot::api::{ContentApi, ContentClient, RagApi, RagClient, SessionRecord, UserInfo};
use superteam_bot::error::BotError;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Upstream {
    sessions: Arc<Mutex<Vec<Value>>>,
    rag_requests: Arc<Mutex<Vec<Value>>>,
}

async fn faqs() -> Json<Value> {
    Json(json!([
        {"id": 1, "question": "What is SuperTeam?", "answer": "A community."},
        {"_id": "65f0c2", "question": "How do I join?", "answer": "Apply online.", "category": "membership"}
    ]))
}

async fn events() -> Json<Value> {
    Json(json!({"events": [
        {"name": "Solana Summit", "date": "2025-05-01", "time": "18:00", "price": 0}
    ]}))
}

async fn assistants_down() -> (StatusCode, &'static str) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "<!DOCTYPE html><html>upstream exploded</html>",
    )
}

async fn session(State(up): State<Upstream>, Json(body): Json<Value>) -> StatusCode {
    up.sessions.lock().expect("sessions lock").push(body);
    StatusCode::CREATED
}

async fn rag(State(up): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    up.rag_requests.lock().expect("rag lock").push(body);
    Json(json!({"response": format!("Answer to: {query}")}))
}

async fn rag_down() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn rag_slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({"response": "too late"}))
}

/// Starts the fake upstream and returns its base URL.
async fn spawn_upstream() -> (String, Upstream) {
    let state = Upstream::default();
    let app = Router::new()
        .route("/api/faq", get(faqs))
        .route("/api/knowledge/closest-events", get(events))
        .route("/api/sos", get(assistants_down))
        .route("/api/session", post(session))
        .route("/rag", post(rag))
        .route("/rag-down", post(rag_down))
        .route("/rag-slow", post(rag_slow))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server runs");
    });

    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn test_content_client_reads_lists() {
    let (base, _) = spawn_upstream().await;
    let client = ContentClient::new(create_http_client(), format!("{base}/api/"));

    let faqs = client.list_faqs().await.expect("faqs load");
    assert_eq!(faqs.len(), 2);
    assert_eq!(faqs[0].id, "1");
    assert_eq!(faqs[1].id, "65f0c2");
    assert_eq!(faqs[1].category.as_deref(), Some("membership"));

    let events = client.list_events().await.expect("events load");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Solana Summit");
    assert_eq!(events[0].price.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_content_client_get_faq_searches_list() {
    let (base, _) = spawn_upstream().await;
    let client = ContentClient::new(create_http_client(), format!("{base}/api"));

    let found = client.get_faq("65f0c2").await.expect("faqs load");
    assert_eq!(found.map(|f| f.question), Some("How do I join?".to_string()));
    assert!(client.get_faq("missing").await.expect("faqs load").is_none());
}

#[tokio::test]
async fn test_non_success_status_is_content_unavailable() {
    let (base, _) = spawn_upstream().await;
    let client = ContentClient::new(create_http_client(), format!("{base}/api"));

    match client.list_assistants().await {
        Err(BotError::ContentUnavailable(reason)) => {
            assert!(reason.contains("500"), "reason: {reason}");
            assert!(!reason.contains("upstream exploded"), "reason: {reason}");
        }
        other => panic!("expected ContentUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_content_api_is_content_unavailable() {
    let client = ContentClient::new(create_http_client(), "http://127.0.0.1:1/api");
    assert!(matches!(
        client.list_faqs().await,
        Err(BotError::ContentUnavailable(_))
    ));
}

#[tokio::test]
async fn test_session_record_is_posted() {
    let (base, upstream) = spawn_upstream().await;
    let client = ContentClient::new(create_http_client(), format!("{base}/api"));
    let user = UserInfo {
        id: 42,
        username: Some("lan".to_string()),
        first_name: "Lan".to_string(),
        last_name: None,
    };

    client
        .record_session(&SessionRecord::new(&user, "/start", "", "user"))
        .await
        .expect("session saved");

    let sessions = upstream.sessions.lock().expect("sessions lock");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["user_id"], 42);
    assert_eq!(sessions[0]["action"], "/start");
    assert_eq!(sessions[0]["username"], "lan");
}

#[tokio::test]
async fn test_rag_client_posts_query_and_user() {
    let (base, upstream) = spawn_upstream().await;
    let client = RagClient::new(create_http_client(), format!("{base}/rag"));

    let answer = client
        .ask("What is SuperTeam?", Some("42"))
        .await
        .expect("rag answers");
    assert_eq!(answer, "Answer to: What is SuperTeam?");

    let requests = upstream.rag_requests.lock().expect("rag lock");
    assert_eq!(
        *requests,
        vec![json!({"query": "What is SuperTeam?", "user_id": "42"})]
    );
}

#[tokio::test]
async fn test_rag_failures_are_rag_unavailable() {
    let (base, _) = spawn_upstream().await;

    let client = RagClient::new(create_http_client(), format!("{base}/rag-down"));
    match client.ask("Hello", None).await {
        Err(BotError::RagUnavailable(reason)) => assert!(reason.contains("503")),
        other => panic!("expected RagUnavailable, got {other:?}"),
    }

    let slow = RagClient::new(
        create_http_client_with_timeout(Duration::from_millis(200)),
        format!("{base}/rag-slow"),
    );
    match slow.ask("Hello", None).await {
        Err(BotError::RagUnavailable(reason)) => assert!(reason.contains("timed out")),
        other => panic!("expected RagUnavailable, got {other:?}"),
    }
}

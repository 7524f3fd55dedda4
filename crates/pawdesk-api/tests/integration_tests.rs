//! Integration tests for the Pawdesk API.
//!
//! Drives the full router (orchestrator + SQLite + mock gateway) through
//! tower's oneshot, covering happy paths, error paths, and the end-to-end
//! booking and cancellation scenarios. Each test is independent with its own
//! in-memory state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use pawdesk_api::create_router;
use pawdesk_api::handlers::{HealthResponse, HistoryResponse, SendMessageResponse};
use pawdesk_api::state::AppState;
use pawdesk_chat::{ChatOrchestrator, CompletionGateway, MockGateway};
use pawdesk_core::config::PawdeskConfig;
use pawdesk_storage::Database;

// =============================================================================
// Helpers
// =============================================================================

/// Create a fresh AppState with in-memory DB and the given gateway.
fn make_state_with_gateway(gateway: Arc<dyn CompletionGateway>) -> AppState {
    let config = PawdeskConfig::default();
    let db = Arc::new(Database::in_memory().unwrap());
    let orchestrator = ChatOrchestrator::new(Arc::clone(&db), gateway, &config.chat);
    AppState::new(config, db, orchestrator)
}

/// Create a fresh router over a mock gateway with a canned reply.
fn make_app() -> axum::Router {
    make_app_with_gateway(Arc::new(MockGateway::new("Happy to help with that!")))
}

fn make_app_with_gateway(gateway: Arc<dyn CompletionGateway>) -> axum::Router {
    create_router(make_state_with_gateway(gateway))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

/// Send one chat message and parse the response, asserting 200.
async fn send_message(app: &axum::Router, session: &str, message: &str) -> SendMessageResponse {
    let req = post_json(
        "/api/messages",
        json!({"sessionId": session, "message": message}),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let app = make_app();
    let resp = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.total_conversations, 0);
    assert_eq!(health.total_appointments, 0);
}

// =============================================================================
// POST /api/messages - request validation
// =============================================================================

#[tokio::test]
async fn test_message_without_session_id_is_400() {
    let app = make_app();
    let resp = app
        .oneshot(post_json("/api/messages", json!({"message": "hello"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_message_without_message_is_400() {
    let app = make_app();
    let resp = app
        .oneshot(post_json("/api/messages", json!({"sessionId": "s1"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_whitespace_message_is_400() {
    let app = make_app();
    let resp = app
        .oneshot(post_json(
            "/api/messages",
            json!({"sessionId": "s1", "message": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// POST /api/messages - free-form turns
// =============================================================================

#[tokio::test]
async fn test_free_form_turn_returns_gateway_reply() {
    let app = make_app();
    let out = send_message(&app, "s1", "Why is my dog scratching?").await;

    assert_eq!(out.session_id, "s1");
    assert_eq!(out.message, "Happy to help with that!");
    assert!(!out.booking_active);
    assert!(out.appointment_created.is_none());
}

#[tokio::test]
async fn test_gateway_failure_is_503_and_user_message_kept() {
    let app = make_app_with_gateway(Arc::new(MockGateway::failing()));

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/messages",
            json!({"sessionId": "s1", "message": "tell me about parrots"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "service_unavailable");

    // The turn's user message is still recorded; no bot reply is.
    let resp = app.oneshot(get("/api/history/s1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].content, "tell me about parrots");
}

// =============================================================================
// End-to-end booking scenario
// =============================================================================

#[tokio::test]
async fn test_full_booking_scenario() {
    let app = make_app();

    let out = send_message(&app, "s1", "I want to book an appointment").await;
    assert!(out.booking_active);
    assert!(out.message.contains("full name"));

    let out = send_message(&app, "s1", "Jane Doe").await;
    assert!(out.message.contains("pet's name"));

    let out = send_message(&app, "s1", "Max, labrador").await;
    assert!(out.message.contains("phone"));

    let out = send_message(&app, "s1", "+15551234567").await;
    assert!(out.message.contains("date and time"));

    let out = send_message(&app, "s1", "June 20th at 2pm").await;
    for field in ["Jane Doe", "Max, labrador", "+15551234567", "June 20th at 2pm"] {
        assert!(out.message.contains(field), "summary missing {}", field);
    }
    assert!(out.booking_active);

    let out = send_message(&app, "s1", "confirm").await;
    assert!(!out.booking_active);
    let apt = out.appointment_created.expect("appointmentCreated should be set");
    assert_eq!(apt.owner_name, "Jane Doe");
    assert_eq!(apt.pet_name, "Max, labrador");
    assert_eq!(apt.date_time, "June 20th at 2pm");
    assert_eq!(apt.status.as_str(), "confirmed");

    // The appointment is durably listed for the session.
    let resp = app.oneshot(get("/api/appointments/s1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<Value> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["ownerName"], "Jane Doe");
}

#[tokio::test]
async fn test_cancellation_scenario() {
    let app = make_app();

    send_message(&app, "s1", "I want to book an appointment").await;
    send_message(&app, "s1", "Jane Doe").await;
    send_message(&app, "s1", "Max, labrador").await;
    send_message(&app, "s1", "+15551234567").await;
    send_message(&app, "s1", "June 20th at 2pm").await;

    let out = send_message(&app, "s1", "cancel").await;
    assert!(!out.booking_active);
    assert!(out.appointment_created.is_none());

    let resp = app.oneshot(get("/api/appointments/s1")).await.unwrap();
    let listed: Vec<Value> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_invalid_phone_reprompts_over_http() {
    let app = make_app();

    send_message(&app, "s1", "book an appointment").await;
    send_message(&app, "s1", "Jane Doe").await;
    send_message(&app, "s1", "Max").await;

    let out = send_message(&app, "s1", "12345").await;
    assert!(out.booking_active);
    assert!(out.message.contains("valid phone number"));

    // Recoverable: a valid phone still advances.
    let out = send_message(&app, "s1", "1234567").await;
    assert!(out.message.contains("date and time"));
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_unknown_session_is_empty_not_404() {
    let app = make_app();
    let resp = app.oneshot(get("/api/history/ghost")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(history.session_id, "ghost");
    assert!(history.messages.is_empty());
    assert!(history.context.is_none());
    assert!(history.appointment_id.is_none());
}

#[tokio::test]
async fn test_history_returns_messages_in_order() {
    let app = make_app();
    send_message(&app, "s1", "first question").await;
    send_message(&app, "s1", "second question").await;

    let resp = app.oneshot(get("/api/history/s1")).await.unwrap();
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(history.messages.len(), 4);
    assert_eq!(history.messages[0].content, "first question");
    assert_eq!(history.messages[2].content, "second question");
}

#[tokio::test]
async fn test_context_is_merged_and_returned_in_history() {
    let app = make_app();

    let req = post_json(
        "/api/messages",
        json!({
            "sessionId": "s1",
            "message": "hello",
            "context": {"userId": "u7", "userName": "Jane", "petName": "Max"}
        }),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/api/history/s1")).await.unwrap();
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let context = history.context.expect("context should be present");
    assert_eq!(context.user_name.as_deref(), Some("Jane"));
    assert_eq!(context.pet_name.as_deref(), Some("Max"));
}

#[tokio::test]
async fn test_history_links_appointment_after_confirmation() {
    let app = make_app();

    send_message(&app, "s1", "book an appointment").await;
    send_message(&app, "s1", "Jane Doe").await;
    send_message(&app, "s1", "Max").await;
    send_message(&app, "s1", "1234567").await;
    send_message(&app, "s1", "June 20th").await;
    let out = send_message(&app, "s1", "confirm").await;
    let apt = out.appointment_created.unwrap();

    let resp = app.oneshot(get("/api/history/s1")).await.unwrap();
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(history.appointment_id, Some(apt.id));
}

// =============================================================================
// Appointments
// =============================================================================

#[tokio::test]
async fn test_create_appointment_directly() {
    let app = make_app();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/appointments",
            json!({
                "sessionId": "s1",
                "ownerName": "Bob",
                "petName": "Whiskers, cat",
                "phone": "555 1234",
                "dateTime": "Tomorrow 10am"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(created["ownerName"], "Bob");
    assert_eq!(created["status"], "confirmed");

    let resp = app.oneshot(get("/api/appointments/s1")).await.unwrap();
    let listed: Vec<Value> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["petName"], "Whiskers, cat");
}

#[tokio::test]
async fn test_create_appointment_missing_field_is_400() {
    let app = make_app();

    let resp = app
        .oneshot(post_json(
            "/api/appointments",
            json!({
                "sessionId": "s1",
                "ownerName": "Bob",
                "petName": "Whiskers",
                "phone": "555 1234"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_list_appointments_empty_session() {
    let app = make_app();
    let resp = app.oneshot(get("/api/appointments/nobody")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<Value> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(listed.is_empty());
}

// =============================================================================
// Sessions are independent
// =============================================================================

#[tokio::test]
async fn test_workflow_in_one_session_does_not_leak() {
    let app = make_app();

    let out = send_message(&app, "s1", "book an appointment").await;
    assert!(out.booking_active);

    let out = send_message(&app, "s2", "what should I feed a kitten?").await;
    assert!(!out.booking_active);
    assert_eq!(out.message, "Happy to help with that!");
}

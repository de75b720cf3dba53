//! End-to-end tests for the Exeat Engine HTTP surface.
//!
//! This suite drives the router with guardian messages and housemaster
//! commands and covers:
//! - Saturday overnight approval and deduction
//! - Day leave with exhausted balances
//! - Closed weekends and weekday overnights routed for review
//! - Balance exhaustion
//! - Cancellation with refund
//! - Departure logging and active leave lookup

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use exeat_engine::api::{AppState, create_router};
use exeat_engine::config::ConfigLoader;
use exeat_engine::models::Balances;
use exeat_engine::notify::LogNotifier;
use exeat_engine::store::{InMemoryPolicyStore, PolicyStore};

// =============================================================================
// Test Helpers
// =============================================================================

/// Thursday morning, two days before the first Saturday used below.
const THURSDAY: &str = "2025-02-06T10:00:00";
const SMITH_PHONE: &str = "+27603174174";
const DOE_EMAIL: &str = "jane.doe@example.com";
const FINNINGLEY_HOUSEMASTER: &str = "27831112222";

fn create_test_store() -> Arc<InMemoryPolicyStore> {
    let config = ConfigLoader::load("./config/michaelhouse").expect("Failed to load config");
    Arc::new(InMemoryPolicyStore::from_config(&config))
}

fn create_router_for_store(store: Arc<InMemoryPolicyStore>) -> Router {
    let store: Arc<dyn PolicyStore> = store;
    create_router(AppState::new(store, Arc::new(LogNotifier)))
}

fn create_router_for_test() -> Router {
    create_router_for_store(create_test_store())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn guardian_request(
    router: &Router,
    sender: &str,
    channel: &str,
    text: &str,
) -> (StatusCode, Value) {
    post_json(
        router,
        "/leave-requests",
        json!({
            "text": text,
            "sender": sender,
            "channel": channel,
            "received_at": THURSDAY
        }),
    )
    .await
}

async fn smith_request(router: &Router, text: &str) -> Value {
    let (status, body) = guardian_request(router, SMITH_PHONE, "whatsapp", text).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn housemaster_command(router: &Router, text: &str) -> Value {
    let (status, body) = post_json(
        router,
        "/admin-commands",
        json!({
            "text": text,
            "sender": FINNINGLEY_HOUSEMASTER,
            "received_at": "2025-02-06T12:00:00"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn overnight_balance(router: &Router, admin_number: &str) -> u64 {
    let outcome = housemaster_command(router, &format!("balance for {admin_number}")).await;
    assert_eq!(outcome["status"], "success");
    outcome["balances"]["overnight"].as_u64().unwrap()
}

// =============================================================================
// Scenario 1: Saturday overnight approved
// =============================================================================

#[tokio::test]
async fn test_saturday_overnight_is_approved_and_deducted() {
    let router = create_router_for_test();

    let decision = smith_request(&router, "Overnight leave for James this Saturday").await;

    assert_eq!(decision["status"], "approved");
    assert_eq!(decision["category"], "overnight");
    assert_eq!(decision["window"]["start"], "2025-02-08T14:00:00");
    assert_eq!(decision["window"]["end"], "2025-02-09T18:50:00");
    assert_eq!(decision["remaining_balance"], 2);
    assert_eq!(decision["subject"]["admin_number"], "12345");
    assert_eq!(overnight_balance(&router, "12345").await, 2);
}

#[tokio::test]
async fn test_decision_carries_rule_trace() {
    let router = create_router_for_test();

    let decision = smith_request(&router, "Overnight leave for James this Saturday").await;

    let trace = decision["trace"].as_array().unwrap();
    let rule_ids: Vec<&str> = trace
        .iter()
        .map(|step| step["rule_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        rule_ids,
        vec![
            "date_validity",
            "overnight_weekday",
            "day_leave_exemption",
            "restriction",
            "balance",
            "special_request"
        ]
    );
    assert_eq!(trace[0]["step_number"], 1);
}

// =============================================================================
// Scenario 2: day leave ignores balances
// =============================================================================

#[tokio::test]
async fn test_day_leave_is_approved_with_zero_balances() {
    let store = create_test_store();
    store.set_balances("12345", Balances::default()).unwrap();
    let router = create_router_for_store(store.clone());

    let decision = smith_request(&router, "Day leave for James this Sunday").await;

    assert_eq!(decision["status"], "approved");
    assert_eq!(decision["category"], "day_leave");
    assert!(decision.get("remaining_balance").is_none());
    assert_eq!(
        store.query_balances("12345").unwrap(),
        Some(Balances::default())
    );
}

// =============================================================================
// Scenario 3: closed weekend routed for review
// =============================================================================

#[tokio::test]
async fn test_closed_weekend_is_special_pending() {
    let router = create_router_for_test();

    let (status, decision) = guardian_request(
        &router,
        DOE_EMAIL,
        "email",
        "Overnight leave for Michael on 22/02/2025",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["status"], "special_pending");
    assert!(decision["reason"].as_str().unwrap().contains("closed"));
    assert_eq!(decision["notice"]["recipient_unit"], "Shepstone");
    assert!(decision["entry_id"].is_string());
}

// =============================================================================
// Scenario 4: weekday overnight routed for review
// =============================================================================

#[tokio::test]
async fn test_tuesday_overnight_is_special_pending() {
    let router = create_router_for_test();

    let decision = smith_request(&router, "Overnight leave for James on Tuesday").await;

    assert_eq!(decision["status"], "special_pending");
    assert_eq!(decision["reason"], "non-Saturday overnight");
    assert_eq!(decision["window"]["start"], "2025-02-11T14:00:00");
    assert_eq!(overnight_balance(&router, "12345").await, 3);
}

// =============================================================================
// Scenario 5: exhausted overnight balance
// =============================================================================

#[tokio::test]
async fn test_exhausted_balance_is_rejected() {
    let router = create_router_for_test();

    for text in [
        "Overnight leave for James this Saturday",
        "Overnight leave for James on 15/02/2025",
        "Overnight leave for James on 01/03/2025",
    ] {
        let decision = smith_request(&router, text).await;
        assert_eq!(decision["status"], "approved", "{text}");
    }
    assert_eq!(overnight_balance(&router, "12345").await, 0);

    let decision = smith_request(&router, "Overnight leave for James on 08/03/2025").await;

    assert_eq!(decision["status"], "rejected");
    assert_eq!(decision["reason"], "insufficient_balance");
    assert_eq!(overnight_balance(&router, "12345").await, 0);
}

// =============================================================================
// Scenario 6: housemaster cancels and refunds
// =============================================================================

#[tokio::test]
async fn test_cancellation_refunds_overnight_balance() {
    let router = create_router_for_test();
    let decision = smith_request(&router, "Overnight leave for James this Saturday").await;
    assert_eq!(decision["status"], "approved");
    assert_eq!(overnight_balance(&router, "12345").await, 2);

    let outcome =
        housemaster_command(&router, "cancel leave for 12345 because academic concerns").await;

    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["intent"], "cancel");
    assert_eq!(outcome["cancellation"]["entry"]["status"], "cancelled");
    assert_eq!(
        outcome["cancellation"]["entry"]["cancellation_reason"],
        "academic concerns"
    );
    assert_eq!(outcome["cancellation"]["entry"]["entry_id"], decision["entry_id"]);
    assert_eq!(overnight_balance(&router, "12345").await, 3);

    // Nothing left to cancel; the balance is refunded only once.
    let again = housemaster_command(&router, "cancel leave for 12345").await;
    assert_eq!(again["status"], "error");
    assert_eq!(overnight_balance(&router, "12345").await, 3);
}

#[tokio::test]
async fn test_history_lists_cancelled_entry() {
    let router = create_router_for_test();
    smith_request(&router, "Overnight leave for James this Saturday").await;
    housemaster_command(&router, "cancel leave for 12345").await;

    let outcome = housemaster_command(&router, "show leave history for 12345").await;

    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["intent"], "history_query");
    let history = outcome["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "cancelled");
    assert_eq!(history[0]["cancellation_reason"], "Housemaster decision");
}

#[tokio::test]
async fn test_restriction_blocks_following_request() {
    let router = create_router_for_test();

    let outcome = housemaster_command(&router, "restrict 12345").await;
    assert_eq!(outcome["status"], "success");
    assert_eq!(outcome["restriction"]["admin_number"], "12345");

    let decision = smith_request(&router, "Overnight leave for James this Saturday").await;
    assert_eq!(decision["status"], "rejected");
    assert_eq!(decision["reason"], "restricted");
    assert_eq!(overnight_balance(&router, "12345").await, 3);
}

#[tokio::test]
async fn test_unknown_administrator_is_refused() {
    let router = create_router_for_test();

    let (status, outcome) = post_json(
        &router,
        "/admin-commands",
        json!({ "text": "balance for 12345", "sender": SMITH_PHONE }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "error");
    assert!(outcome.get("intent").is_none());
}

// =============================================================================
// Departures and active leave
// =============================================================================

#[tokio::test]
async fn test_departure_is_logged_and_blocks_cancellation() {
    let router = create_router_for_test();
    smith_request(&router, "Overnight leave for James this Saturday").await;

    let (status, active) =
        get_json(&router, "/students/12345/active-leaves?at=2025-02-08T15:00:00").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, entry) = post_json(
        &router,
        "/departures",
        json!({
            "admin_number": "12345",
            "driver_id": "8001015009087",
            "departed_at": "2025-02-08T15:00:00"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["departed_at"], "2025-02-08T15:00:00");
    assert_eq!(entry["driver_id"], "8001015009087");

    let (_, active) =
        get_json(&router, "/students/12345/active-leaves?at=2025-02-08T16:00:00").await;
    assert!(active.as_array().unwrap().is_empty());

    let outcome = housemaster_command(&router, "cancel leave for 12345").await;
    assert_eq!(outcome["status"], "error");
    assert_eq!(overnight_balance(&router, "12345").await, 2);
}

#[tokio::test]
async fn test_departure_outside_window_is_not_found() {
    let router = create_router_for_test();
    smith_request(&router, "Overnight leave for James this Saturday").await;

    let (status, error) = post_json(
        &router,
        "/departures",
        json!({
            "admin_number": "12345",
            "driver_id": "8001015009087",
            "departed_at": "2025-02-08T09:00:00"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NO_ACTIVE_LEAVE");
}

// =============================================================================
// Error cases
// =============================================================================

#[tokio::test]
async fn test_unknown_sender_is_rejected_not_errored() {
    let router = create_router_for_test();

    let (status, decision) = guardian_request(
        &router,
        "+27000000000",
        "whatsapp",
        "Overnight leave for James this Saturday",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["status"], "rejected");
    assert_eq!(decision["reason"], "authentication_failed");
}

#[tokio::test]
async fn test_missing_field_is_validation_error() {
    let router = create_router_for_test();

    let (status, error) = post_json(
        &router,
        "/leave-requests",
        json!({ "text": "Overnight leave for James this Saturday", "channel": "whatsapp" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

//! Account registration and confirmation tests

mod common;

use std::sync::Arc;

use accounts_broker::{routes, AccountRepo, Config};
use accounts_broker::store::{AccountStatus, Purpose};
use axum_test::TestServer;
use common::{create_state, create_test_server};
use serde_json::{json, Value};

fn register_body(email: &str) -> Value {
    json!({
        "email": email,
        "name": "Ana",
        "surname": "Lu",
        "pass": "pw123",
    })
}

/// Test: registering stores a pending account with one unredeemed code and
/// mails it once
#[tokio::test]
async fn test_register_creates_pending_account() {
    let (state, notifier) = create_state(&Config::default());
    let server = TestServer::new(routes::create_router(Arc::clone(&state))).unwrap();

    let response = server.post("/api/register").json(&register_body("a@x.com")).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let account = state.store.find_account("a@x.com").unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::PendingConfirmation);
    assert_eq!(account.name, "Ana");
    assert_eq!(account.surname, "Lu");

    let requests = state.store.list_confirmations("a@x.com").unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].purpose, Purpose::AccountCreation);
    assert!(!requests[0].redeemed);

    assert_eq!(notifier.count(), 1);
    let message = notifier.last_to("a@x.com").unwrap();
    assert!(message.subject.contains("Confirmación"));
    assert_eq!(message.from, "Pruebas <no-reply@example.com>");
    assert_eq!(
        message.confirmation_id().unwrap(),
        requests[0].id.to_string()
    );
    assert!(message
        .body
        .contains("http://localhost:3000/confirmar_usuario?id="));
}

/// Test: registering the same address twice fails with 409
#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let (server, notifier) = create_test_server();

    server.post("/api/register").json(&register_body("a@x.com")).await;
    let response = server.post("/api/register").json(&register_body("a@x.com")).await;

    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(notifier.count(), 1);
}

/// Test: missing name or address is rejected with 400
#[tokio::test]
async fn test_register_requires_name_and_email() {
    let (server, notifier) = create_test_server();

    let response = server
        .post("/api/register")
        .json(&json!({ "email": "a@x.com", "name": " ", "pass": "pw123" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/register")
        .json(&json!({ "email": "", "name": "Ana", "pass": "pw123" }))
        .await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(notifier.count(), 0);
}

/// Test: redeeming the same code twice yields success then 409
#[tokio::test]
async fn test_confirm_twice() {
    let (state, notifier) = create_state(&Config::default());
    let server = TestServer::new(routes::create_router(Arc::clone(&state))).unwrap();

    server.post("/api/register").json(&register_body("a@x.com")).await;
    let code = notifier.get_code("a@x.com").unwrap();

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": code }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["email"], "a@x.com");

    let account = state.store.find_account("a@x.com").unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Confirmed);

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": code }))
        .await;
    assert_eq!(response.status_code(), 409);

    let account = state.store.find_account("a@x.com").unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Confirmed);
}

/// Test: unknown and malformed codes
#[tokio::test]
async fn test_confirm_unknown_code() {
    let (server, _notifier) = create_test_server();

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": "00000000-0000-4000-8000-000000000000" }))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": "not-a-code" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: a password-reset code cannot confirm an account
#[tokio::test]
async fn test_reset_code_does_not_confirm_account() {
    let (state, notifier) = create_state(&Config::default());
    let server = TestServer::new(routes::create_router(Arc::clone(&state))).unwrap();

    server.post("/api/register").json(&register_body("a@x.com")).await;
    server
        .post("/api/request_password_reset")
        .json(&json!({ "email": "a@x.com" }))
        .await;
    let reset_code = notifier.get_code("a@x.com").unwrap();

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": reset_code }))
        .await;
    assert_eq!(response.status_code(), 404);

    let account = state.store.find_account("a@x.com").unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::PendingConfirmation);
}

/// Test: resending issues a new code and leaves the old one valid
#[tokio::test]
async fn test_resend_keeps_earlier_codes_valid() {
    let (state, notifier) = create_state(&Config::default());
    let server = TestServer::new(routes::create_router(Arc::clone(&state))).unwrap();

    server.post("/api/register").json(&register_body("a@x.com")).await;
    let first = notifier.get_code("a@x.com").unwrap();

    let response = server
        .post("/api/resend_confirmation")
        .json(&json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let second = notifier.get_code("a@x.com").unwrap();
    assert_ne!(first, second);
    assert_eq!(state.store.list_confirmations("a@x.com").unwrap().len(), 2);

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": first }))
        .await;
    assert_eq!(response.status_code(), 200);

    // Account is already confirmed, so no further resends
    let response = server
        .post("/api/resend_confirmation")
        .json(&json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: resend for an unknown address is 404
#[tokio::test]
async fn test_resend_unknown_account() {
    let (server, notifier) = create_test_server();

    let response = server
        .post("/api/resend_confirmation")
        .json(&json!({ "email": "nobody@x.com" }))
        .await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(notifier.count(), 0);
}

/// Test: a failed send reports 503 but leaves a confirmable account, and a
/// resend recovers
#[tokio::test]
async fn test_failed_send_is_recoverable() {
    let (state, notifier) = create_state(&Config::default());
    let server = TestServer::new(routes::create_router(Arc::clone(&state))).unwrap();

    notifier.set_failing(true);
    let response = server.post("/api/register").json(&register_body("a@x.com")).await;
    assert_eq!(response.status_code(), 503);

    let account = state.store.find_account("a@x.com").unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::PendingConfirmation);
    assert_eq!(state.store.list_confirmations("a@x.com").unwrap().len(), 1);

    notifier.set_failing(false);
    let response = server
        .post("/api/resend_confirmation")
        .json(&json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let code = notifier.get_code("a@x.com").unwrap();
    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": code }))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Test: an account can log in before confirming
#[tokio::test]
async fn test_login_before_confirmation() {
    let (server, _notifier) = create_test_server();

    server.post("/api/register").json(&register_body("a@x.com")).await;
    let response = server
        .post("/api/login")
        .json(&json!({ "email": "a@x.com", "pass": "pw123" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server
        .post("/api/login")
        .json(&json!({ "email": "a@x.com", "pass": "wrong" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: with confirmed login required, pending accounts get 403
#[tokio::test]
async fn test_confirmation_required_login() {
    let (server, notifier) = common::create_test_server_with(Config {
        require_confirmed_login: true,
        ..Config::default()
    });

    server.post("/api/register").json(&register_body("a@x.com")).await;
    let response = server
        .post("/api/login")
        .json(&json!({ "email": "a@x.com", "pass": "pw123" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let code = notifier.get_code("a@x.com").unwrap();
    server
        .post("/api/confirm_account")
        .json(&json!({ "id": code }))
        .await;

    let response = server
        .post("/api/login")
        .json(&json!({ "email": "a@x.com", "pass": "pw123" }))
        .await;
    assert_eq!(response.status_code(), 200);
}

//! Common test utilities for broker integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use accounts_broker::{routes, AppState, Config, InMemoryAccountStore, Notifier};
use accounts_core::SigningKey;
use axum_test::TestServer;
use serde_json::json;

/// A captured outbound message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl SentMessage {
    /// Confirmation identifier embedded in the message link
    pub fn confirmation_id(&self) -> Option<String> {
        let start = self.body.find("?id=")? + 4;
        Some(self.body[start..].chars().take(36).collect())
    }
}

/// Mock notifier that captures messages, optionally failing every send
#[derive(Default, Clone)]
pub struct MockNotifier {
    pub sent: Arc<RwLock<Vec<SentMessage>>>,
    pub failing: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    /// Last message sent to an address
    pub fn last_to(&self, email: &str) -> Option<SentMessage> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .cloned()
    }

    /// Confirmation identifier of the last message sent to an address
    pub fn get_code(&self, email: &str) -> Option<String> {
        self.last_to(email)?.confirmation_id()
    }
}

impl Notifier for MockNotifier {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("mail relay unreachable".to_string());
        }
        self.sent.write().unwrap().push(SentMessage {
            to: to.to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn sender_alias(&self) -> &str {
        "Pruebas <no-reply@example.com>"
    }
}

pub type TestState = AppState<InMemoryAccountStore, MockNotifier>;

/// Build application state over the in-memory store
pub fn create_state(config: &Config) -> (Arc<TestState>, MockNotifier) {
    let notifier = MockNotifier::new();
    let state = AppState::new(
        config,
        SigningKey::generate(),
        InMemoryAccountStore::new(),
        notifier.clone(),
    )
    .expect("Failed to build state");
    (Arc::new(state), notifier)
}

/// Create a test server with a mock notifier and default configuration
pub fn create_test_server() -> (TestServer, MockNotifier) {
    create_test_server_with(Config::default())
}

pub fn create_test_server_with(config: Config) -> (TestServer, MockNotifier) {
    let (state, notifier) = create_state(&config);
    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, notifier)
}

/// Register an account and redeem its confirmation link
pub async fn create_account(
    server: &TestServer,
    notifier: &MockNotifier,
    email: &str,
    password: &str,
) {
    let response = server
        .post("/api/register")
        .json(&json!({
            "email": email,
            "name": "Ana",
            "surname": "Lu",
            "pass": password,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let code = notifier
        .get_code(email)
        .expect("No confirmation code sent");

    let response = server
        .post("/api/confirm_account")
        .json(&json!({ "id": code }))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Log in and return the session cookie value
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/api/login")
        .json(&json!({ "email": email, "pass": password }))
        .await;
    assert_eq!(response.status_code(), 200);

    response
        .maybe_cookie("token")
        .expect("No token cookie")
        .value()
        .to_string()
}

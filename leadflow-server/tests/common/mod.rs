//! Common test utilities for server integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use leadflow_core::{KeyPair, PhoneNumber};
use leadflow_server::{
    routes, AppState, EmailSender, InMemoryLeadStore, InMemoryVerificationStore, OutgoingEmail,
    SmsSender,
};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const DOMAIN: &str = "localhost:3000";
pub const PDF_GUIDE: &str = "vendre-rapidement-bordeaux";
pub const PDF_BYTES: &[u8] = b"%PDF-1.4 test guide";

/// Mock SMS sender that captures verification codes
#[derive(Default, Clone)]
pub struct MockSmsSender {
    /// Captured (national phone number, code) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    pub failing: Arc<AtomicBool>,
    /// Milliseconds each send takes, to keep a request in flight
    pub delay_ms: Arc<AtomicU64>,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last code sent to a phone number
    pub fn get_code(&self, phone: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == phone)
            .map(|(_, c)| c.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    /// Make the next sends fail like an unreachable gateway
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the next sends take `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

impl SmsSender for MockSmsSender {
    fn send_code(&self, phone: &PhoneNumber, code: &str) -> Result<(), String> {
        std::thread::sleep(Duration::from_millis(self.delay_ms.load(Ordering::SeqCst)));
        if self.failing.load(Ordering::SeqCst) {
            return Err("gateway unreachable".to_string());
        }
        self.sent
            .write()
            .unwrap()
            .push((phone.national().to_string(), code.to_string()));
        Ok(())
    }
}

/// Mock email sender that captures outgoing emails
#[derive(Default, Clone)]
pub struct MockEmailSender {
    pub sent: Arc<RwLock<Vec<OutgoingEmail>>>,
    pub failing: Arc<AtomicBool>,
    pub delay_ms: Arc<AtomicU64>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_to(&self, email: &str) -> Vec<OutgoingEmail> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.to == email)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        std::thread::sleep(Duration::from_millis(self.delay_ms.load(Ordering::SeqCst)));
        if self.failing.load(Ordering::SeqCst) {
            return Err("smtp down".to_string());
        }
        self.sent.write().unwrap().push(email.clone());
        Ok(())
    }
}

pub type TestState =
    AppState<InMemoryVerificationStore, InMemoryLeadStore, MockEmailSender, MockSmsSender>;

/// Everything a test needs to drive and inspect the server
pub struct TestApp {
    pub server: TestServer,
    pub sms: MockSmsSender,
    pub email: MockEmailSender,
    pub state: Arc<TestState>,
    _guides_dir: TempDir,
}

fn build(admin_token: Option<&str>) -> TestApp {
    let sms = MockSmsSender::new();
    let email = MockEmailSender::new();

    let guides_dir = TempDir::new().expect("Failed to create guides dir");
    std::fs::write(guides_dir.path().join(format!("{}.pdf", PDF_GUIDE)), PDF_BYTES)
        .expect("Failed to write test guide");

    let mut state = AppState::new(
        KeyPair::generate(),
        DOMAIN.to_string(),
        InMemoryVerificationStore::new(),
        InMemoryLeadStore::new(),
        email.clone(),
        sms.clone(),
    )
    .with_guides_dir(guides_dir.path());
    if let Some(token) = admin_token {
        state = state.with_admin_token(token);
    }
    let state = Arc::new(state);

    let app = routes::create_router(Arc::clone(&state));
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        sms,
        email,
        state,
        _guides_dir: guides_dir,
    }
}

/// Create a test server with mock senders and the admin API enabled
pub fn create_test_server() -> TestApp {
    build(Some(ADMIN_TOKEN))
}

/// Create a test server without an admin token
pub fn create_test_server_without_admin() -> TestApp {
    build(None)
}

pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid header value"),
    )
}

pub fn as_admin(request: TestRequest) -> TestRequest {
    bearer(request, ADMIN_TOKEN)
}

pub fn property_data() -> Value {
    json!({
        "propertyType": "appartement",
        "surface": 50,
        "city": "Bordeaux",
        "postalCode": "33000",
        "projectType": "vente",
        "timeline": "3-mois",
        "ownershipStatus": "proprietaire"
    })
}

/// Start a verification session and return its id
pub async fn start_session(server: &TestServer, phone: &str) -> String {
    let response = server
        .post("/api/homepage-verification/start")
        .json(&json!({
            "email": "jean@example.fr",
            "firstName": "Jean",
            "phoneNumber": phone,
            "propertyData": property_data(),
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["sessionId"]
        .as_str()
        .expect("No session id")
        .to_string()
}

/// Start, send and verify a session; returns its id
pub async fn verified_session(app: &TestApp, phone: &str) -> String {
    let session_id = start_session(&app.server, phone).await;

    let response = app
        .server
        .post("/api/homepage-verification/send-sms")
        .json(&json!({ "sessionId": session_id }))
        .await;
    assert_eq!(response.status_code(), 200);

    let national = PhoneNumber::parse(phone).expect("Invalid phone").national().to_string();
    let code = app.sms.get_code(&national).expect("No code sent");

    let response = app
        .server
        .post("/api/homepage-verification/verify-sms")
        .json(&json!({ "sessionId": session_id, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    session_id
}

/// Request a guide and return the response body
pub async fn request_guide(server: &TestServer, slug: &str, email: &str) -> Value {
    let response = server
        .post(&format!("/api/guides/{}/request", slug))
        .json(&json!({
            "firstName": "Marie",
            "email": email,
            "city": "Mérignac",
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

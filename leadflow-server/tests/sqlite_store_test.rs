//! Tests for the SQLite store: persistence across reopen and the full
//! lead flow on a database file

mod common;

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use common::{as_admin, property_data, MockEmailSender, MockSmsSender, ADMIN_TOKEN, DOMAIN, PDF_GUIDE};
use leadflow_core::{KeyPair, Persona, PhoneNumber, SessionStatus};
use leadflow_server::store::{
    GuideLead, LeadStore, SessionId, SqliteStore, VerificationSession, VerificationStore,
};
use leadflow_server::{routes, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;

fn session(id: &str) -> VerificationSession {
    let now = Utc::now();
    VerificationSession {
        id: SessionId(id.to_string()),
        email: "jean@example.fr".to_string(),
        first_name: "Jean".to_string(),
        phone_number: PhoneNumber::parse("0612345678").unwrap(),
        property_data: property_data(),
        status: SessionStatus::Started,
        code: None,
        attempts: 0,
        sms_sent: 0,
        estimation_id: None,
        created_at: now,
        expires_at: now + Duration::minutes(15),
    }
}

/// Test: data survives closing and reopening the database
#[test]
fn test_reopen_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("leads.db");
    let path = path.to_str().unwrap();

    {
        let store = SqliteStore::open(path).unwrap();
        store.create_session(session("s1")).unwrap();
        store
            .create_guide_lead(GuideLead {
                id: "l1".to_string(),
                guide_slug: PDF_GUIDE.to_string(),
                first_name: "Marie".to_string(),
                email: "marie@example.fr".to_string(),
                city: "Pessac".to_string(),
                persona: Persona::Presse,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    // Migrations must be a no-op the second time
    let store = SqliteStore::open(path).unwrap();
    let loaded = store.get_session(&SessionId("s1".into())).unwrap().unwrap();
    assert_eq!(loaded.email, "jean@example.fr");
    assert_eq!(loaded.status, SessionStatus::Started);

    let leads = store.list_guide_leads(PDF_GUIDE).unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].city, "Pessac");
}

/// Test: a shared handle serves both store traits
#[test]
fn test_shared_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("leads.db");
    let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).unwrap());

    let sessions: &dyn VerificationStore = &Arc::clone(&store);
    sessions.create_session(session("s2")).unwrap();
    assert_eq!(sessions.register_attempt(&SessionId("s2".into()), 5).unwrap(), Some(1));

    let leads: &dyn LeadStore = &Arc::clone(&store);
    assert!(leads.get_estimation("missing").unwrap().is_none());
    assert!(leads.list_sequences().unwrap().is_empty());
}

/// Test: threads guessing on one session share the attempt cap
#[test]
fn test_attempt_cap_across_threads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("leads.db");
    let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).unwrap());
    store.create_session(session("s3")).unwrap();
    let id = SessionId("s3".into());

    let granted: Vec<Option<u32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..10)
            .map(|_| scope.spawn(|| store.register_attempt(&id, 5).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut counts: Vec<u32> = granted.into_iter().flatten().collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.get_session(&id).unwrap().unwrap().attempts, 5);
}

/// Test: verification, estimation and guide sequence on a database file
#[tokio::test]
async fn test_full_flow_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("leads.db");
    let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).unwrap());

    let sms = MockSmsSender::new();
    let email = MockEmailSender::new();
    let state = Arc::new(
        AppState::new(
            KeyPair::generate(),
            DOMAIN.to_string(),
            Arc::clone(&store),
            Arc::clone(&store),
            email.clone(),
            sms.clone(),
        )
        .with_admin_token(ADMIN_TOKEN),
    );
    let server = TestServer::new(routes::create_router(state)).unwrap();

    let session_id = common::start_session(&server, "06 12 34 56 78").await;
    server
        .post("/api/homepage-verification/send-sms")
        .json(&json!({ "sessionId": session_id }))
        .await;
    let code = sms.get_code("0612345678").unwrap();
    let response = server
        .post("/api/homepage-verification/verify-sms")
        .json(&json!({ "sessionId": session_id, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    let mut request = property_data();
    request["sessionId"] = json!(session_id);
    request["smsVerified"] = json!(true);
    let response = server.post("/api/estimations-quick").json(&request).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let id = body["id"].as_str().unwrap().to_string();

    let stored = store.get_estimation(&id).unwrap().unwrap();
    assert!(stored.sms_verified);
    assert_eq!(stored.session_id.as_deref(), Some(session_id.as_str()));

    let response = server.post("/api/estimations-quick").json(&request).await;
    assert_eq!(response.status_code(), 409);

    common::request_guide(&server, PDF_GUIDE, "marie@example.fr").await;
    assert_eq!(store.list_sequences().unwrap().len(), 4);

    let response = as_admin(server.post("/api/admin/email-sequences/process")).await;
    let body: Value = response.json();
    assert_eq!(body["sent"], 1);
    assert_eq!(email.sent_to("marie@example.fr").len(), 1);
}

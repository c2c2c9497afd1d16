//! Tests for the email sequence admin API and the dispatcher

mod common;

use chrono::{Duration, Utc};
use common::{
    as_admin, bearer, create_test_server, create_test_server_without_admin, request_guide,
    PDF_GUIDE,
};
use leadflow_core::{EmailSequenceRecord, Persona, SequenceStatus};
use leadflow_server::process_due;
use leadflow_server::store::LeadStore;
use serde_json::{json, Value};

fn record(id: &str, email: &str, persona: Persona, status: SequenceStatus) -> EmailSequenceRecord {
    let now = Utc::now();
    EmailSequenceRecord {
        id: id.to_string(),
        guide_id: "investir-immobilier-gironde".to_string(),
        lead_email: email.to_string(),
        persona,
        sequence_step: 2,
        email_type: "conseils".to_string(),
        scheduled_for: now - Duration::minutes(1),
        sent_at: None,
        status,
        created_at: now,
    }
}

/// Test: admin routes need the bearer token
#[tokio::test]
async fn test_admin_requires_token() {
    let app = create_test_server();

    let response = app.server.get("/api/admin/email-sequences").await;
    assert_eq!(response.status_code(), 401);

    let response = bearer(app.server.get("/api/admin/email-sequences"), "wrong").await;
    assert_eq!(response.status_code(), 401);

    let response = as_admin(app.server.get("/api/admin/email-sequences")).await;
    assert_eq!(response.status_code(), 200);
}

/// Test: without a configured token the admin API does not exist
#[tokio::test]
async fn test_admin_disabled_without_token() {
    let app = create_test_server_without_admin();

    let response = bearer(app.server.get("/api/admin/email-sequences/stats"), "anything").await;
    assert_eq!(response.status_code(), 404);
}

/// Test: a guide request shows up in the list, filterable
#[tokio::test]
async fn test_list_and_filter() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    request_guide(&app.server, "heritage-immobilier-succession", "paul@example.fr").await;

    let response = as_admin(app.server.get("/api/admin/email-sequences")).await;
    let body: Value = response.json();
    assert_eq!(body["total"], 8);

    let response = as_admin(
        app.server
            .get("/api/admin/email-sequences")
            .add_query_param("persona", "heritier"),
    )
    .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 4);
    assert!(body["sequences"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["leadEmail"] == "paul@example.fr"));

    let response = as_admin(
        app.server
            .get("/api/admin/email-sequences")
            .add_query_param("search", "MARIE")
            .add_query_param("status", "scheduled")
            .add_query_param("persona", ""),
    )
    .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 4);

    let response = as_admin(
        app.server
            .get("/api/admin/email-sequences")
            .add_query_param("status", "bogus"),
    )
    .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: stats count by status and persona
#[tokio::test]
async fn test_stats() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;

    let response = as_admin(app.server.get("/api/admin/email-sequences/stats")).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["stats"]["total"], 4);
    assert_eq!(body["stats"]["byStatus"]["scheduled"], 4);
    assert_eq!(body["stats"]["byStatus"]["sent"], 0);
    assert_eq!(body["stats"]["byPersona"]["presse"], 4);
}

/// Test: a sent email cannot be cancelled and keeps its status
#[tokio::test]
async fn test_cancel_sent_rejected() {
    let app = create_test_server();
    app.state
        .lead_store
        .insert_sequence(record("r1", "a@example.fr", Persona::General, SequenceStatus::Sent))
        .unwrap();

    let response = as_admin(
        app.server
            .put("/api/admin/email-sequences/r1/status")
            .json(&json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status_code(), 409);

    let stored = app.state.lead_store.get_sequence("r1").unwrap().unwrap();
    assert_eq!(stored.status, SequenceStatus::Sent);
}

/// Test: cancelling a scheduled email and requeueing a failed one
#[tokio::test]
async fn test_allowed_status_changes() {
    let app = create_test_server();
    app.state
        .lead_store
        .insert_sequence(record("s1", "a@example.fr", Persona::Presse, SequenceStatus::Scheduled))
        .unwrap();
    app.state
        .lead_store
        .insert_sequence(record("f1", "b@example.fr", Persona::Presse, SequenceStatus::Failed))
        .unwrap();

    let response = as_admin(
        app.server
            .put("/api/admin/email-sequences/s1/status")
            .json(&json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["sequence"]["status"], "cancelled");

    let response = as_admin(
        app.server
            .put("/api/admin/email-sequences/f1/status")
            .json(&json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(response.status_code(), 200);

    let response = as_admin(
        app.server
            .put("/api/admin/email-sequences/missing/status")
            .json(&json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: processing sends due emails and leaves future ones
#[tokio::test]
async fn test_process_due_emails() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;

    let response = as_admin(app.server.post("/api/admin/email-sequences/process")).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["processed"], 1);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 0);

    let sent = app.email.sent_to("marie@example.fr");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Vendre rapidement à Bordeaux"));
    assert!(sent[0].body.contains("Bonjour Marie"));
    assert!(sent[0]
        .body
        .contains(&format!("http://localhost:3000/guides/{}/lire", PDF_GUIDE)));

    // Nothing else is due yet
    let response = as_admin(app.server.post("/api/admin/email-sequences/process")).await;
    let body: Value = response.json();
    assert_eq!(body["processed"], 0);
    assert_eq!(app.email.count(), 1);
}

/// Test: send failures mark the record failed
#[tokio::test]
async fn test_process_marks_failures() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    app.email.set_failing(true);

    let response = as_admin(app.server.post("/api/admin/email-sequences/process")).await;
    let body: Value = response.json();
    assert_eq!(body["failed"], 1);
    assert_eq!(body["sent"], 0);

    let response = as_admin(
        app.server
            .get("/api/admin/email-sequences")
            .add_query_param("status", "failed"),
    )
    .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["sequences"][0]["emailType"], "guide_delivery");
}

/// Test: cancelled records are skipped by the dispatcher
#[tokio::test]
async fn test_cancelled_not_sent() {
    let app = create_test_server();
    app.state
        .lead_store
        .insert_sequence(record("c1", "a@example.fr", Persona::General, SequenceStatus::Scheduled))
        .unwrap();

    as_admin(
        app.server
            .put("/api/admin/email-sequences/c1/status")
            .json(&json!({ "status": "cancelled" })),
    )
    .await;

    let response = as_admin(app.server.post("/api/admin/email-sequences/process")).await;
    let body: Value = response.json();
    assert_eq!(body["processed"], 0);
    assert_eq!(app.email.count(), 0);
}

/// Test: seeding templates is idempotent and feeds new sequences
#[tokio::test]
async fn test_setup_templates() {
    let app = create_test_server();

    let response = as_admin(app.server.post("/api/admin/email-sequences/setup-templates")).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["created"], 16);

    let response = as_admin(app.server.post("/api/admin/email-sequences/setup-templates")).await;
    let body: Value = response.json();
    assert_eq!(body["created"], 0);

    let templates = app.state.lead_store.templates_for(Persona::Investisseur).unwrap();
    assert_eq!(templates.len(), 4);
}

/// Test: admins cannot mark an email sent or failed by hand
#[tokio::test]
async fn test_admin_cannot_fake_delivery() {
    let app = create_test_server();
    app.state
        .lead_store
        .insert_sequence(record("m1", "a@example.fr", Persona::General, SequenceStatus::Scheduled))
        .unwrap();

    for status in ["sent", "failed", "sending"] {
        let response = as_admin(
            app.server
                .put("/api/admin/email-sequences/m1/status")
                .json(&json!({ "status": status })),
        )
        .await;
        assert_eq!(response.status_code(), 409);
    }

    let stored = app.state.lead_store.get_sequence("m1").unwrap().unwrap();
    assert_eq!(stored.status, SequenceStatus::Scheduled);
    assert_eq!(stored.sent_at, None);
}

/// Test: two overlapping runs deliver a due email once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_runs_send_once() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    app.email.set_delay(std::time::Duration::from_millis(300));

    let (first, second) = tokio::join!(process_due(&app.state), process_due(&app.state));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.sent + second.sent, 1);
    assert_eq!(first.processed + second.processed, 1);
    assert_eq!(app.email.count(), 1);
}

/// Test: an email being delivered can no longer be cancelled
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_during_delivery_rejected() {
    let app = create_test_server();
    request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    let delivery = app
        .state
        .lead_store
        .list_sequences()
        .unwrap()
        .into_iter()
        .find(|r| r.sequence_step == 1)
        .unwrap();
    app.email.set_delay(std::time::Duration::from_millis(500));

    let run = process_due(&app.state);
    let cancel = async {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        as_admin(
            app.server
                .put(&format!("/api/admin/email-sequences/{}/status", delivery.id))
                .json(&json!({ "status": "cancelled" })),
        )
        .await
    };
    let (report, cancel) = tokio::join!(run, cancel);

    assert_eq!(cancel.status_code(), 409);
    assert_eq!(report.unwrap().sent, 1);
    let stored = app.state.lead_store.get_sequence(&delivery.id).unwrap().unwrap();
    assert_eq!(stored.status, SequenceStatus::Sent);
    assert!(stored.sent_at.is_some());
}

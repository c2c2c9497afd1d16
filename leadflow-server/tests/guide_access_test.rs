//! Tests for guide requests and token-gated reading

mod common;

use chrono::Duration;
use common::{bearer, create_test_server, request_guide, DOMAIN, PDF_BYTES, PDF_GUIDE};
use leadflow_core::{LeadSubject, LeadToken};
use leadflow_server::routes::LEAD_TOKEN_COOKIE;
use serde_json::{json, Value};

/// Test: the catalog lists every guide
#[tokio::test]
async fn test_list_guides() {
    let app = create_test_server();

    let response = app.server.get("/api/guides").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let guides = body["guides"].as_array().unwrap();
    assert_eq!(guides.len(), 4);
    assert!(guides.iter().any(|g| g["slug"] == PDF_GUIDE));

    let response = app.server.get(&format!("/api/guides/{}", PDF_GUIDE)).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["persona"], "presse");

    let response = app.server.get("/api/guides/unknown").await;
    assert_eq!(response.status_code(), 404);
}

/// Test: a guide request returns a lead context and sets the cookie
#[tokio::test]
async fn test_request_guide() {
    let app = create_test_server();

    let response = app
        .server
        .post(&format!("/api/guides/{}/request", PDF_GUIDE))
        .json(&json!({
            "firstName": "Marie",
            "email": "  Marie@Example.FR ",
            "city": "Mérignac",
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let cookie = response.cookie(LEAD_TOKEN_COOKIE);
    let body: Value = response.json();
    let context = &body["leadContext"];
    assert_eq!(context["email"], "marie@example.fr");
    assert_eq!(context["guideSlug"], PDF_GUIDE);
    assert_eq!(context["token"], cookie.value());
    assert_eq!(body["guideUrl"], format!("/guides/{}/lire", PDF_GUIDE));
    assert_eq!(body["scheduled"], 4);

    let token = LeadToken::verify(
        cookie.value(),
        DOMAIN,
        Some(PDF_GUIDE),
        &app.state.keypair.public_key(),
    )
    .unwrap();
    assert_eq!(token.claims().sub, "marie@example.fr");
    assert_eq!(token.claims().city, "Mérignac");
}

/// Test: bad guide requests are rejected per field
#[tokio::test]
async fn test_request_guide_validation() {
    let app = create_test_server();

    let response = app
        .server
        .post(&format!("/api/guides/{}/request", PDF_GUIDE))
        .json(&json!({ "firstName": "", "email": "x", "city": "" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["fields"]["firstName"].is_string());
    assert!(body["fields"]["email"].is_string());
    assert!(body["fields"]["city"].is_string());

    let response = app
        .server
        .post("/api/guides/unknown/request")
        .json(&json!({ "firstName": "Marie", "email": "m@example.fr", "city": "Pessac" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: reading without a lead context redirects to the catalog
#[tokio::test]
async fn test_read_page_redirects_without_token() {
    let app = create_test_server();

    let response = app.server.get(&format!("/guides/{}/lire", PDF_GUIDE)).await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(response.header("location"), "/guides");

    let response = app
        .server
        .get(&format!("/guides/{}/lire", PDF_GUIDE))
        .add_cookie(cookie::Cookie::new(LEAD_TOKEN_COOKIE, "garbage"))
        .await;
    assert_eq!(response.status_code(), 303);
}

/// Test: a valid cookie or bearer token opens the reading page
#[tokio::test]
async fn test_read_page_with_token() {
    let app = create_test_server();
    let body = request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    let token = body["leadContext"]["token"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/guides/{}/lire", PDF_GUIDE))
        .add_cookie(cookie::Cookie::new(LEAD_TOKEN_COOKIE, token.clone()))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("Vendre rapidement"));

    let response = bearer(
        app.server.get(&format!("/guides/{}/lire", PDF_GUIDE)),
        &token,
    )
    .await;
    assert_eq!(response.status_code(), 200);
}

/// Test: a token only opens the guide it was minted for
#[tokio::test]
async fn test_token_bound_to_guide() {
    let app = create_test_server();
    let body = request_guide(&app.server, "investir-immobilier-gironde", "marie@example.fr").await;
    let token = body["leadContext"]["token"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/guides/{}/lire", PDF_GUIDE))
        .add_cookie(cookie::Cookie::new(LEAD_TOKEN_COOKIE, token))
        .await;
    assert_eq!(response.status_code(), 303);
}

/// Test: expired tokens are refused
#[tokio::test]
async fn test_expired_token() {
    let app = create_test_server();
    let token = LeadToken::issue(
        DOMAIN,
        LeadSubject {
            email: "marie@example.fr",
            first_name: "Marie",
            city: "Pessac",
            guide: PDF_GUIDE,
        },
        Duration::seconds(-5),
        &app.state.keypair,
    )
    .unwrap();

    let response = app
        .server
        .get(&format!("/guides/{}/lire", PDF_GUIDE))
        .add_cookie(cookie::Cookie::new(
            LEAD_TOKEN_COOKIE,
            token.encoded().to_string(),
        ))
        .await;
    assert_eq!(response.status_code(), 303);

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", PDF_GUIDE))
        .add_query_param("token", token.encoded())
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: the PDF is served only with a valid token
#[tokio::test]
async fn test_download_pdf() {
    let app = create_test_server();
    let body = request_guide(&app.server, PDF_GUIDE, "marie@example.fr").await;
    let token = body["leadContext"]["token"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", PDF_GUIDE))
        .add_query_param("token", &token)
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(response.as_bytes().as_ref(), PDF_BYTES);

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", PDF_GUIDE))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", PDF_GUIDE))
        .add_query_param("token", "not.a.token")
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: a known guide without a PDF file is 404
#[tokio::test]
async fn test_download_missing_pdf() {
    let app = create_test_server();
    let slug = "estimer-son-bien-gironde";
    let body = request_guide(&app.server, slug, "marie@example.fr").await;
    let token = body["leadContext"]["token"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", slug))
        .add_query_param("token", &token)
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: base64 segments that are not a token are refused, not an error
#[tokio::test]
async fn test_malformed_token_json() {
    let app = create_test_server();

    let response = app
        .server
        .get(&format!("/api/guides/{}/download-pdf", PDF_GUIDE))
        .add_query_param("token", "e30.e30.AAAA")
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .get(&format!("/guides/{}/lire", PDF_GUIDE))
        .add_cookie(cookie::Cookie::new(LEAD_TOKEN_COOKIE, "e30.e30.AAAA"))
        .await;
    assert_eq!(response.status_code(), 303);
}

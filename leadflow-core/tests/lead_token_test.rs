//! Lead token issuance and verification tests

use chrono::Duration;
use leadflow_core::{Error, KeyPair, LeadSubject, LeadToken};

const ISSUER: &str = "estimation-gironde.fr";
const GUIDE: &str = "vendre-rapidement-bordeaux";

fn subject() -> LeadSubject<'static> {
    LeadSubject {
        email: "jean@example.com",
        first_name: "Jean",
        city: "Bordeaux",
        guide: GUIDE,
    }
}

/// Test: a freshly issued token verifies with the issuer key
#[test]
fn test_issued_token_verifies() {
    let key = KeyPair::generate();
    let token = LeadToken::issue(ISSUER, subject(), Duration::days(30), &key).unwrap();

    let verified =
        LeadToken::verify(token.encoded(), ISSUER, Some(GUIDE), &key.public_key()).unwrap();
    assert_eq!(verified.claims().first_name, "Jean");
    assert_eq!(verified.claims().city, "Bordeaux");
}

/// Test: a token signed by another key is rejected
#[test]
fn test_foreign_key_rejected() {
    let key = KeyPair::generate();
    let other = KeyPair::generate();
    let token = LeadToken::issue(ISSUER, subject(), Duration::days(30), &other).unwrap();

    let err = LeadToken::verify(token.encoded(), ISSUER, None, &key.public_key()).unwrap_err();
    assert!(matches!(err, Error::SignatureVerificationFailed));
}

/// Test: expired tokens are rejected
#[test]
fn test_expired_token_rejected() {
    let key = KeyPair::generate();
    let token = LeadToken::issue(ISSUER, subject(), Duration::seconds(-5), &key).unwrap();

    let err = LeadToken::verify(token.encoded(), ISSUER, None, &key.public_key()).unwrap_err();
    assert!(matches!(err, Error::TokenExpired));
}

/// Test: a token from another issuer is rejected
#[test]
fn test_issuer_mismatch() {
    let key = KeyPair::generate();
    let token = LeadToken::issue("other.example", subject(), Duration::days(1), &key).unwrap();

    let err = LeadToken::verify(token.encoded(), ISSUER, None, &key.public_key()).unwrap_err();
    assert!(matches!(err, Error::IssuerMismatch { .. }));
}

/// Test: editing the claims invalidates the signature
#[test]
fn test_tampered_claims_rejected() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let key = KeyPair::generate();
    let token = LeadToken::issue(ISSUER, subject(), Duration::days(1), &key).unwrap();
    let parts: Vec<&str> = token.encoded().split('.').collect();

    let mut claims: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    claims["guide"] = serde_json::json!("investir-immobilier-gironde");
    let forged = format!(
        "{}.{}.{}",
        parts[0],
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
        parts[2]
    );

    let result = LeadToken::verify(
        &forged,
        ISSUER,
        Some("investir-immobilier-gironde"),
        &key.public_key(),
    );
    assert!(matches!(result, Err(Error::SignatureVerificationFailed)));
}

/// Test: well-formed base64 that is not a token is an invalid token
#[test]
fn test_non_token_json_rejected() {
    let key = KeyPair::generate();

    // "{}" for both header and claims
    let result = LeadToken::verify("e30.e30.AAAA", ISSUER, None, &key.public_key());
    assert!(matches!(result, Err(Error::InvalidToken(_))));

    let result = LeadToken::parse("WzFd.e30.AAAA");
    assert!(matches!(result, Err(Error::InvalidToken(_))));
}

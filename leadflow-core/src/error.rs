//! Error types for the lead capture domain

use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid lead token: {0}")]
    InvalidToken(String),

    #[error("Lead token expired")]
    TokenExpired,

    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Token was issued for guide {actual}, not {expected}")]
    GuideMismatch { expected: String, actual: String },

    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Transition from {from} on {event} is not allowed")]
    InvalidTransition { from: String, event: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

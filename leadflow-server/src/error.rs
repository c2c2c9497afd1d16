//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leadflow_core::FieldErrors;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Verification session not found or expired")]
    SessionNotFound,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Too many codes sent")]
    TooManySends,

    #[error("Phone number not verified")]
    NotVerified,

    #[error("Verification session already used")]
    SessionAlreadyUsed,

    #[error("Invalid state: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid or missing lead token")]
    Unauthorized,

    #[error("Admin authentication required")]
    AdminRequired,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<leadflow_core::Error> for ServerError {
    fn from(err: leadflow_core::Error) -> Self {
        use leadflow_core::Error as CoreError;
        match err {
            CoreError::Validation(fields) => ServerError::Validation(fields),
            CoreError::InvalidTransition { from, event } => {
                ServerError::Conflict(format!("{} cannot handle {}", from, event))
            }
            CoreError::InvalidToken(_)
            | CoreError::TokenExpired
            | CoreError::IssuerMismatch { .. }
            | CoreError::GuideMismatch { .. }
            | CoreError::SignatureVerificationFailed
            | CoreError::Base64(_) => ServerError::Unauthorized,
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "Certains champs sont invalides")
            }
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ServerError::SessionNotFound => {
                (StatusCode::NOT_FOUND, "Session introuvable ou expirée")
            }
            ServerError::InvalidCode => (StatusCode::BAD_REQUEST, "Code invalide"),
            ServerError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                "Trop de tentatives, veuillez recommencer la vérification",
            ),
            ServerError::TooManySends => (
                StatusCode::TOO_MANY_REQUESTS,
                "Nombre maximal d'envois atteint",
            ),
            ServerError::NotVerified => (
                StatusCode::FORBIDDEN,
                "Le numéro de téléphone n'a pas été vérifié",
            ),
            ServerError::SessionAlreadyUsed => (
                StatusCode::CONFLICT,
                "Cette vérification a déjà été utilisée",
            ),
            ServerError::Conflict(msg) => {
                tracing::debug!("Rejected transition: {}", msg);
                (StatusCode::CONFLICT, "Action impossible dans l'état actuel")
            }
            ServerError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, "Ressource introuvable")
            }
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Accès non autorisé"),
            ServerError::AdminRequired => (StatusCode::UNAUTHORIZED, "Authentification requise"),
            ServerError::Provider(msg) => {
                tracing::error!("Provider failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Le service d'envoi est momentanément indisponible, réessayez plus tard",
                )
            }
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur interne du serveur")
            }
        };

        let body = match &self {
            ServerError::Validation(fields) => {
                json!({ "success": false, "reason": message, "fields": fields })
            }
            _ => json!({ "success": false, "reason": message }),
        };
        (status, axum::Json(body)).into_response()
    }
}

//! Homepage phone verification endpoints

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use leadflow_core::{ContactForm, PhoneNumber, SessionEvent, SessionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{codes_match, generate_id, generate_verification_code};
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::sms::SmsSender;
use crate::state::{AppState, VerificationPolicy};
use crate::store::{LeadStore, SessionId, VerificationSession, VerificationStore};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub property_data: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub success: bool,
    pub phone_display: String,
    /// Sends left before the session refuses to send again
    pub remaining_sends: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySmsRequest {
    pub session_id: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifySmsResponse {
    pub success: bool,
    pub status: SessionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub session_id: String,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub success: bool,
    pub status: SessionStatus,
    pub phone_display: String,
    pub expires_at: DateTime<Utc>,
}

/// Load a session, treating expired ones as unknown
fn load_live_session<V: VerificationStore>(
    store: &V,
    id: &str,
) -> Result<VerificationSession, ServerError> {
    let session = store
        .get_session(&SessionId(id.to_string()))?
        .ok_or(ServerError::SessionNotFound)?;
    if session.is_expired_at(Utc::now()) {
        return Err(ServerError::SessionNotFound);
    }
    Ok(session)
}

/// POST /api/homepage-verification/start
/// Validate contact details and open a verification session
pub async fn start<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let contact = ContactForm {
        first_name: req.first_name,
        email: req.email,
        phone_number: req.phone_number,
    }
    .validate()
    .map_err(ServerError::Validation)?;

    let now = Utc::now();
    let session = VerificationSession {
        id: SessionId(generate_id()),
        email: contact.email,
        first_name: contact.first_name,
        phone_number: contact.phone_number,
        property_data: req.property_data,
        status: SessionStatus::Started,
        code: None,
        attempts: 0,
        sms_sent: 0,
        estimation_id: None,
        created_at: now,
        expires_at: now + state.policy.session_ttl,
    };
    let session_id = session.id.0.clone();
    state.verification_store.create_session(session)?;

    tracing::info!(session_id = %session_id, "Verification session started");

    Ok(Json(StartResponse {
        success: true,
        session_id,
    }))
}

/// Deliver a code on a blocking thread
async fn deliver_code<V, L, E, M>(
    state: &Arc<AppState<V, L, E, M>>,
    phone: PhoneNumber,
    code: String,
) -> Result<(), ServerError>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.sms_sender.send_code(&phone, &code))
        .await
        .map_err(|e| ServerError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ServerError::Provider)
}

/// Refuse a send the session does not allow right now
fn check_can_send(
    session: &VerificationSession,
    policy: &VerificationPolicy,
) -> Result<(), ServerError> {
    if session.attempts >= policy.max_attempts {
        return Err(ServerError::TooManyAttempts);
    }
    session.status.apply(SessionEvent::CodeSent)?;
    if session.sms_sent >= policy.max_sends {
        return Err(ServerError::TooManySends);
    }
    Ok(())
}

/// POST /api/homepage-verification/send-sms
/// Send (or resend) a one-time code to the session's phone
pub async fn send_sms<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SendSmsResponse>, ServerError>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    let session = load_live_session(&state.verification_store, &req.session_id)?;
    check_can_send(&session, &state.policy)?;

    let reserved = state.verification_store.reserve_send(
        &session.id,
        state.policy.max_sends,
        state.policy.max_attempts,
    )?;
    let send_no = match reserved {
        Some(n) => n,
        None => {
            // Changed since it was read; report the current reason
            let current = load_live_session(&state.verification_store, &req.session_id)?;
            check_can_send(&current, &state.policy)?;
            return Err(ServerError::Conflict(format!(
                "session {} changed before sending",
                session.id.as_str()
            )));
        }
    };

    let code = generate_verification_code();
    deliver_code(&state, session.phone_number.clone(), code.clone()).await?;

    let stored = state.verification_store.mark_code_sent(
        &session.id,
        send_no,
        &session.phone_number,
        &code,
        Utc::now() + state.policy.session_ttl,
    )?;
    if !stored {
        tracing::warn!(
            session_id = %session.id.as_str(),
            "Session changed while the code was being sent, code discarded"
        );
        return Err(ServerError::Conflict(format!(
            "session {} changed during send",
            session.id.as_str()
        )));
    }

    tracing::info!(
        session_id = %session.id.as_str(),
        sends = send_no,
        "Verification code sent"
    );

    Ok(Json(SendSmsResponse {
        success: true,
        phone_display: session.phone_number.masked(),
        remaining_sends: state.policy.max_sends.saturating_sub(send_no),
    }))
}

/// POST /api/homepage-verification/verify-sms
/// Check the code typed by the visitor
pub async fn verify_sms<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Json(req): Json<VerifySmsRequest>,
) -> Result<Json<VerifySmsResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let session = load_live_session(&state.verification_store, &req.session_id)?;

    if session.attempts >= state.policy.max_attempts {
        return Err(ServerError::TooManyAttempts);
    }
    let next = session.status.apply(SessionEvent::CodeAccepted)?;

    // Every try counts, so parallel guesses cannot outrun the lock
    let attempts = state
        .verification_store
        .register_attempt(&session.id, state.policy.max_attempts)?
        .ok_or(ServerError::TooManyAttempts)?;

    let expected = match session.code.as_deref() {
        Some(expected) if codes_match(expected, &req.code) => expected,
        _ => {
            tracing::warn!(
                session_id = %session.id.as_str(),
                attempts,
                "Wrong verification code"
            );
            return Err(ServerError::InvalidCode);
        }
    };

    let verified = state.verification_store.mark_verified(
        &session.id,
        expected,
        Utc::now() + state.policy.session_ttl,
    )?;
    if !verified {
        tracing::warn!(
            session_id = %session.id.as_str(),
            "Code replaced before it was checked"
        );
        return Err(ServerError::InvalidCode);
    }

    tracing::info!(session_id = %session.id.as_str(), "Phone number verified");

    Ok(Json(VerifySmsResponse {
        success: true,
        status: next,
    }))
}

/// POST /api/homepage-verification/update-contact
/// Fix contact details; the session goes back to `started`
pub async fn update_contact<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<VerifySmsResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let session = load_live_session(&state.verification_store, &req.session_id)?;
    let next = session.status.apply(SessionEvent::ContactEdited)?;

    let contact = ContactForm {
        first_name: req.first_name.unwrap_or_else(|| session.first_name.clone()),
        email: req.email.unwrap_or_else(|| session.email.clone()),
        phone_number: req
            .phone_number
            .unwrap_or_else(|| session.phone_number.national().to_string()),
    }
    .validate()
    .map_err(ServerError::Validation)?;

    if !state.verification_store.update_contact(&session.id, &contact)? {
        return Err(ServerError::Conflict(format!(
            "session {} verified before the contact update",
            session.id.as_str()
        )));
    }

    tracing::info!(session_id = %session.id.as_str(), "Contact details updated");

    Ok(Json(VerifySmsResponse {
        success: true,
        status: next,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub session_id: String,
}

/// GET /api/homepage-verification/status?sessionId=
pub async fn status<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<SessionStatusResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let session = load_live_session(&state.verification_store, &query.session_id)?;

    Ok(Json(SessionStatusResponse {
        success: true,
        status: session.status,
        phone_display: session.phone_number.masked(),
        expires_at: session.expires_at,
    }))
}

//! Quick estimation endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use leadflow_core::{estimate, EstimationForm, SessionStatus};
use serde::{Deserialize, Serialize};

use crate::crypto::generate_id;
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::sms::SmsSender;
use crate::state::AppState;
use crate::store::{Estimation, LeadContact, LeadStore, SessionId, VerificationStore};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimationRequest {
    #[serde(flatten)]
    pub form: EstimationForm,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub sms_verified: bool,
}

#[derive(Serialize)]
pub struct QuickEstimationResponse {
    pub success: bool,
    pub id: String,
    pub estimation: Estimation,
}

/// Consume a verified session for `estimation_id` and return its contact
fn claim_verified_contact<V: VerificationStore>(
    store: &V,
    session_id: Option<&str>,
    estimation_id: &str,
) -> Result<LeadContact, ServerError> {
    let id = SessionId(session_id.ok_or(ServerError::NotVerified)?.to_string());
    let session = store.get_session(&id)?.ok_or(ServerError::NotVerified)?;

    if session.status != SessionStatus::Verified || session.is_expired_at(Utc::now()) {
        return Err(ServerError::NotVerified);
    }

    match store.consume_session(&id, estimation_id) {
        Ok(true) => Ok(LeadContact {
            first_name: session.first_name,
            email: session.email,
            phone_number: session.phone_number.national().to_string(),
        }),
        Ok(false) => Err(ServerError::SessionAlreadyUsed),
        Err(ServerError::SessionNotFound) => Err(ServerError::NotVerified),
        Err(e) => Err(e),
    }
}

/// POST /api/estimations-quick
/// Compute and store a price range. With `smsVerified`, the contact of a
/// verified session is attached and the session is used up.
pub async fn create_quick<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Json(req): Json<QuickEstimationRequest>,
) -> Result<Json<QuickEstimationResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let property = req.form.validate().map_err(ServerError::Validation)?;
    let id = generate_id();

    let contact = if req.sms_verified {
        Some(claim_verified_contact(
            &state.verification_store,
            req.session_id.as_deref(),
            &id,
        )?)
    } else {
        None
    };

    let estimation = Estimation {
        id: id.clone(),
        session_id: req.session_id.filter(|_| req.sms_verified),
        result: estimate(&property),
        property,
        sms_verified: req.sms_verified,
        contact,
        created_at: Utc::now(),
    };
    state.lead_store.create_estimation(estimation.clone())?;

    tracing::info!(
        estimation_id = %id,
        sms_verified = estimation.sms_verified,
        median = estimation.result.median,
        "Estimation created"
    );

    Ok(Json(QuickEstimationResponse {
        success: true,
        id,
        estimation,
    }))
}

/// GET /api/estimations/:id
pub async fn get_estimation<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    Path(id): Path<String>,
) -> Result<Json<Estimation>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    state
        .lead_store
        .get_estimation(&id)?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("estimation {}", id)))
}

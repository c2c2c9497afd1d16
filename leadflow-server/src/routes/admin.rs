//! Email sequence admin endpoints
//!
//! Every route needs `Authorization: Bearer <ADMIN_TOKEN>`. Without a
//! configured token the whole surface answers 404.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use leadflow_core::{
    EmailSequenceRecord, Persona, SequenceFilter, SequenceStats, SequenceStatus,
};
use serde::{Deserialize, Serialize};

use crate::crypto::codes_match;
use crate::dispatcher::{self, DispatchReport};
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::sms::SmsSender;
use crate::state::AppState;
use crate::store::{LeadStore, VerificationStore};
use crate::templates::default_templates;

fn require_admin<V, L, E, M>(
    state: &AppState<V, L, E, M>,
    headers: &HeaderMap,
) -> Result<(), ServerError> {
    let expected = state
        .admin_token
        .as_deref()
        .ok_or_else(|| ServerError::NotFound("admin api disabled".to_string()))?;

    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ServerError::AdminRequired)?;

    if !codes_match(expected, given) {
        tracing::warn!("Rejected admin request with wrong token");
        return Err(ServerError::AdminRequired);
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub persona: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Empty parameters mean "any"
    fn into_filter(self) -> Result<SequenceFilter, ServerError> {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        let persona = match non_empty(self.persona) {
            Some(raw) => Some(
                Persona::parse(&raw)
                    .ok_or_else(|| ServerError::BadRequest(format!("Profil inconnu : {}", raw)))?,
            ),
            None => None,
        };
        let status = match non_empty(self.status) {
            Some(raw) => Some(
                SequenceStatus::parse(&raw)
                    .ok_or_else(|| ServerError::BadRequest(format!("Statut inconnu : {}", raw)))?,
            ),
            None => None,
        };

        Ok(SequenceFilter {
            persona,
            status,
            search: non_empty(self.search),
        })
    }
}

#[derive(Serialize)]
pub struct SequenceListResponse {
    pub success: bool,
    pub total: usize,
    pub sequences: Vec<EmailSequenceRecord>,
}

/// GET /api/admin/email-sequences?persona=&status=&search=
pub async fn list_sequences<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<SequenceListResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    require_admin(&*state, &headers)?;
    let filter = query.into_filter()?;

    let sequences = filter.apply(state.lead_store.list_sequences()?);

    Ok(Json(SequenceListResponse {
        success: true,
        total: sequences.len(),
        sequences,
    }))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: SequenceStats,
}

/// GET /api/admin/email-sequences/stats
pub async fn sequence_stats<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    require_admin(&*state, &headers)?;
    let records = state.lead_store.list_sequences()?;

    Ok(Json(StatsResponse {
        success: true,
        stats: SequenceStats::collect(&records),
    }))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub sequence: EmailSequenceRecord,
}

/// PUT /api/admin/email-sequences/:id/status
/// Cancel a scheduled email or requeue a failed one
pub async fn update_sequence_status<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    require_admin(&*state, &headers)?;

    let next = SequenceStatus::parse(req.status.trim())
        .ok_or_else(|| ServerError::BadRequest(format!("Statut inconnu : {}", req.status)))?;
    let record = state
        .lead_store
        .get_sequence(&id)?
        .ok_or_else(|| ServerError::NotFound(format!("email sequence {}", id)))?;

    if !record.status.admin_can_set(next) {
        return Err(ServerError::Conflict(format!(
            "sequence {} cannot go from {} to {}",
            id, record.status, next
        )));
    }
    if !state
        .lead_store
        .transition_sequence(&id, record.status, next, None)?
    {
        return Err(ServerError::Conflict(format!(
            "sequence {} changed while updating",
            id
        )));
    }

    let sequence = state
        .lead_store
        .get_sequence(&id)?
        .ok_or_else(|| ServerError::NotFound(format!("email sequence {}", id)))?;

    tracing::info!(id = %id, from = %record.status, to = %next, "Sequence status changed by admin");

    Ok(Json(UpdateStatusResponse {
        success: true,
        sequence,
    }))
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: DispatchReport,
}

/// POST /api/admin/email-sequences/process
/// Run the dispatcher once
pub async fn process_sequences<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    headers: HeaderMap,
) -> Result<Json<ProcessResponse>, ServerError>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    require_admin(&*state, &headers)?;
    let report = dispatcher::process_due(&state).await?;

    Ok(Json(ProcessResponse {
        success: true,
        report,
    }))
}

#[derive(Serialize)]
pub struct SetupTemplatesResponse {
    pub success: bool,
    pub created: usize,
}

/// POST /api/admin/email-sequences/setup-templates
/// Seed the default templates, keeping any that already exist
pub async fn setup_templates<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    headers: HeaderMap,
) -> Result<Json<SetupTemplatesResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    require_admin(&*state, &headers)?;

    let mut created = 0;
    for template in default_templates() {
        if state.lead_store.insert_template_if_absent(template)? {
            created += 1;
        }
    }

    tracing::info!(created, "Default email templates installed");

    Ok(Json(SetupTemplatesResponse {
        success: true,
        created,
    }))
}

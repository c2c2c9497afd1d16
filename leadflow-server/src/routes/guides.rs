//! Guide catalog, guide requests and token-gated reading

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use leadflow_core::contact::{is_valid_email, normalize_email};
use leadflow_core::{FieldErrors, LeadContext, LeadSubject, LeadToken, Persona};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::crypto::generate_id;
use crate::email::EmailSender;
use crate::error::ServerError;
use crate::guides::{self, Guide};
use crate::sms::SmsSender;
use crate::state::AppState;
use crate::store::{GuideLead, LeadStore, VerificationStore};
use crate::templates::{schedule_sequence, sequence_templates};

pub const LEAD_TOKEN_COOKIE: &str = "guide_lead_token";

/// Helper to set the lead token cookie
fn set_lead_token_cookie(cookies: &Cookies, token: &str, max_age_days: i64) {
    let cookie = Cookie::build((LEAD_TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .max_age(tower_cookies::cookie::time::Duration::days(max_age_days))
        .build();
    cookies.add(cookie);
}

/// Token from `Authorization: Bearer`, falling back to the cookie
fn lead_token_from(headers: &HeaderMap, cookies: &Cookies) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| cookies.get(LEAD_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

fn verify_for_guide<V, L, E, M>(
    state: &AppState<V, L, E, M>,
    token: &str,
    guide: &Guide,
) -> Result<LeadToken, ServerError> {
    LeadToken::verify(
        token,
        &state.domain,
        Some(guide.slug),
        &state.keypair.public_key(),
    )
    .map_err(|e| {
        tracing::debug!(guide = guide.slug, error = %e, "Lead token rejected");
        ServerError::from(e)
    })
}

fn find_guide(slug: &str) -> Result<&'static Guide, ServerError> {
    guides::find(slug).ok_or_else(|| ServerError::NotFound(format!("guide {}", slug)))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Serialize)]
pub struct GuideListResponse {
    pub success: bool,
    pub guides: &'static [Guide],
}

/// GET /api/guides
pub async fn list_guides() -> Json<GuideListResponse> {
    Json(GuideListResponse {
        success: true,
        guides: guides::all(),
    })
}

/// GET /api/guides/:slug
pub async fn get_guide(Path(slug): Path<String>) -> Result<Json<&'static Guide>, ServerError> {
    find_guide(&slug).map(Json)
}

/// GET /guides
pub async fn index_page() -> Html<String> {
    let items: String = guides::all()
        .iter()
        .map(|g| {
            format!(
                "<li><h2>{}</h2><p>{}</p></li>",
                escape_html(g.title),
                escape_html(g.summary)
            )
        })
        .collect();
    Html(format!(
        "<!doctype html><html lang=\"fr\"><head><meta charset=\"utf-8\">\
         <title>Nos guides</title></head><body><h1>Nos guides</h1><ul>{}</ul></body></html>",
        items
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub city: String,
    pub persona: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRequestResponse {
    pub success: bool,
    pub lead_context: LeadContext,
    /// Reading page unlocked by the token
    pub guide_url: String,
    /// Emails scheduled for this lead
    pub scheduled: usize,
}

fn validate_guide_request(
    req: &GuideRequest,
    default_persona: Persona,
) -> Result<Persona, FieldErrors> {
    let mut errors = FieldErrors::new();

    if req.first_name.trim().is_empty() {
        errors.add("firstName", "Le prénom est requis");
    }
    if req.email.trim().is_empty() {
        errors.add("email", "L'email est requis");
    } else if !is_valid_email(&req.email) {
        errors.add("email", "Adresse email invalide");
    }
    if req.city.trim().is_empty() {
        errors.add("city", "La ville est requise");
    }

    let persona = match req.persona.as_deref().map(str::trim) {
        None | Some("") => default_persona,
        Some(raw) => Persona::parse(raw).unwrap_or_else(|| {
            errors.add("persona", "Profil inconnu");
            default_persona
        }),
    };

    errors.into_result(persona)
}

/// POST /api/guides/:slug/request
/// Register a lead for a guide, mint its token and schedule the sequence
pub async fn request_guide<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    cookies: Cookies,
    Path(slug): Path<String>,
    Json(req): Json<GuideRequest>,
) -> Result<Json<GuideRequestResponse>, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let guide = find_guide(&slug)?;
    let persona = validate_guide_request(&req, guide.persona).map_err(ServerError::Validation)?;

    let email = normalize_email(&req.email);
    let first_name = req.first_name.trim().to_string();
    let city = req.city.trim().to_string();
    let now = Utc::now();

    state.lead_store.create_guide_lead(GuideLead {
        id: generate_id(),
        guide_slug: guide.slug.to_string(),
        first_name: first_name.clone(),
        email: email.clone(),
        city: city.clone(),
        persona,
        created_at: now,
    })?;

    let token = LeadToken::issue(
        &state.domain,
        LeadSubject {
            email: &email,
            first_name: &first_name,
            city: &city,
            guide: guide.slug,
        },
        state.lead_token_validity,
        &state.keypair,
    )?;

    let templates = sequence_templates(&state.lead_store, persona)?;
    let records = schedule_sequence(&templates, guide.slug, &email, persona, now);
    let scheduled = records.len();
    for record in records {
        state.lead_store.insert_sequence(record)?;
    }

    set_lead_token_cookie(
        &cookies,
        token.encoded(),
        state.lead_token_validity.num_days(),
    );

    tracing::info!(
        guide = guide.slug,
        persona = persona.as_str(),
        scheduled,
        "Guide requested"
    );

    Ok(Json(GuideRequestResponse {
        success: true,
        lead_context: LeadContext {
            first_name,
            email,
            city,
            guide_slug: guide.slug.to_string(),
            token: token.encoded().to_string(),
        },
        guide_url: guide.read_path(),
        scheduled,
    }))
}

/// GET /guides/:slug/lire
/// Reading page; visitors without a valid token for this guide are sent
/// back to the catalog
pub async fn read_page<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let Some(guide) = guides::find(&slug) else {
        return Redirect::to("/guides").into_response();
    };
    let Some(raw) = lead_token_from(&headers, &cookies) else {
        return Redirect::to("/guides").into_response();
    };
    let token = match verify_for_guide(&*state, &raw, guide) {
        Ok(token) => token,
        Err(_) => return Redirect::to("/guides").into_response(),
    };

    let sections: String = guide
        .sections
        .iter()
        .map(|s| format!("<li>{}</li>", escape_html(s)))
        .collect();

    Html(format!(
        "<!doctype html><html lang=\"fr\"><head><meta charset=\"utf-8\">\
         <title>{title}</title></head><body>\
         <h1>{title}</h1><p>Bonne lecture, {name} !</p><p>{summary}</p><ol>{sections}</ol>\
         <p><a href=\"/api/guides/{slug}/download-pdf?token={token}\">Télécharger le PDF</a></p>\
         </body></html>",
        title = escape_html(guide.title),
        name = escape_html(&token.claims().first_name),
        summary = escape_html(guide.summary),
        sections = sections,
        slug = guide.slug,
        token = token.encoded(),
    ))
    .into_response()
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
}

/// GET /api/guides/:slug/download-pdf?token=
pub async fn download_pdf<V, L, E, M>(
    State(state): State<Arc<AppState<V, L, E, M>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ServerError>
where
    V: VerificationStore,
    L: LeadStore,
    E: EmailSender,
    M: SmsSender,
{
    let guide = find_guide(&slug)?;
    let raw = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| lead_token_from(&headers, &cookies))
        .ok_or(ServerError::Unauthorized)?;
    let token = verify_for_guide(&*state, &raw, guide)?;

    let path = guide.pdf_path(&state.guides_dir);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Guide PDF missing");
            return Err(ServerError::NotFound(format!("pdf for {}", guide.slug)));
        }
        Err(e) => return Err(ServerError::Internal(e.to_string())),
    };

    tracing::info!(guide = guide.slug, lead = %token.claims().sub, "Guide PDF downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", guide.pdf_file_name()),
            ),
        ],
        bytes,
    )
        .into_response())
}

//! HTTP routes

mod admin;
mod estimation;
mod guides;
mod health;
mod verification;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::sms::SmsSender;
use crate::state::AppState;
use crate::store::{LeadStore, VerificationStore};

pub use guides::LEAD_TOKEN_COOKIE;

/// Create the router with all routes
pub fn create_router<V, L, E, M>(state: Arc<AppState<V, L, E, M>>) -> Router
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    create_router_with_static_path(state, "static")
}

/// Create the router with a custom static file path
pub fn create_router_with_static_path<V, L, E, M>(
    state: Arc<AppState<V, L, E, M>>,
    static_path: impl AsRef<std::path::Path>,
) -> Router
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    Router::new()
        .route("/health", get(health::health))
        // Phone verification
        .route("/api/homepage-verification/start", post(verification::start))
        .route("/api/homepage-verification/send-sms", post(verification::send_sms))
        .route("/api/homepage-verification/verify-sms", post(verification::verify_sms))
        .route(
            "/api/homepage-verification/update-contact",
            post(verification::update_contact),
        )
        .route("/api/homepage-verification/status", get(verification::status))
        // Estimations
        .route("/api/estimations-quick", post(estimation::create_quick))
        .route("/api/estimations/:id", get(estimation::get_estimation))
        // Guides
        .route("/guides", get(guides::index_page))
        .route("/guides/:slug/lire", get(guides::read_page))
        .route("/api/guides", get(guides::list_guides))
        .route("/api/guides/:slug", get(guides::get_guide))
        .route("/api/guides/:slug/request", post(guides::request_guide))
        .route("/api/guides/:slug/download-pdf", get(guides::download_pdf))
        // Email sequence admin
        .route("/api/admin/email-sequences", get(admin::list_sequences))
        .route("/api/admin/email-sequences/stats", get(admin::sequence_stats))
        .route("/api/admin/email-sequences/process", post(admin::process_sequences))
        .route(
            "/api/admin/email-sequences/setup-templates",
            post(admin::setup_templates),
        )
        .route(
            "/api/admin/email-sequences/:id/status",
            put(admin::update_sequence_status),
        )
        .nest_service("/static", ServeDir::new(static_path))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Email sequence dispatcher
//!
//! Picks due scheduled records, renders their template and hands the email
//! to the sender. Each record is claimed (`scheduled → sending`) by
//! compare-and-set before delivery, so concurrent runs never send it twice
//! and a record cancelled while the batch ran is left alone.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leadflow_core::{EmailSequenceRecord, SequenceStatus};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::email::{EmailSender, OutgoingEmail};
use crate::error::ServerError;
use crate::guides;
use crate::sms::SmsSender;
use crate::state::AppState;
use crate::store::{LeadStore, VerificationStore};
use crate::templates::{render, template_for_step, TemplateVars};

/// Records handled per run
pub const BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub processed: u64,
    pub sent: u64,
    pub failed: u64,
}

fn compose<V, L, E, M>(
    state: &AppState<V, L, E, M>,
    record: &EmailSequenceRecord,
) -> Result<OutgoingEmail, String>
where
    L: LeadStore,
{
    let template = template_for_step(&state.lead_store, record.persona, record.sequence_step)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no template for step {}", record.sequence_step))?;

    let guide = guides::find(&record.guide_id);
    let lead = state
        .lead_store
        .list_guide_leads(&record.guide_id)
        .map_err(|e| e.to_string())?
        .into_iter()
        .rev()
        .find(|l| l.email == record.lead_email);

    let guide_url = match guide {
        Some(g) => format!("{}{}", state.public_url(), g.read_path()),
        None => format!("{}/guides", state.public_url()),
    };
    let vars = TemplateVars {
        first_name: lead.as_ref().map(|l| l.first_name.as_str()).unwrap_or(""),
        guide_title: guide.map(|g| g.title).unwrap_or("votre guide"),
        guide_url: &guide_url,
        city: lead.as_ref().map(|l| l.city.as_str()).unwrap_or("Gironde"),
    };

    Ok(OutgoingEmail {
        to: record.lead_email.clone(),
        subject: render(&template.subject, &vars),
        body: render(&template.body, &vars),
    })
}

/// Send an email on a blocking thread
pub async fn send_email<V, L, E, M>(
    state: &Arc<AppState<V, L, E, M>>,
    email: OutgoingEmail,
) -> Result<(), ServerError>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.email_sender.send(&email))
        .await
        .map_err(|e| ServerError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ServerError::Provider)
}

/// Run one dispatch pass over the due records
#[instrument(skip_all)]
pub async fn process_due<V, L, E, M>(
    state: &Arc<AppState<V, L, E, M>>,
) -> Result<DispatchReport, ServerError>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    let due = state.lead_store.due_sequences(Utc::now(), BATCH_SIZE)?;
    let mut report = DispatchReport::default();

    for record in due {
        // Losing the claim means another run has it or it was cancelled
        let claimed = state.lead_store.transition_sequence(
            &record.id,
            SequenceStatus::Scheduled,
            SequenceStatus::Sending,
            None,
        )?;
        if !claimed {
            continue;
        }

        let outcome = match compose(&**state, &record) {
            Ok(email) => send_email(state, email).await.map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };

        report.processed += 1;
        match outcome {
            Ok(()) => {
                state.lead_store.transition_sequence(
                    &record.id,
                    SequenceStatus::Sending,
                    SequenceStatus::Sent,
                    Some(Utc::now()),
                )?;
                report.sent += 1;
                info!(id = %record.id, step = record.sequence_step, "sequence email sent");
            }
            Err(reason) => {
                state.lead_store.transition_sequence(
                    &record.id,
                    SequenceStatus::Sending,
                    SequenceStatus::Failed,
                    None,
                )?;
                report.failed += 1;
                warn!(id = %record.id, step = record.sequence_step, %reason, "sequence email failed");
            }
        }
    }

    Ok(report)
}

/// Dispatch due emails and purge expired sessions every `every`
pub async fn run_periodic<V, L, E, M>(state: Arc<AppState<V, L, E, M>>, every: Duration)
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
    E: EmailSender + 'static,
    M: SmsSender + 'static,
{
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;

        match process_due(&state).await {
            Ok(report) if report.processed > 0 => {
                info!(sent = report.sent, failed = report.failed, "dispatch run complete")
            }
            Ok(_) => {}
            Err(err) => tracing::error!(?err, "dispatch run failed"),
        }

        match state.verification_store.cleanup_expired_sessions(Utc::now()) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "expired verification sessions removed"),
            Err(err) => tracing::error!(?err, "session cleanup failed"),
        }
    }
}

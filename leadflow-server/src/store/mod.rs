//! Storage abstractions for the server

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryLeadStore, InMemoryVerificationStore};
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use leadflow_core::{Contact, Persona, PhoneNumber};

use crate::error::ServerError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ServerError>;

/// Trait for verification session storage
pub trait VerificationStore: Send + Sync {
    /// Store a new session
    fn create_session(&self, session: VerificationSession) -> StoreResult<()>;

    /// Get a session by ID, expired or not
    fn get_session(&self, id: &SessionId) -> StoreResult<Option<VerificationSession>>;

    /// Take one send slot. Refused (`None`) once the session is verified,
    /// locked by failed attempts or out of sends. Returns the new send count.
    fn reserve_send(
        &self,
        id: &SessionId,
        max_sends: u32,
        max_attempts: u32,
    ) -> StoreResult<Option<u32>>;

    /// Store a delivered code. Only applies while the session is still on
    /// send `send_no` for `phone` and not verified.
    fn mark_code_sent(
        &self,
        id: &SessionId,
        send_no: u32,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Count one verify attempt unless `max_attempts` is already reached.
    /// Returns the new total.
    fn register_attempt(&self, id: &SessionId, max_attempts: u32) -> StoreResult<Option<u32>>;

    /// Verify the session if `code` is still the one awaiting verification
    fn mark_verified(
        &self,
        id: &SessionId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Replace the contact details and go back to `started`, dropping the
    /// pending code. Refused once verified.
    fn update_contact(&self, id: &SessionId, contact: &Contact) -> StoreResult<bool>;

    /// Attach an estimation to a verified, unconsumed session.
    /// Returns false when the session was already consumed or is not verified.
    fn consume_session(&self, id: &SessionId, estimation_id: &str) -> StoreResult<bool>;

    /// Delete sessions that expired before `now`
    fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Trait for leads, estimations and email sequences
pub trait LeadStore: Send + Sync {
    fn create_estimation(&self, estimation: Estimation) -> StoreResult<()>;

    fn get_estimation(&self, id: &str) -> StoreResult<Option<Estimation>>;

    fn create_guide_lead(&self, lead: GuideLead) -> StoreResult<()>;

    fn list_guide_leads(&self, guide_slug: &str) -> StoreResult<Vec<GuideLead>>;

    fn insert_sequence(&self, record: EmailSequenceRecord) -> StoreResult<()>;

    fn get_sequence(&self, id: &str) -> StoreResult<Option<EmailSequenceRecord>>;

    /// All records, in no particular order
    fn list_sequences(&self) -> StoreResult<Vec<EmailSequenceRecord>>;

    /// Scheduled records due at `now`, oldest first
    fn due_sequences(&self, now: DateTime<Utc>, limit: usize)
        -> StoreResult<Vec<EmailSequenceRecord>>;

    /// Move a record from `expected` to `next` if it is still in `expected`.
    /// Returns false when the record changed in between.
    fn transition_sequence(
        &self,
        id: &str,
        expected: SequenceStatus,
        next: SequenceStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;

    fn list_templates(&self) -> StoreResult<Vec<EmailTemplate>>;

    /// Templates for one persona, ordered by step
    fn templates_for(&self, persona: Persona) -> StoreResult<Vec<EmailTemplate>> {
        let mut templates: Vec<_> = self
            .list_templates()?
            .into_iter()
            .filter(|t| t.persona == persona)
            .collect();
        templates.sort_by_key(|t| t.sequence_step);
        Ok(templates)
    }

    /// Insert a template unless one exists for the same persona and step.
    /// Returns whether it was inserted.
    fn insert_template_if_absent(&self, template: EmailTemplate) -> StoreResult<bool>;
}

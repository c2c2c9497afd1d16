//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use leadflow_core::{Contact, PhoneNumber, SessionStatus};

use super::{
    EmailSequenceRecord, EmailTemplate, Estimation, GuideLead, LeadStore, SequenceStatus,
    SessionId, StoreResult, VerificationSession, VerificationStore,
};
use crate::error::ServerError;

/// In-memory verification session store
pub struct InMemoryVerificationStore {
    sessions: RwLock<HashMap<SessionId, VerificationSession>>,
}

impl InMemoryVerificationStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Move a session's expiry (for testing purposes)
    pub fn set_expires_at(&self, id: &SessionId, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        session.expires_at = expires_at;
        Ok(())
    }
}

impl Default for InMemoryVerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationStore for InMemoryVerificationStore {
    fn create_session(&self, session: VerificationSession) -> StoreResult<()> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session);
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<VerificationSession>> {
        Ok(self.sessions.read().unwrap().get(id).cloned())
    }

    fn reserve_send(
        &self,
        id: &SessionId,
        max_sends: u32,
        max_attempts: u32,
    ) -> StoreResult<Option<u32>> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        if session.status == SessionStatus::Verified
            || session.sms_sent >= max_sends
            || session.attempts >= max_attempts
        {
            return Ok(None);
        }
        session.sms_sent += 1;
        Ok(Some(session.sms_sent))
    }

    fn mark_code_sent(
        &self,
        id: &SessionId,
        send_no: u32,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        if session.status == SessionStatus::Verified
            || session.sms_sent != send_no
            || &session.phone_number != phone
        {
            return Ok(false);
        }
        session.status = SessionStatus::CodeSent;
        session.code = Some(code.to_string());
        session.expires_at = expires_at;
        Ok(true)
    }

    fn register_attempt(&self, id: &SessionId, max_attempts: u32) -> StoreResult<Option<u32>> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        if session.attempts >= max_attempts {
            return Ok(None);
        }
        session.attempts += 1;
        Ok(Some(session.attempts))
    }

    fn mark_verified(
        &self,
        id: &SessionId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        if session.status != SessionStatus::CodeSent || session.code.as_deref() != Some(code) {
            return Ok(false);
        }
        session.status = SessionStatus::Verified;
        session.code = None;
        session.expires_at = expires_at;
        Ok(true)
    }

    fn update_contact(&self, id: &SessionId, contact: &Contact) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(id).ok_or(ServerError::SessionNotFound)?;
        if session.status == SessionStatus::Verified {
            return Ok(false);
        }
        session.first_name = contact.first_name.clone();
        session.email = contact.email.clone();
        session.phone_number = contact.phone_number.clone();
        session.status = SessionStatus::Started;
        session.code = None;
        Ok(true)
    }

    fn consume_session(&self, id: &SessionId, estimation_id: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(id) {
            Some(session)
                if session.status == SessionStatus::Verified
                    && session.estimation_id.is_none() =>
            {
                session.estimation_id = Some(estimation_id.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(ServerError::SessionNotFound),
        }
    }

    fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// In-memory lead, estimation and sequence store
pub struct InMemoryLeadStore {
    estimations: RwLock<HashMap<String, Estimation>>,
    guide_leads: RwLock<Vec<GuideLead>>,
    sequences: RwLock<HashMap<String, EmailSequenceRecord>>,
    templates: RwLock<Vec<EmailTemplate>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self {
            estimations: RwLock::new(HashMap::new()),
            guide_leads: RwLock::new(Vec::new()),
            sequences: RwLock::new(HashMap::new()),
            templates: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryLeadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadStore for InMemoryLeadStore {
    fn create_estimation(&self, estimation: Estimation) -> StoreResult<()> {
        self.estimations
            .write()
            .unwrap()
            .insert(estimation.id.clone(), estimation);
        Ok(())
    }

    fn get_estimation(&self, id: &str) -> StoreResult<Option<Estimation>> {
        Ok(self.estimations.read().unwrap().get(id).cloned())
    }

    fn create_guide_lead(&self, lead: GuideLead) -> StoreResult<()> {
        self.guide_leads.write().unwrap().push(lead);
        Ok(())
    }

    fn list_guide_leads(&self, guide_slug: &str) -> StoreResult<Vec<GuideLead>> {
        Ok(self
            .guide_leads
            .read()
            .unwrap()
            .iter()
            .filter(|l| l.guide_slug == guide_slug)
            .cloned()
            .collect())
    }

    fn insert_sequence(&self, record: EmailSequenceRecord) -> StoreResult<()> {
        self.sequences
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
        Ok(())
    }

    fn get_sequence(&self, id: &str) -> StoreResult<Option<EmailSequenceRecord>> {
        Ok(self.sequences.read().unwrap().get(id).cloned())
    }

    fn list_sequences(&self) -> StoreResult<Vec<EmailSequenceRecord>> {
        Ok(self.sequences.read().unwrap().values().cloned().collect())
    }

    fn due_sequences(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<EmailSequenceRecord>> {
        let sequences = self.sequences.read().unwrap();
        let mut due: Vec<_> = sequences
            .values()
            .filter(|r| r.status == SequenceStatus::Scheduled && r.scheduled_for <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.scheduled_for);
        due.truncate(limit);
        Ok(due)
    }

    fn transition_sequence(
        &self,
        id: &str,
        expected: SequenceStatus,
        next: SequenceStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let mut sequences = self.sequences.write().unwrap();
        let record = sequences
            .get_mut(id)
            .ok_or_else(|| ServerError::NotFound(format!("email sequence {}", id)))?;
        if record.status != expected {
            return Ok(false);
        }
        record.status = next;
        if sent_at.is_some() {
            record.sent_at = sent_at;
        }
        Ok(true)
    }

    fn list_templates(&self) -> StoreResult<Vec<EmailTemplate>> {
        Ok(self.templates.read().unwrap().clone())
    }

    fn insert_template_if_absent(&self, template: EmailTemplate) -> StoreResult<bool> {
        let mut templates = self.templates.write().unwrap();
        if templates
            .iter()
            .any(|t| t.persona == template.persona && t.sequence_step == template.sequence_step)
        {
            return Ok(false);
        }
        templates.push(template);
        Ok(true)
    }
}

//! SQLite-based storage implementation

use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use leadflow_core::{Contact, Persona, PhoneNumber, SessionStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    EmailSequenceRecord, EmailTemplate, Estimation, GuideLead, LeadStore, SequenceStatus,
    SessionId, StoreResult, VerificationSession, VerificationStore,
};
use crate::error::ServerError;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// SQLite-based store implementing both VerificationStore and LeadStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> ServerError {
    ServerError::Internal(e.to_string())
}

/// Fixed-width UTC timestamps so string comparison in SQL follows time order
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn json_col<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| ServerError::Internal(e.to_string()))
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ServerError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ServerError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }
            if current_version < 2 {
                Self::migrate_v2(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ServerError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(db_err)
    }

    /// Migration to version 1: verification sessions and estimations
    fn migrate_v1(conn: &Connection) -> Result<(), ServerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS verification_sessions (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                first_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                property_data TEXT NOT NULL,
                status TEXT NOT NULL,
                code TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                sms_sent INTEGER NOT NULL DEFAULT 0,
                estimation_id TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON verification_sessions(expires_at);

            CREATE TABLE IF NOT EXISTS estimations (
                id TEXT PRIMARY KEY,
                session_id TEXT,
                property TEXT NOT NULL,
                result TEXT NOT NULL,
                sms_verified INTEGER NOT NULL DEFAULT 0,
                contact TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)
    }

    /// Migration to version 2: guide leads and email sequences
    fn migrate_v2(conn: &Connection) -> Result<(), ServerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS guide_leads (
                id TEXT PRIMARY KEY,
                guide_slug TEXT NOT NULL,
                first_name TEXT NOT NULL,
                email TEXT NOT NULL,
                city TEXT NOT NULL,
                persona TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_guide_leads_slug ON guide_leads(guide_slug);

            CREATE TABLE IF NOT EXISTS email_sequences (
                id TEXT PRIMARY KEY,
                guide_id TEXT NOT NULL,
                lead_email TEXT NOT NULL,
                persona TEXT NOT NULL,
                sequence_step INTEGER NOT NULL,
                email_type TEXT NOT NULL,
                scheduled_for TEXT NOT NULL,
                sent_at TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sequences_due ON email_sequences(status, scheduled_for);

            CREATE TABLE IF NOT EXISTS email_templates (
                persona TEXT NOT NULL,
                sequence_step INTEGER NOT NULL,
                email_type TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                delay_days INTEGER NOT NULL,
                PRIMARY KEY (persona, sequence_step)
            );
            "#,
        )
        .map_err(db_err)
    }

    /// SessionNotFound unless the session row exists
    fn ensure_session(conn: &Connection, id: &SessionId) -> StoreResult<()> {
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM verification_sessions WHERE id = ?1)",
                params![id.0],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if exists {
            Ok(())
        } else {
            Err(ServerError::SessionNotFound)
        }
    }

    fn session_from_row(row: &Row<'_>) -> rusqlite::Result<VerificationSession> {
        let phone: String = row.get(3)?;
        let property_data: String = row.get(4)?;
        let status: String = row.get(5)?;
        let created_at: String = row.get(10)?;
        let expires_at: String = row.get(11)?;
        Ok(VerificationSession {
            id: SessionId(row.get(0)?),
            email: row.get(1)?,
            first_name: row.get(2)?,
            phone_number: PhoneNumber::parse(&phone).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(3, "phone_number".into(), rusqlite::types::Type::Text)
            })?,
            property_data: json_col(4, &property_data)?,
            status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Started),
            code: row.get(6)?,
            attempts: row.get(7)?,
            sms_sent: row.get(8)?,
            estimation_id: row.get(9)?,
            created_at: parse_ts(&created_at),
            expires_at: parse_ts(&expires_at),
        })
    }

    fn sequence_from_row(row: &Row<'_>) -> rusqlite::Result<EmailSequenceRecord> {
        let persona: String = row.get(3)?;
        let scheduled_for: String = row.get(6)?;
        let sent_at: Option<String> = row.get(7)?;
        let status: String = row.get(8)?;
        let created_at: String = row.get(9)?;
        Ok(EmailSequenceRecord {
            id: row.get(0)?,
            guide_id: row.get(1)?,
            lead_email: row.get(2)?,
            persona: Persona::parse(&persona).unwrap_or(Persona::General),
            sequence_step: row.get(4)?,
            email_type: row.get(5)?,
            scheduled_for: parse_ts(&scheduled_for),
            sent_at: sent_at.as_deref().map(parse_ts),
            status: SequenceStatus::parse(&status).unwrap_or(SequenceStatus::Failed),
            created_at: parse_ts(&created_at),
        })
    }

    fn template_from_row(row: &Row<'_>) -> rusqlite::Result<EmailTemplate> {
        let persona: String = row.get(0)?;
        Ok(EmailTemplate {
            persona: Persona::parse(&persona).unwrap_or(Persona::General),
            sequence_step: row.get(1)?,
            email_type: row.get(2)?,
            subject: row.get(3)?,
            body: row.get(4)?,
            delay_days: row.get(5)?,
        })
    }
}

const SESSION_COLUMNS: &str = "id, email, first_name, phone_number, property_data, status, code, \
     attempts, sms_sent, estimation_id, created_at, expires_at";

const SEQUENCE_COLUMNS: &str = "id, guide_id, lead_email, persona, sequence_step, email_type, \
     scheduled_for, sent_at, status, created_at";

impl VerificationStore for SqliteStore {
    fn create_session(&self, session: VerificationSession) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO verification_sessions ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                SESSION_COLUMNS
            ),
            params![
                session.id.0,
                session.email,
                session.first_name,
                session.phone_number.national(),
                to_json(&session.property_data)?,
                session.status.as_str(),
                session.code,
                session.attempts,
                session.sms_sent,
                session.estimation_id,
                ts(&session.created_at),
                ts(&session.expires_at),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<VerificationSession>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM verification_sessions WHERE id = ?1",
                SESSION_COLUMNS
            ),
            params![id.0],
            Self::session_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn reserve_send(
        &self,
        id: &SessionId,
        max_sends: u32,
        max_attempts: u32,
    ) -> StoreResult<Option<u32>> {
        let conn = self.conn.lock().unwrap();

        let reserved: Option<u32> = conn
            .query_row(
                "UPDATE verification_sessions SET sms_sent = sms_sent + 1 \
                 WHERE id = ?1 AND status != ?2 AND sms_sent < ?3 AND attempts < ?4 \
                 RETURNING sms_sent",
                params![id.0, SessionStatus::Verified.as_str(), max_sends, max_attempts],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        if reserved.is_none() {
            Self::ensure_session(&conn, id)?;
        }
        Ok(reserved)
    }

    fn mark_code_sent(
        &self,
        id: &SessionId,
        send_no: u32,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE verification_sessions SET status = ?1, code = ?2, expires_at = ?3 \
                 WHERE id = ?4 AND sms_sent = ?5 AND phone_number = ?6 AND status != ?7",
                params![
                    SessionStatus::CodeSent.as_str(),
                    code,
                    ts(&expires_at),
                    id.0,
                    send_no,
                    phone.national(),
                    SessionStatus::Verified.as_str(),
                ],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            Self::ensure_session(&conn, id)?;
        }
        Ok(rows_affected > 0)
    }

    fn register_attempt(&self, id: &SessionId, max_attempts: u32) -> StoreResult<Option<u32>> {
        let conn = self.conn.lock().unwrap();

        let attempts: Option<u32> = conn
            .query_row(
                "UPDATE verification_sessions SET attempts = attempts + 1 \
                 WHERE id = ?1 AND attempts < ?2 RETURNING attempts",
                params![id.0, max_attempts],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        if attempts.is_none() {
            Self::ensure_session(&conn, id)?;
        }
        Ok(attempts)
    }

    fn mark_verified(
        &self,
        id: &SessionId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE verification_sessions SET status = ?1, code = NULL, expires_at = ?2 \
                 WHERE id = ?3 AND status = ?4 AND code = ?5",
                params![
                    SessionStatus::Verified.as_str(),
                    ts(&expires_at),
                    id.0,
                    SessionStatus::CodeSent.as_str(),
                    code,
                ],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            Self::ensure_session(&conn, id)?;
        }
        Ok(rows_affected > 0)
    }

    fn update_contact(&self, id: &SessionId, contact: &Contact) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE verification_sessions SET first_name = ?1, email = ?2, phone_number = ?3, \
                 status = ?4, code = NULL WHERE id = ?5 AND status != ?6",
                params![
                    contact.first_name,
                    contact.email,
                    contact.phone_number.national(),
                    SessionStatus::Started.as_str(),
                    id.0,
                    SessionStatus::Verified.as_str(),
                ],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            Self::ensure_session(&conn, id)?;
        }
        Ok(rows_affected > 0)
    }

    fn consume_session(&self, id: &SessionId, estimation_id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE verification_sessions SET estimation_id = ?1 \
                 WHERE id = ?2 AND status = ?3 AND estimation_id IS NULL",
                params![estimation_id, id.0, SessionStatus::Verified.as_str()],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            Self::ensure_session(&conn, id)?;
        }
        Ok(rows_affected > 0)
    }

    fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM verification_sessions WHERE expires_at <= ?1",
                params![ts(&now)],
            )
            .map_err(db_err)?;

        Ok(rows_deleted as u64)
    }
}

impl LeadStore for SqliteStore {
    fn create_estimation(&self, estimation: Estimation) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let contact = match &estimation.contact {
            Some(c) => Some(to_json(c)?),
            None => None,
        };

        conn.execute(
            "INSERT INTO estimations (id, session_id, property, result, sms_verified, contact, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                estimation.id,
                estimation.session_id,
                to_json(&estimation.property)?,
                to_json(&estimation.result)?,
                estimation.sms_verified,
                contact,
                ts(&estimation.created_at),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn get_estimation(&self, id: &str) -> StoreResult<Option<Estimation>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, session_id, property, result, sms_verified, contact, created_at \
             FROM estimations WHERE id = ?1",
            params![id],
            |row| {
                let property: String = row.get(2)?;
                let result: String = row.get(3)?;
                let contact: Option<String> = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok(Estimation {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    property: json_col(2, &property)?,
                    result: json_col(3, &result)?,
                    sms_verified: row.get(4)?,
                    contact: contact.as_deref().map(|c| json_col(5, c)).transpose()?,
                    created_at: parse_ts(&created_at),
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn create_guide_lead(&self, lead: GuideLead) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO guide_leads (id, guide_slug, first_name, email, city, persona, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                lead.id,
                lead.guide_slug,
                lead.first_name,
                lead.email,
                lead.city,
                lead.persona.as_str(),
                ts(&lead.created_at),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn list_guide_leads(&self, guide_slug: &str) -> StoreResult<Vec<GuideLead>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, guide_slug, first_name, email, city, persona, created_at \
                 FROM guide_leads WHERE guide_slug = ?1 ORDER BY created_at",
            )
            .map_err(db_err)?;

        let leads = stmt
            .query_map(params![guide_slug], |row| {
                let persona: String = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok(GuideLead {
                    id: row.get(0)?,
                    guide_slug: row.get(1)?,
                    first_name: row.get(2)?,
                    email: row.get(3)?,
                    city: row.get(4)?,
                    persona: Persona::parse(&persona).unwrap_or(Persona::General),
                    created_at: parse_ts(&created_at),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(leads)
    }

    fn insert_sequence(&self, record: EmailSequenceRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO email_sequences ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                SEQUENCE_COLUMNS
            ),
            params![
                record.id,
                record.guide_id,
                record.lead_email,
                record.persona.as_str(),
                record.sequence_step,
                record.email_type,
                ts(&record.scheduled_for),
                record.sent_at.as_ref().map(ts),
                record.status.as_str(),
                ts(&record.created_at),
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn get_sequence(&self, id: &str) -> StoreResult<Option<EmailSequenceRecord>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {} FROM email_sequences WHERE id = ?1", SEQUENCE_COLUMNS),
            params![id],
            Self::sequence_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn list_sequences(&self) -> StoreResult<Vec<EmailSequenceRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM email_sequences", SEQUENCE_COLUMNS))
            .map_err(db_err)?;

        let records = stmt
            .query_map([], Self::sequence_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(records)
    }

    fn due_sequences(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<EmailSequenceRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM email_sequences WHERE status = ?1 AND scheduled_for <= ?2 \
                 ORDER BY scheduled_for LIMIT ?3",
                SEQUENCE_COLUMNS
            ))
            .map_err(db_err)?;

        let records = stmt
            .query_map(
                params![SequenceStatus::Scheduled.as_str(), ts(&now), limit as i64],
                Self::sequence_from_row,
            )
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(records)
    }

    fn transition_sequence(
        &self,
        id: &str,
        expected: SequenceStatus,
        next: SequenceStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE email_sequences SET status = ?1, sent_at = COALESCE(?2, sent_at) \
                 WHERE id = ?3 AND status = ?4",
                params![next.as_str(), sent_at.as_ref().map(ts), id, expected.as_str()],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM email_sequences WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            if !exists {
                return Err(ServerError::NotFound(format!("email sequence {}", id)));
            }
        }
        Ok(rows_affected > 0)
    }

    fn list_templates(&self) -> StoreResult<Vec<EmailTemplate>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT persona, sequence_step, email_type, subject, body, delay_days \
                 FROM email_templates ORDER BY persona, sequence_step",
            )
            .map_err(db_err)?;

        let templates = stmt
            .query_map([], Self::template_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(templates)
    }

    fn insert_template_if_absent(&self, template: EmailTemplate) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "INSERT OR IGNORE INTO email_templates \
                 (persona, sequence_step, email_type, subject, body, delay_days) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    template.persona.as_str(),
                    template.sequence_step,
                    template.email_type,
                    template.subject,
                    template.body,
                    template.delay_days,
                ],
            )
            .map_err(db_err)?;

        Ok(rows_affected > 0)
    }
}

// Implement traits for Arc<SqliteStore> so one database backs both store roles
impl VerificationStore for Arc<SqliteStore> {
    fn create_session(&self, session: VerificationSession) -> StoreResult<()> {
        (**self).create_session(session)
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<VerificationSession>> {
        (**self).get_session(id)
    }

    fn reserve_send(
        &self,
        id: &SessionId,
        max_sends: u32,
        max_attempts: u32,
    ) -> StoreResult<Option<u32>> {
        (**self).reserve_send(id, max_sends, max_attempts)
    }

    fn mark_code_sent(
        &self,
        id: &SessionId,
        send_no: u32,
        phone: &PhoneNumber,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        (**self).mark_code_sent(id, send_no, phone, code, expires_at)
    }

    fn register_attempt(&self, id: &SessionId, max_attempts: u32) -> StoreResult<Option<u32>> {
        (**self).register_attempt(id, max_attempts)
    }

    fn mark_verified(
        &self,
        id: &SessionId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        (**self).mark_verified(id, code, expires_at)
    }

    fn update_contact(&self, id: &SessionId, contact: &Contact) -> StoreResult<bool> {
        (**self).update_contact(id, contact)
    }

    fn consume_session(&self, id: &SessionId, estimation_id: &str) -> StoreResult<bool> {
        (**self).consume_session(id, estimation_id)
    }

    fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        (**self).cleanup_expired_sessions(now)
    }
}

impl LeadStore for Arc<SqliteStore> {
    fn create_estimation(&self, estimation: Estimation) -> StoreResult<()> {
        (**self).create_estimation(estimation)
    }

    fn get_estimation(&self, id: &str) -> StoreResult<Option<Estimation>> {
        (**self).get_estimation(id)
    }

    fn create_guide_lead(&self, lead: GuideLead) -> StoreResult<()> {
        (**self).create_guide_lead(lead)
    }

    fn list_guide_leads(&self, guide_slug: &str) -> StoreResult<Vec<GuideLead>> {
        (**self).list_guide_leads(guide_slug)
    }

    fn insert_sequence(&self, record: EmailSequenceRecord) -> StoreResult<()> {
        (**self).insert_sequence(record)
    }

    fn get_sequence(&self, id: &str) -> StoreResult<Option<EmailSequenceRecord>> {
        (**self).get_sequence(id)
    }

    fn list_sequences(&self) -> StoreResult<Vec<EmailSequenceRecord>> {
        (**self).list_sequences()
    }

    fn due_sequences(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<EmailSequenceRecord>> {
        (**self).due_sequences(now, limit)
    }

    fn transition_sequence(
        &self,
        id: &str,
        expected: SequenceStatus,
        next: SequenceStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        (**self).transition_sequence(id, expected, next, sent_at)
    }

    fn list_templates(&self) -> StoreResult<Vec<EmailTemplate>> {
        (**self).list_templates()
    }

    fn insert_template_if_absent(&self, template: EmailTemplate) -> StoreResult<bool> {
        (**self).insert_template_if_absent(template)
    }
}

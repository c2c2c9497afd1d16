//! Data models for server storage

use chrono::{DateTime, Utc};
use leadflow_core::{EstimationRange, Persona, PhoneNumber, PropertyDetails, SessionStatus};
use serde::{Deserialize, Serialize};

pub use leadflow_core::{EmailSequenceRecord, SequenceStatus};

/// Opaque verification session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A phone verification in progress
#[derive(Debug, Clone)]
pub struct VerificationSession {
    pub id: SessionId,
    pub email: String,
    pub first_name: String,
    pub phone_number: PhoneNumber,
    /// Free-form snapshot of the form answers at start time
    pub property_data: serde_json::Value,
    pub status: SessionStatus,
    /// Current one-time code, set by send-sms
    pub code: Option<String>,
    /// Failed verify attempts
    pub attempts: u32,
    /// Codes sent so far
    pub sms_sent: u32,
    /// Set once an estimation consumed this verified session
    pub estimation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Contact attached to an estimation made through a verified session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadContact {
    pub first_name: String,
    pub email: String,
    pub phone_number: String,
}

/// A stored quick estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    pub id: String,
    pub session_id: Option<String>,
    pub property: PropertyDetails,
    pub result: EstimationRange,
    pub sms_verified: bool,
    pub contact: Option<LeadContact>,
    pub created_at: DateTime<Utc>,
}

/// Someone who asked for a guide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideLead {
    pub id: String,
    pub guide_slug: String,
    pub first_name: String,
    pub email: String,
    pub city: String,
    pub persona: Persona,
    pub created_at: DateTime<Utc>,
}

/// One step of a persona's nurturing sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub persona: Persona,
    pub sequence_step: u32,
    pub email_type: String,
    pub subject: String,
    pub body: String,
    /// Days after the guide request at which this step goes out
    pub delay_days: i64,
}

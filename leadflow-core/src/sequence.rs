//! Email nurturing sequences
//!
//! A guide request schedules a handful of emails for the lead. Each email
//! is one [`EmailSequenceRecord`]; the dispatcher moves records out of
//! `scheduled`, admins can cancel or requeue them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketing segment used to pick guide and email variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[serde(alias = "pressé")]
    Presse,
    Investisseur,
    #[serde(alias = "héritier")]
    Heritier,
    General,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Presse,
        Persona::Investisseur,
        Persona::Heritier,
        Persona::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Presse => "presse",
            Persona::Investisseur => "investisseur",
            Persona::Heritier => "heritier",
            Persona::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "presse" | "pressé" => Some(Persona::Presse),
            "investisseur" => Some(Persona::Investisseur),
            "heritier" | "héritier" => Some(Persona::Heritier),
            "general" | "général" => Some(Persona::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceStatus {
    Scheduled,
    /// Claimed by a dispatcher run, delivery in progress
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl SequenceStatus {
    pub const ALL: [SequenceStatus; 5] = [
        SequenceStatus::Scheduled,
        SequenceStatus::Sending,
        SequenceStatus::Sent,
        SequenceStatus::Failed,
        SequenceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceStatus::Scheduled => "scheduled",
            SequenceStatus::Sending => "sending",
            SequenceStatus::Sent => "sent",
            SequenceStatus::Failed => "failed",
            SequenceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(SequenceStatus::Scheduled),
            "sending" => Some(SequenceStatus::Sending),
            "sent" => Some(SequenceStatus::Sent),
            "failed" => Some(SequenceStatus::Failed),
            "cancelled" => Some(SequenceStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a record may move from `self` to `next`.
    ///
    /// A scheduled record is claimed (`sending`) before delivery and then
    /// lands on `sent` or `failed`. A failed record can be put back in the
    /// queue. Sent and cancelled are final.
    pub fn can_transition_to(&self, next: SequenceStatus) -> bool {
        matches!(
            (self, next),
            (
                SequenceStatus::Scheduled,
                SequenceStatus::Sending | SequenceStatus::Cancelled
            ) | (
                SequenceStatus::Sending,
                SequenceStatus::Sent | SequenceStatus::Failed
            ) | (SequenceStatus::Failed, SequenceStatus::Scheduled)
        )
    }

    /// Changes an admin may make by hand: cancel a scheduled email or
    /// requeue a failed one
    pub fn admin_can_set(&self, next: SequenceStatus) -> bool {
        matches!(
            (self, next),
            (SequenceStatus::Scheduled, SequenceStatus::Cancelled)
                | (SequenceStatus::Failed, SequenceStatus::Scheduled)
        )
    }
}

impl std::fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSequenceRecord {
    pub id: String,
    pub guide_id: String,
    pub lead_email: String,
    pub persona: Persona,
    pub sequence_step: u32,
    pub email_type: String,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: SequenceStatus,
    pub created_at: DateTime<Utc>,
}

/// Admin list filters. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SequenceFilter {
    pub persona: Option<Persona>,
    pub status: Option<SequenceStatus>,
    /// Case-insensitive substring of the lead email or guide id
    pub search: Option<String>,
}

impl SequenceFilter {
    pub fn matches(&self, record: &EmailSequenceRecord) -> bool {
        if self.persona.is_some_and(|p| p != record.persona) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                record.lead_email.to_lowercase().contains(&needle)
                    || record.guide_id.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Filter and order newest scheduled first
    pub fn apply(&self, records: Vec<EmailSequenceRecord>) -> Vec<EmailSequenceRecord> {
        let mut matched: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| {
            b.scheduled_for
                .cmp(&a.scheduled_for)
                .then_with(|| a.sequence_step.cmp(&b.sequence_step))
        });
        matched
    }
}

/// Counters shown above the admin list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStats {
    pub total: u64,
    pub by_status: BTreeMap<SequenceStatus, u64>,
    pub by_persona: BTreeMap<Persona, u64>,
}

impl SequenceStats {
    pub fn collect<'a>(records: impl IntoIterator<Item = &'a EmailSequenceRecord>) -> Self {
        let mut stats = SequenceStats {
            total: 0,
            by_status: SequenceStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            by_persona: Persona::ALL.iter().map(|p| (*p, 0)).collect(),
        };
        for record in records {
            stats.total += 1;
            *stats.by_status.entry(record.status).or_default() += 1;
            *stats.by_persona.entry(record.persona).or_default() += 1;
        }
        stats
    }

    pub fn count(&self, status: SequenceStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

//! Phone verification status machine
//!
//! ```text
//! started ──send──▶ code_sent ──verify ok──▶ verified
//!    ▲                 │  ▲
//!    └──edit contact───┘  └──resend
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Started,
    CodeSent,
    Verified,
}

/// Things that can happen to a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A code went out (first send or resend)
    CodeSent,
    /// The visitor typed the right code
    CodeAccepted,
    /// The visitor went back to fix their contact details
    ContactEdited,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Started => "started",
            SessionStatus::CodeSent => "code_sent",
            SessionStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(SessionStatus::Started),
            "code_sent" => Some(SessionStatus::CodeSent),
            "verified" => Some(SessionStatus::Verified),
            _ => None,
        }
    }

    /// Apply an event, returning the next status
    pub fn apply(self, event: SessionEvent) -> Result<SessionStatus> {
        match (self, event) {
            (SessionStatus::Started | SessionStatus::CodeSent, SessionEvent::CodeSent) => {
                Ok(SessionStatus::CodeSent)
            }
            (SessionStatus::CodeSent, SessionEvent::CodeAccepted) => Ok(SessionStatus::Verified),
            (SessionStatus::Started | SessionStatus::CodeSent, SessionEvent::ContactEdited) => {
                Ok(SessionStatus::Started)
            }
            (SessionStatus::Started, SessionEvent::CodeAccepted) | (SessionStatus::Verified, _) => {
                Err(Error::InvalidTransition {
                    from: self.as_str().to_string(),
                    event: format!("{:?}", event),
                })
            }
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

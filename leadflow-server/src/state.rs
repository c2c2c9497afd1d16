//! Application state shared by all handlers

use std::path::PathBuf;

use chrono::Duration;
use leadflow_core::KeyPair;

use crate::config::Config;

/// Limits applied to phone verification sessions
#[derive(Debug, Clone, Copy)]
pub struct VerificationPolicy {
    /// Lifetime of a session, refreshed on each send and on success
    pub session_ttl: Duration,
    /// Failed verify attempts before the session locks
    pub max_attempts: u32,
    /// Codes that may be sent for one session
    pub max_sends: u32,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            session_ttl: Duration::minutes(15),
            max_attempts: 5,
            max_sends: 3,
        }
    }
}

/// Application state
pub struct AppState<V, L, E, M> {
    /// Signing key for lead tokens
    pub keypair: KeyPair,
    /// Public domain; lead token issuer
    pub domain: String,
    pub verification_store: V,
    pub lead_store: L,
    pub email_sender: E,
    pub sms_sender: M,
    pub policy: VerificationPolicy,
    pub lead_token_validity: Duration,
    /// Admin API bearer token; `None` disables the admin routes
    pub admin_token: Option<String>,
    pub guides_dir: PathBuf,
}

impl<V, L, E, M> AppState<V, L, E, M> {
    pub fn new(
        keypair: KeyPair,
        domain: String,
        verification_store: V,
        lead_store: L,
        email_sender: E,
        sms_sender: M,
    ) -> Self {
        Self {
            keypair,
            domain,
            verification_store,
            lead_store,
            email_sender,
            sms_sender,
            policy: VerificationPolicy::default(),
            lead_token_validity: Duration::days(180),
            admin_token: None,
            guides_dir: PathBuf::from("guides"),
        }
    }

    /// Apply limits, admin token and paths from the loaded configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.policy = VerificationPolicy {
            session_ttl: config.session_ttl(),
            max_attempts: config.max_code_attempts,
            max_sends: config.max_sms_sends,
        };
        self.lead_token_validity = config.lead_token_validity();
        self.admin_token = config.admin_token.clone();
        self.guides_dir = config.guides_dir.clone();
        self
    }

    pub fn with_policy(mut self, policy: VerificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn with_guides_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.guides_dir = dir.into();
        self
    }

    /// Base URL for links put in emails
    pub fn public_url(&self) -> String {
        if self.domain.starts_with("localhost") || self.domain.starts_with("127.0.0.1") {
            format!("http://{}", self.domain)
        } else {
            format!("https://{}", self.domain)
        }
    }
}

//! Leadflow server
//!
//! HTTP service behind the estimation site: phone verification of lead
//! contacts, quick estimations, guide delivery with signed lead tokens and
//! the nurturing email sequences with their admin view.

pub mod config;
pub mod crypto;
pub mod dispatcher;
pub mod email;
pub mod error;
pub mod guides;
pub mod routes;
pub mod sms;
pub mod state;
pub mod store;
pub mod templates;

pub use config::{load_or_generate_keypair, Config};
pub use dispatcher::{process_due, DispatchReport};
pub use email::{ConsoleEmailSender, EmailSender, OutgoingEmail, SmtpConfig, SmtpEmailSender};
pub use error::ServerError;
pub use sms::{ConsoleSmsSender, HttpSmsSender, SmsGatewayConfig, SmsSender};
pub use state::{AppState, VerificationPolicy};
pub use store::{
    InMemoryLeadStore, InMemoryVerificationStore, LeadStore, SqliteStore, VerificationStore,
};

//! Leadflow core library
//!
//! Domain logic for the Gironde estimation lead flow:
//! - contact and property validation, quick price estimation
//! - the phone verification status machine
//! - signed lead tokens and the persisted lead context
//! - email sequence records, filters and statistics
//! - the client-side estimation wizard

pub mod contact;
pub mod context;
pub mod error;
pub mod keys;
pub mod lead_token;
pub mod property;
pub mod sequence;
pub mod validation;
pub mod verification;
pub mod wizard;

pub use contact::{Contact, ContactForm, PhoneNumber};
pub use context::{FileStorage, KeyValueStorage, LeadContext, LeadContextStore, MemoryStorage};
pub use error::Error;
pub use keys::{KeyPair, PublicKey};
pub use lead_token::{LeadClaims, LeadSubject, LeadToken};
pub use property::{estimate, EstimationForm, EstimationRange, PropertyDetails};
pub use sequence::{EmailSequenceRecord, Persona, SequenceFilter, SequenceStats, SequenceStatus};
pub use validation::FieldErrors;
pub use verification::{SessionEvent, SessionStatus};
pub use wizard::{LeadWizard, VerificationPhase, WizardEvent};

/// Result type for leadflow-core operations
pub type Result<T> = std::result::Result<T, Error>;

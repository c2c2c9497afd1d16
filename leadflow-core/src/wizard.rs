//! Client-side estimation wizard
//!
//! The homepage form walks the visitor through property questions, phone
//! verification and finally the result page. The state lives in one enum so
//! a screen can only be shown when the data it needs exists.

use serde_json::Value;

use crate::contact::{Contact, ContactForm};
use crate::property::{EstimationForm, PropertyDetails};
use crate::validation::FieldErrors;
use crate::{Error, Result};

/// Where the phone verification stands, as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationPhase {
    /// Session created, no code sent yet
    Started,
    /// A code went out to the masked number
    CodeSent { phone_display: String },
    /// Code accepted, estimation can be requested
    Verified,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeadWizard {
    /// Filling the form
    Form,
    /// Waiting on phone verification for a submitted form
    Verifying {
        property: PropertyDetails,
        contact: Contact,
        session_id: String,
        phase: VerificationPhase,
    },
    /// Estimation stored, result page can be shown
    Completed { estimation_id: String },
}

/// Outcome of a server call or user action that moves the wizard
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    /// `start` answered with a session id for these validated answers
    SessionStarted {
        property: PropertyDetails,
        contact: Contact,
        session_id: String,
    },
    CodeSent { phone_display: String },
    CodeResent { phone_display: String },
    CodeVerified,
    /// Back to the form to fix contact details
    EditContact,
    EstimationCreated { estimation_id: String },
}

impl WizardEvent {
    fn name(&self) -> &'static str {
        match self {
            WizardEvent::SessionStarted { .. } => "session_started",
            WizardEvent::CodeSent { .. } => "code_sent",
            WizardEvent::CodeResent { .. } => "code_resent",
            WizardEvent::CodeVerified => "code_verified",
            WizardEvent::EditContact => "edit_contact",
            WizardEvent::EstimationCreated { .. } => "estimation_created",
        }
    }
}

/// Validated submission ready for the `start` call
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub property: PropertyDetails,
    pub contact: Contact,
}

impl Submission {
    /// Property answers as the free-form snapshot stored with the session
    pub fn property_data(&self) -> Value {
        serde_json::to_value(&self.property).unwrap_or(Value::Null)
    }
}

/// Validate both form steps, reporting every field problem at once
pub fn validate_submission(
    property: &EstimationForm,
    contact: &ContactForm,
) -> std::result::Result<Submission, FieldErrors> {
    match (property.validate(), contact.validate()) {
        (Ok(property), Ok(contact)) => Ok(Submission { property, contact }),
        (Err(mut errors), Err(more)) => {
            errors.merge(more);
            Err(errors)
        }
        (Err(errors), Ok(_)) | (Ok(_), Err(errors)) => Err(errors),
    }
}

impl LeadWizard {
    pub fn new() -> Self {
        LeadWizard::Form
    }

    fn state_name(&self) -> &'static str {
        match self {
            LeadWizard::Form => "form",
            LeadWizard::Verifying { phase, .. } => match phase {
                VerificationPhase::Started => "verifying:started",
                VerificationPhase::CodeSent { .. } => "verifying:code_sent",
                VerificationPhase::Verified => "verifying:verified",
            },
            LeadWizard::Completed { .. } => "completed",
        }
    }

    /// Apply an event. On error the wizard is left untouched.
    pub fn apply(&mut self, event: WizardEvent) -> Result<()> {
        let next = self.next(event)?;
        *self = next;
        Ok(())
    }

    fn next(&self, event: WizardEvent) -> Result<LeadWizard> {
        let invalid = |event: &WizardEvent| Error::InvalidTransition {
            from: self.state_name().to_string(),
            event: event.name().to_string(),
        };

        match (self, event) {
            (
                LeadWizard::Form,
                WizardEvent::SessionStarted {
                    property,
                    contact,
                    session_id,
                },
            ) => Ok(LeadWizard::Verifying {
                property,
                contact,
                session_id,
                phase: VerificationPhase::Started,
            }),

            (
                LeadWizard::Verifying {
                    property,
                    contact,
                    session_id,
                    phase: VerificationPhase::Started,
                },
                WizardEvent::CodeSent { phone_display },
            )
            | (
                LeadWizard::Verifying {
                    property,
                    contact,
                    session_id,
                    phase: VerificationPhase::CodeSent { .. },
                },
                WizardEvent::CodeResent { phone_display },
            ) => Ok(LeadWizard::Verifying {
                property: property.clone(),
                contact: contact.clone(),
                session_id: session_id.clone(),
                phase: VerificationPhase::CodeSent { phone_display },
            }),

            (
                LeadWizard::Verifying {
                    property,
                    contact,
                    session_id,
                    phase: VerificationPhase::CodeSent { .. },
                },
                WizardEvent::CodeVerified,
            ) => Ok(LeadWizard::Verifying {
                property: property.clone(),
                contact: contact.clone(),
                session_id: session_id.clone(),
                phase: VerificationPhase::Verified,
            }),

            (
                LeadWizard::Verifying {
                    phase: VerificationPhase::Started | VerificationPhase::CodeSent { .. },
                    ..
                },
                WizardEvent::EditContact,
            ) => Ok(LeadWizard::Form),

            (
                LeadWizard::Verifying {
                    phase: VerificationPhase::Verified,
                    ..
                },
                WizardEvent::EstimationCreated { estimation_id },
            ) => Ok(LeadWizard::Completed { estimation_id }),

            (_, event) => Err(invalid(&event)),
        }
    }

    /// Session id to send with verification and estimation calls
    pub fn session_id(&self) -> Option<&str> {
        match self {
            LeadWizard::Verifying { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            LeadWizard::Verifying {
                phase: VerificationPhase::Verified,
                ..
            }
        )
    }
}

impl Default for LeadWizard {
    fn default() -> Self {
        Self::new()
    }
}

//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// A rendered email ready to go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Trait for sending nurturing sequence emails
pub trait EmailSender: Send + Sync {
    /// Send one email. Blocking; call it from `spawn_blocking`.
    fn send(&self, email: &OutgoingEmail) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        (**self).send(email)
    }
}

//! Console-based email sender for development

use super::{EmailSender, OutgoingEmail};

/// Email sender that logs to console (for development)
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  EMAIL TO: {}", email.to);
        println!("  SUBJECT: {}", email.subject);
        println!("----------------------------------------");
        println!("{}", email.body);
        println!("========================================");
        println!();

        tracing::info!(to = %email.to, subject = %email.subject, "Email written to console");

        Ok(())
    }
}

//! Console-based SMS sender for development

use leadflow_core::PhoneNumber;

use super::SmsSender;

/// SMS sender that prints codes to the console
pub struct ConsoleSmsSender;

impl ConsoleSmsSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSmsSender {
    fn default() -> Self {
        Self::new()
    }
}

impl SmsSender for ConsoleSmsSender {
    fn send_code(&self, phone: &PhoneNumber, code: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  SMS CODE FOR: {}", phone.e164());
        println!("  CODE: {}", code);
        println!("========================================");
        println!();

        tracing::info!(phone = %phone.masked(), "Verification SMS written to console");

        Ok(())
    }
}

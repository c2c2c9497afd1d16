//! SMS sending abstractions

pub mod console;
pub mod http;

pub use console::ConsoleSmsSender;
pub use http::{HttpSmsSender, SmsGatewayConfig};

use leadflow_core::PhoneNumber;

/// Trait for delivering one-time verification codes by SMS
pub trait SmsSender: Send + Sync {
    /// Send `code` to `phone`. Blocking; call it from `spawn_blocking`.
    fn send_code(&self, phone: &PhoneNumber, code: &str) -> Result<(), String>;
}

/// Allow using Box<dyn SmsSender> as an SmsSender
impl SmsSender for Box<dyn SmsSender> {
    fn send_code(&self, phone: &PhoneNumber, code: &str) -> Result<(), String> {
        (**self).send_code(phone, code)
    }
}

/// Text of the verification SMS
pub fn code_message(code: &str) -> String {
    format!(
        "Votre code de vérification : {}. Ne le communiquez à personne.",
        code
    )
}

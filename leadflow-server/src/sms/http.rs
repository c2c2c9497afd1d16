//! SMS gateway client
//!
//! Posts `{"to", "from", "text"}` as JSON to a provider endpoint with a
//! bearer API key. Any 2xx response counts as accepted.

use std::time::Duration;

use leadflow_core::PhoneNumber;
use reqwest::blocking::Client;
use serde::Serialize;

use super::{code_message, SmsSender};

/// Gateway requests give up after this long
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the HTTP SMS gateway
#[derive(Debug, Clone)]
pub struct SmsGatewayConfig {
    /// Endpoint receiving the JSON message
    pub url: String,
    pub api_key: String,
    /// Sender name or number shown to the recipient
    pub sender: String,
}

impl SmsGatewayConfig {
    /// Create config from environment variables
    ///
    /// Required:
    /// - SMS_GATEWAY_URL
    /// - SMS_API_KEY
    ///
    /// Optional:
    /// - SMS_SENDER (default: "Estimation")
    pub fn from_env() -> Option<Self> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        Some(Self {
            url: get_env("SMS_GATEWAY_URL")?,
            api_key: get_env("SMS_API_KEY")?,
            sender: get_env("SMS_SENDER").unwrap_or_else(|| "Estimation".to_string()),
        })
    }
}

#[derive(Serialize)]
struct GatewayMessage<'a> {
    to: String,
    from: &'a str,
    text: String,
}

/// SMS sender backed by an HTTP gateway
pub struct HttpSmsSender {
    config: SmsGatewayConfig,
}

impl HttpSmsSender {
    pub fn new(config: SmsGatewayConfig) -> Self {
        tracing::info!(url = %config.url, "Using HTTP SMS gateway");
        Self { config }
    }

    // Built per call: a blocking client must not be created or dropped on
    // an async worker thread, and send_code always runs in spawn_blocking.
    fn client() -> Result<Client, String> {
        Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))
    }
}

impl SmsSender for HttpSmsSender {
    fn send_code(&self, phone: &PhoneNumber, code: &str) -> Result<(), String> {
        let message = GatewayMessage {
            to: phone.e164(),
            from: &self.config.sender,
            text: code_message(code),
        };

        let response = Self::client()?
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .map_err(|e| format!("SMS gateway request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("SMS gateway error: {}", response.status()));
        }

        tracing::info!(phone = %phone.masked(), "Verification SMS sent");
        Ok(())
    }
}

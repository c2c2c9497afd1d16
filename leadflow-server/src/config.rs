//! Server configuration

use std::path::{Path, PathBuf};

use chrono::Duration;
use leadflow_core::KeyPair;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Public domain, used as lead token issuer and in guide links
    pub domain: String,

    /// SQLite database path; in-memory stores when unset
    pub database_path: Option<String>,

    /// File holding the base64 Ed25519 seed for lead tokens
    pub key_file: PathBuf,

    /// Directory with the guide PDFs, named `<slug>.pdf`
    pub guides_dir: PathBuf,

    /// Directory served under /static
    pub static_dir: PathBuf,

    /// Bearer token for the admin API; admin routes are disabled when unset
    pub admin_token: Option<String>,

    pub session_ttl_minutes: i64,
    pub max_code_attempts: u32,
    pub max_sms_sends: u32,
    pub lead_token_days: i64,

    /// Seconds between two background dispatch runs
    pub dispatch_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            domain: "localhost".to_string(),
            database_path: None,
            key_file: PathBuf::from("leadflow-key.seed"),
            guides_dir: PathBuf::from("guides"),
            static_dir: PathBuf::from("static"),
            admin_token: None,
            session_ttl_minutes: 15,
            max_code_attempts: 5,
            max_sms_sends: 3,
            lead_token_days: 180,
            dispatch_interval_secs: 60,
        }
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match get_env(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parse_env("PORT", defaults.port),
            domain: get_env("DOMAIN").unwrap_or(defaults.domain),
            database_path: get_env("DATABASE_PATH"),
            key_file: get_env("KEY_FILE").map(PathBuf::from).unwrap_or(defaults.key_file),
            guides_dir: get_env("GUIDES_DIR").map(PathBuf::from).unwrap_or(defaults.guides_dir),
            static_dir: get_env("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            admin_token: get_env("ADMIN_TOKEN"),
            session_ttl_minutes: parse_env("SESSION_TTL_MINUTES", defaults.session_ttl_minutes),
            max_code_attempts: parse_env("MAX_CODE_ATTEMPTS", defaults.max_code_attempts),
            max_sms_sends: parse_env("MAX_SMS_SENDS", defaults.max_sms_sends),
            lead_token_days: parse_env("LEAD_TOKEN_DAYS", defaults.lead_token_days),
            dispatch_interval_secs: parse_env(
                "DISPATCH_INTERVAL_SECS",
                defaults.dispatch_interval_secs,
            ),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::minutes(self.session_ttl_minutes)
    }

    pub fn lead_token_validity(&self) -> Duration {
        Duration::days(self.lead_token_days)
    }
}

/// Load the signing key from `path`, creating it on first start
pub fn load_or_generate_keypair(path: &Path) -> anyhow::Result<KeyPair> {
    if path.exists() {
        let seed = std::fs::read_to_string(path)?;
        let keypair = KeyPair::from_base64_seed(seed.trim())?;
        tracing::info!(path = %path.display(), "Loaded signing key");
        return Ok(keypair);
    }

    let keypair = KeyPair::generate();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, keypair.to_base64_seed())?;
    tracing::info!(path = %path.display(), "Generated new signing key");
    Ok(keypair)
}

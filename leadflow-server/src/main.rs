//! Leadflow server binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadflow_server::{
    dispatcher, load_or_generate_keypair, routes, AppState, Config, ConsoleEmailSender,
    ConsoleSmsSender, EmailSender, HttpSmsSender, InMemoryLeadStore, InMemoryVerificationStore,
    LeadStore, SmsGatewayConfig, SmsSender, SmtpConfig, SmtpEmailSender, SqliteStore,
    VerificationStore,
};

fn email_sender() -> Box<dyn EmailSender> {
    match SmtpConfig::from_env() {
        Some(smtp) => match SmtpEmailSender::new(smtp) {
            Ok(sender) => Box::new(sender),
            Err(e) => {
                tracing::warn!(error = %e, "SMTP unavailable, printing emails to the console");
                Box::new(ConsoleEmailSender::new())
            }
        },
        None => {
            tracing::info!("SMTP not configured, printing emails to the console");
            Box::new(ConsoleEmailSender::new())
        }
    }
}

fn sms_sender() -> Box<dyn SmsSender> {
    match SmsGatewayConfig::from_env() {
        Some(gateway) => Box::new(HttpSmsSender::new(gateway)),
        None => {
            tracing::info!("SMS gateway not configured, printing codes to the console");
            Box::new(ConsoleSmsSender::new())
        }
    }
}

type ServerState<V, L> = AppState<V, L, Box<dyn EmailSender>, Box<dyn SmsSender>>;

async fn serve<V, L>(config: Config, state: ServerState<V, L>) -> Result<()>
where
    V: VerificationStore + 'static,
    L: LeadStore + 'static,
{
    let state = Arc::new(state.with_config(&config));

    tokio::spawn(dispatcher::run_periodic(
        Arc::clone(&state),
        Duration::from_secs(config.dispatch_interval_secs.max(1)),
    ));

    let app = routes::create_router_with_static_path(state, &config.static_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadflow_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        domain = %config.domain,
        guides_dir = %config.guides_dir.display(),
        "Loaded configuration"
    );

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin API disabled");
    }

    let keypair = load_or_generate_keypair(&config.key_file)?;
    tracing::info!(
        public_key = %keypair.public_key().to_base64(),
        "Loaded keypair"
    );

    let domain = config.domain.clone();
    match config.database_path.clone() {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(&path)?);
            tracing::info!(path = %path, "Using SQLite storage");
            let state = AppState::new(
                keypair,
                domain,
                Arc::clone(&store),
                store,
                email_sender(),
                sms_sender(),
            );
            serve(config, state).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, data is kept in memory only");
            let state = AppState::new(
                keypair,
                domain,
                InMemoryVerificationStore::new(),
                InMemoryLeadStore::new(),
                email_sender(),
                sms_sender(),
            );
            serve(config, state).await
        }
    }
}

//! Accounts broker server

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accounts_broker::{
    load_or_generate_signing_key, routes, AccountStore, AppState, Config, ConsoleNotifier,
    InMemoryAccountStore, Notifier, SmtpNotifier, SqliteStore,
};
use accounts_core::SigningKey;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accounts_broker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let signing_key = load_or_generate_signing_key(&config.key_file)?;
    tracing::info!(path = %config.key_file.display(), "Loaded signing key");

    let notifier: Box<dyn Notifier> = match config.smtp.clone() {
        Some(smtp) => Box::new(
            SmtpNotifier::new(smtp, config.sender_alias.clone()).map_err(anyhow::Error::msg)?,
        ),
        None => {
            tracing::info!("SMTP not configured, printing mail to the console");
            Box::new(ConsoleNotifier::new(config.sender_alias.clone()))
        }
    };

    match &config.database_path {
        Some(path) => {
            let store = SqliteStore::open(path)?;
            tracing::info!(path = %path, "Using SQLite store");
            serve(&config, signing_key, store, notifier).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, accounts will not survive a restart");
            serve(&config, signing_key, InMemoryAccountStore::new(), notifier).await
        }
    }
}

async fn serve<S>(
    config: &Config,
    signing_key: SigningKey,
    store: S,
    notifier: Box<dyn Notifier>,
) -> Result<()>
where
    S: AccountStore + 'static,
{
    let state = Arc::new(AppState::new(config, signing_key, store, notifier)?);
    let app = routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Broker listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

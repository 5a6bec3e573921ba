//! Guild Ledger - shared-expense ledger behind a chat webhook
//!
//! A Rust backend implementing a conversation state machine that turns
//! button presses and free text into ledger entries and screen updates.

mod api;
mod config;
mod db;
mod ledger;
mod parser;
mod runtime;
mod screens;
mod state_machine;
mod telegram;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use runtime::{ConversationRouter, DatabaseStorage};
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::TelegramClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guild_ledger=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    let config = Arc::new(Config::from_env());

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.database_path.display(), "Opening database");
    let db = Database::open(&config.database_path)?;

    let router = match &config.telegram_token {
        Some(token) => {
            let client = TelegramClient::new(token, &config.telegram_api_base, config.telegram_timeout)?;
            Some(Arc::new(ConversationRouter::new(
                DatabaseStorage::new(db.clone()),
                client,
                config.clone(),
            )))
        }
        None => {
            tracing::warn!("No bot token configured. Set TELEGRAM_TOKEN to handle webhooks.");
            None
        }
    };

    if config.webhook_secret.is_none() {
        tracing::warn!("TELEGRAM_WEBHOOK_SECRET not set; webhook requests are not authenticated");
    }

    let state = AppState {
        router,
        db,
        config: config.clone(),
    };
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Guild Ledger listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

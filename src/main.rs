//! NotiHub relay: headless notification client
//!
//! Wires storage, the notification store and the hub connection together,
//! connects for the configured user and logs incoming notifications until
//! interrupted.

use tokio::sync::{broadcast, watch};
use tracing_subscriber::{EnvFilter, fmt};

use notihub_core::config::AppConfig;
use notihub_core::error::AppError;
use notihub_core::types::{AuthSignal, UserId};
use notihub_realtime::{ConnectionEvent, NotificationClient};
use notihub_store::{StoreChange, StoreEvent, open_storage};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Relay error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("NOTIHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main relay run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting NotiHub relay v{}", env!("CARGO_PKG_VERSION"));

    let storage = open_storage(&config.storage)?;
    let client = NotificationClient::new(config, storage)?;

    tokio::spawn(log_store_events(client.store().subscribe()));
    tokio::spawn(log_connection_events(client.manager().subscribe()));

    let signal = initial_signal(&client).await?;
    if signal.authenticated {
        tracing::info!("Session found; connecting to {}", client.config().hub.url);
    } else {
        tracing::warn!(
            "No session configured; set session.user_id and store a token with `notihub-cli token set`"
        );
    }
    let (auth_tx, auth_rx) = watch::channel(signal);
    let bridge = client.bind_session(auth_rx);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl-C: {}", e)))?;
    tracing::info!("Shutdown signal received");

    auth_tx.send_replace(AuthSignal::signed_out());
    bridge.shutdown().await;
    client.shutdown().await;

    let metrics = client.metrics().snapshot();
    tracing::info!(
        frames = metrics.frames_received,
        dispatched = metrics.events_dispatched,
        unhandled = metrics.events_unhandled,
        reconnects = metrics.reconnect_attempts,
        "NotiHub relay stopped"
    );
    Ok(())
}

/// Signed in when a user is configured and a token is stored.
async fn initial_signal(client: &NotificationClient) -> Result<AuthSignal, AppError> {
    let Some(user_id) = client.config().session.user_id.clone() else {
        return Ok(AuthSignal::signed_out());
    };
    match client.tokens().access_token().await? {
        Some(_) => Ok(AuthSignal::signed_in(UserId::new(user_id))),
        None => {
            tracing::warn!(user_id = %user_id, "No access token stored for configured user");
            Ok(AuthSignal::signed_out())
        }
    }
}

/// Toast-style log line for every store change.
async fn log_store_events(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match event.change {
                StoreChange::Added(n) => tracing::info!(
                    id = %n.id,
                    category = n.category.as_str(),
                    priority = n.priority.as_str(),
                    unread = event.unread_count,
                    "🔔 {}: {}",
                    n.title,
                    n.message
                ),
                StoreChange::Loaded { user_id, count } => tracing::info!(
                    user_id = %user_id,
                    count,
                    unread = event.unread_count,
                    "Notification history loaded"
                ),
                other => tracing::debug!(change = ?other, unread = event.unread_count, "Store changed"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Store event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Status-indicator log line for every connection event.
async fn log_connection_events(mut events: broadcast::Receiver<ConnectionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(event = ?event, "{}", event.describe()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Connection event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

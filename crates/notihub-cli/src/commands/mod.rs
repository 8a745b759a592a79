//! CLI command definitions and dispatch.

pub mod notifications;
pub mod token;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use notihub_core::config::AppConfig;
use notihub_core::error::AppError;
use notihub_core::traits::DurableStorage;
use notihub_core::types::UserId;
use notihub_store::{NotificationStore, open_storage};

use crate::output::OutputFormat;

/// NotiHub: inspect and manage locally stored notifications
#[derive(Debug, Parser)]
#[command(name = "notihub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (`config/{env}.toml`)
    #[arg(short, long, default_value = "development", env = "NOTIHUB_ENV")]
    pub env: String,

    /// User whose notifications to manage; defaults to `session.user_id`
    #[arg(short, long)]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List notifications, newest first
    List(notifications::ListArgs),
    /// Mark one notification read
    Read(notifications::IdArgs),
    /// Mark every notification read
    ReadAll,
    /// Remove one notification
    Remove(notifications::IdArgs),
    /// Remove every notification and purge durable storage
    Clear,
    /// Show unread count and storage details
    Status,
    /// Manage the stored access token
    Token(token::TokenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load(&self.env)?;
        let storage = open_storage(&config.storage)?;

        match &self.command {
            Commands::Token(args) => token::execute(args, &config, storage.as_ref()),
            command => {
                let user = self.resolve_user(&config)?;
                let store = open_store(&config, storage, &user);
                notifications::execute(command, &store, &user, self.format)
            }
        }
    }

    fn resolve_user(&self, config: &AppConfig) -> Result<UserId, AppError> {
        self.user
            .clone()
            .or_else(|| config.session.user_id.clone())
            .map(UserId::new)
            .ok_or_else(|| {
                AppError::validation("No user given; pass --user or set session.user_id")
            })
    }
}

/// Helper: open the store with `user`'s history loaded
pub fn open_store(
    config: &AppConfig,
    storage: Arc<dyn DurableStorage>,
    user: &UserId,
) -> NotificationStore {
    let store = NotificationStore::new(storage, config.notifications.clone());
    store.load_for_user(user);
    store
}

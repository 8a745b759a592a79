//! Notification store commands.

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use notihub_core::error::AppError;
use notihub_core::types::{Notification, NotificationId, UserId};
use notihub_store::NotificationStore;

use super::Commands;
use crate::output::{self, OutputFormat};

/// Arguments for `list`
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Include expired notifications
    #[arg(long)]
    pub all: bool,

    /// Only unread notifications
    #[arg(long)]
    pub unread: bool,
}

/// A notification id or a unique prefix of one
#[derive(Debug, Args)]
pub struct IdArgs {
    /// Notification ID (a unique prefix is enough)
    pub id: String,
}

/// Notification display row
#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    /// ID
    #[tabled(rename = "ID")]
    id: String,
    /// Read flag
    #[tabled(rename = "Read")]
    read: String,
    /// Priority
    #[tabled(rename = "Priority")]
    priority: String,
    /// Category
    #[tabled(rename = "Category")]
    category: String,
    /// Title
    #[tabled(rename = "Title")]
    title: String,
    /// Message
    #[tabled(rename = "Message")]
    message: String,
    /// Created
    #[tabled(rename = "Created")]
    created: String,
}

impl NotificationRow {
    fn new(n: &Notification, format: OutputFormat) -> Self {
        let full = format == OutputFormat::Json;
        let id = n.id.to_string();
        Self {
            id: if full { id } else { id[..8].to_string() },
            read: if n.read { "✓" } else { "" }.to_string(),
            priority: n.priority.as_str().to_string(),
            category: n.category.as_str().to_string(),
            title: n.title.clone(),
            message: if full { n.message.clone() } else { truncate(&n.message, 48) },
            created: if full {
                n.created_at.to_rfc3339()
            } else {
                local_time(n.created_at)
            },
        }
    }
}

/// Execute notification commands
pub fn execute(
    command: &Commands,
    store: &NotificationStore,
    user: &UserId,
    format: OutputFormat,
) -> Result<(), AppError> {
    match command {
        Commands::List(args) => {
            let items = if args.all { store.history() } else { store.list() };
            let rows: Vec<NotificationRow> = items
                .iter()
                .filter(|n| !args.unread || !n.read)
                .map(|n| NotificationRow::new(n, format))
                .collect();
            output::print_list(&rows, format);
        }
        Commands::Read(args) => {
            let id = resolve_id(store, &args.id)?;
            store.mark_read(&id);
            output::print_success(&format!("Marked {id} read"));
        }
        Commands::ReadAll => {
            let unread = store.unread_count();
            store.mark_all_read();
            output::print_success(&format!("Marked {unread} notification(s) read"));
        }
        Commands::Remove(args) => {
            let id = resolve_id(store, &args.id)?;
            store.remove(&id);
            output::print_success(&format!("Removed {id}"));
        }
        Commands::Clear => {
            let count = store.history().len();
            store.clear_all();
            output::print_success(&format!("Cleared {count} notification(s) for {user}"));
        }
        Commands::Status => {
            println!("Notifications for {user}:");
            output::print_kv("Visible", &store.list().len().to_string());
            output::print_kv("Unread", &store.unread_count().to_string());
            output::print_kv("Stored", &store.history().len().to_string());
        }
        Commands::Token(_) => {
            return Err(AppError::internal("Token commands are handled separately"));
        }
    }
    Ok(())
}

/// Match a full id or a unique prefix against the stored history.
fn resolve_id(store: &NotificationStore, needle: &str) -> Result<NotificationId, AppError> {
    let history = store.history();
    if let Ok(id) = needle.parse::<NotificationId>() {
        if history.iter().any(|n| n.id == id) {
            return Ok(id);
        }
        return Err(AppError::not_found(format!("No notification with id {id}")));
    }

    let needle = needle.to_lowercase();
    let matches: Vec<NotificationId> = history
        .iter()
        .map(|n| n.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(AppError::not_found(format!("No notification matches '{needle}'"))),
        _ => Err(AppError::validation(format!(
            "'{needle}' matches {} notifications; use a longer prefix",
            matches.len()
        ))),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

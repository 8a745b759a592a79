//! Access token commands.

use clap::{Args, Subcommand};

use notihub_core::config::AppConfig;
use notihub_core::error::AppError;
use notihub_core::traits::DurableStorage;

use crate::output;

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Store the access token used by the relay
    Set {
        /// Access token
        token: String,
    },
    /// Remove the stored access token
    Clear,
    /// Show whether a token is stored
    Show,
}

/// Execute token commands
pub fn execute(
    args: &TokenArgs,
    config: &AppConfig,
    storage: &dyn DurableStorage,
) -> Result<(), AppError> {
    let key = config.session.token_key.as_str();

    match &args.command {
        TokenCommand::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err(AppError::validation("Token must not be empty"));
            }
            storage.set(key, token)?;
            output::print_success(&format!("Stored access token under '{key}'"));
        }
        TokenCommand::Clear => {
            storage.remove(key)?;
            output::print_success("Access token removed");
        }
        TokenCommand::Show => match storage.get(key)? {
            Some(token) => {
                output::print_kv("Key", key);
                output::print_kv("Token", &mask(&token));
            }
            None => output::print_warning(&format!("No access token stored under '{key}'")),
        },
    }
    Ok(())
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}… ({} chars)", token.chars().count())
}

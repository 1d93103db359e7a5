//! Unlock gate CLI commands.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;

/// Arguments for unlock commands
#[derive(Debug, Args)]
pub struct UnlockArgs {
    /// Unlock subcommand
    #[command(subcommand)]
    pub command: UnlockCommand,
}

/// Unlock subcommands
#[derive(Debug, Subcommand)]
pub enum UnlockCommand {
    /// Guess the name behind a reference
    Try {
        /// The reference to unlock
        reference: String,
        /// The guess
        guess: String,
    },
    /// Check whether a reference is unlocked
    Status {
        /// The reference
        reference: String,
    },
}

/// Execute unlock commands
pub async fn execute(
    args: &UnlockArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;

    match &args.command {
        UnlockCommand::Try { reference, guess } => {
            let unlocked = coordinator.try_unlock(guess, reference).await?;
            match (format, unlocked) {
                (OutputFormat::Json, _) => output::print_json(&json!({ "unlocked": unlocked }))?,
                (OutputFormat::Table, true) => output::print_success(&format!("'{reference}' unlocked")),
                (OutputFormat::Table, false) => output::print_warning("Not quite, try again"),
            }
        }
        UnlockCommand::Status { reference } => {
            let unlocked = coordinator.is_unlocked(reference).await?;
            match format {
                OutputFormat::Json => output::print_json(&json!({ "unlocked": unlocked }))?,
                OutputFormat::Table => {
                    output::print_kv(reference, if unlocked { "unlocked" } else { "locked" })
                }
            }
        }
    }

    Ok(())
}

//! Loadout management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::{FolderId, LeafId};
use loadout_entity::Payload;
use loadout_entity::folder::tree::find_folder;

/// Arguments for loadout commands
#[derive(Debug, Args)]
pub struct LeafArgs {
    /// Loadout subcommand
    #[command(subcommand)]
    pub command: LeafCommand,
}

/// Loadout subcommands
#[derive(Debug, Subcommand)]
pub enum LeafCommand {
    /// List the loadouts in a folder
    List {
        /// Folder ID (root when omitted)
        #[arg(default_value = "0", allow_negative_numbers = true)]
        folder: FolderId,
    },
    /// Show a loadout with its payload
    Show {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
    },
    /// Create a new loadout
    Create {
        /// Loadout name
        name: String,
        /// Folder ID (root when omitted)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        folder: FolderId,
        /// Payload as a JSON object keyed by field number
        #[arg(long)]
        payload: Option<String>,
    },
    /// Rename a loadout
    Rename {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
        /// New name
        name: String,
    },
    /// Move a loadout into another folder
    Move {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
        /// Target folder ID
        #[arg(allow_negative_numbers = true)]
        target: FolderId,
    },
    /// Protect a loadout from folder deletes
    Protect {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
        /// Clear protection instead
        #[arg(long)]
        off: bool,
    },
    /// Set one payload field
    Set {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
        /// Field number
        field: u32,
        /// JSON value; anything that is not valid JSON is stored as a string
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Delete a loadout
    Delete {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
    },
    /// Copy a loadout into the same folder
    Duplicate {
        /// Loadout ID
        #[arg(allow_negative_numbers = true)]
        id: LeafId,
    },
}

/// Loadout display row
#[derive(Debug, Serialize, Tabled)]
struct LeafRow {
    /// Loadout ID
    id: i64,
    /// Name
    name: String,
    /// Protected flag
    protected: String,
    /// Last modified
    updated_at: String,
}

/// Execute loadout commands
pub async fn execute(
    args: &LeafArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;

    match &args.command {
        LeafCommand::List { folder } => {
            let tree = coordinator.tree();
            let folder = find_folder(&tree, *folder)
                .ok_or_else(|| AppError::not_found(format!("Folder {folder} not found")))?;
            let rows: Vec<LeafRow> = folder
                .leaves
                .iter()
                .map(|l| LeafRow {
                    id: l.id.get(),
                    name: l.name.clone(),
                    protected: if l.is_protected { "✓" } else { "" }.to_string(),
                    updated_at: l.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, format, "No loadouts in this folder.")?;
        }
        LeafCommand::Show { id } => {
            let record = coordinator.get_leaf(*id).await?;
            match format {
                OutputFormat::Json => output::print_json(&record)?,
                OutputFormat::Table => {
                    output::print_kv("ID", &record.id.to_string());
                    output::print_kv("Name", &record.name);
                    output::print_kv("Folder", &record.folder_id.to_string());
                    output::print_kv("Protected", &record.is_protected.to_string());
                    output::print_kv("Created", &record.created_at.to_rfc3339());
                    output::print_kv("Updated", &record.updated_at.to_rfc3339());
                    for (field, value) in &record.payload {
                        output::print_kv(&format!("Field {field}"), &value.to_string());
                    }
                }
            }
        }
        LeafCommand::Create {
            name,
            folder,
            payload,
        } => {
            let payload = parse_payload(payload.as_deref())?;
            let record = super::committed(coordinator.create_leaf(name, *folder, payload).await)?;
            output::print_success(&format!("Loadout '{}' created (id: {})", record.name, record.id));
        }
        LeafCommand::Rename { id, name } => {
            super::committed(coordinator.rename_leaf(*id, name).await)?;
            output::print_success(&format!("Loadout {id} renamed to '{}'", name.trim()));
        }
        LeafCommand::Move { id, target } => {
            super::committed(coordinator.move_leaf(*id, *target).await)?;
            output::print_success(&format!("Loadout {id} moved to folder {target}"));
        }
        LeafCommand::Protect { id, off } => {
            super::committed(coordinator.set_leaf_protected(*id, !off).await)?;
            let state = if *off { "unprotected" } else { "protected" };
            output::print_success(&format!("Loadout {id} is now {state}"));
        }
        LeafCommand::Set { id, field, value } => {
            let value = parse_value(value);
            let record =
                super::committed(coordinator.set_payload_field(*id, *field, value).await)?;
            output::print_success(&format!("Field {field} of loadout {} updated", record.id));
        }
        LeafCommand::Delete { id } => {
            super::committed(coordinator.delete_leaf(*id).await)?;
            output::print_success(&format!("Loadout {id} deleted"));
        }
        LeafCommand::Duplicate { id } => {
            let copy = super::committed(coordinator.duplicate_leaf(*id).await)?;
            output::print_success(&format!("Loadout {id} duplicated as '{}' (id: {})", copy.name, copy.id));
        }
    }

    Ok(())
}

fn parse_payload(raw: Option<&str>) -> Result<Payload, AppError> {
    match raw {
        None => Ok(Payload::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::validation(format!("Invalid payload JSON: {e}"))),
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

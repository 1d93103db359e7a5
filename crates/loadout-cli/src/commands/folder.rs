//! Folder management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::FolderId;
use loadout_entity::folder::tree::find_folder;

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// List the child folders of a folder
    List {
        /// Folder ID (root when omitted)
        #[arg(default_value = "0", allow_negative_numbers = true)]
        id: FolderId,
    },
    /// Create a new folder
    Create {
        /// Folder name
        name: String,
        /// Parent folder ID (root when omitted)
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        parent: FolderId,
    },
    /// Rename a folder
    Rename {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
        /// New name
        name: String,
    },
    /// Move a folder under another folder
    Move {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
        /// Target parent folder ID
        #[arg(allow_negative_numbers = true)]
        target: FolderId,
    },
    /// Mark a folder read-only
    Lock {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },
    /// Delete a folder and everything under it except protected loadouts
    Delete {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
        /// Delete even when the folder is not empty
        #[arg(long)]
        force: bool,
    },
    /// Deep-copy a folder next to the original
    Duplicate {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
    },
    /// Show the path from the root to a folder
    Path {
        /// Folder ID
        #[arg(allow_negative_numbers = true)]
        id: FolderId,
    },
}

/// Folder display row
#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    /// Folder ID
    id: i64,
    /// Name
    name: String,
    /// Child folders
    folders: usize,
    /// Loadouts
    loadouts: usize,
    /// Read-only flag
    read_only: String,
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;

    match &args.command {
        FolderCommand::List { id } => {
            let tree = coordinator.tree();
            let folder = find_folder(&tree, *id)
                .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
            let rows: Vec<FolderRow> = folder
                .children
                .iter()
                .map(|f| FolderRow {
                    id: f.id.get(),
                    name: f.name.clone(),
                    folders: f.children.len(),
                    loadouts: f.leaves.len(),
                    read_only: if f.is_read_only { "✓" } else { "" }.to_string(),
                })
                .collect();
            output::print_list(&rows, format, "No subfolders.")?;
        }
        FolderCommand::Create { name, parent } => {
            let id = super::committed(coordinator.create_folder(name, *parent).await)?;
            output::print_success(&format!("Folder '{}' created (id: {id})", name.trim()));
        }
        FolderCommand::Rename { id, name } => {
            super::committed(coordinator.rename_folder(*id, name).await)?;
            output::print_success(&format!("Folder {id} renamed to '{}'", name.trim()));
        }
        FolderCommand::Move { id, target } => {
            super::committed(coordinator.move_folder(*id, *target).await)?;
            output::print_success(&format!("Folder {id} moved under {target}"));
        }
        FolderCommand::Lock { id, off } => {
            super::committed(coordinator.set_read_only(*id, !off).await)?;
            let state = if *off { "writable" } else { "read-only" };
            output::print_success(&format!("Folder {id} is now {state}"));
        }
        FolderCommand::Delete { id, force } => {
            let summary = super::committed(coordinator.delete_folder(*id, *force).await)?;
            match format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Table => {
                    output::print_success(&format!("Folder {id} deleted"));
                    output::print_kv("Folders deleted", &summary.folders_deleted.to_string());
                    output::print_kv("Loadouts deleted", &summary.loadouts_deleted.to_string());
                    output::print_kv(
                        "Protected loadouts moved",
                        &summary.protected_loadouts_moved.to_string(),
                    );
                }
            }
        }
        FolderCommand::Duplicate { id } => {
            let summary = super::committed(coordinator.duplicate_folder(*id).await)?;
            match format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Folder {id} duplicated as '{}' (id: {})",
                        summary.folder.name, summary.folder.id
                    ));
                    output::print_kv("Folders copied", &summary.folders_copied.to_string());
                    output::print_kv("Loadouts copied", &summary.leaves_copied.to_string());
                }
            }
        }
        FolderCommand::Path { id } => {
            let path = coordinator.breadcrumb(*id);
            if path.is_empty() {
                return Err(AppError::not_found(format!("Folder {id} not found")));
            }
            match format {
                OutputFormat::Json => output::print_json(&path)?,
                OutputFormat::Table => println!("{}", path.join(" / ")),
            }
        }
    }

    Ok(())
}

//! CLI command definitions and dispatch.

pub mod drop;
pub mod folder;
pub mod leaf;
pub mod reorder;
pub mod tree;
pub mod unlock;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::ItemType;
use loadout_service::{Outcome, TreeCoordinator};
use loadout_store::{BackendManager, TreeBackend};

/// Loadout tree manager
#[derive(Debug, Parser)]
#[command(name = "loadout", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

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
    /// Print the folder tree
    Tree(tree::TreeArgs),
    /// Folder management
    Folder(folder::FolderArgs),
    /// Loadout management
    Leaf(leaf::LeafArgs),
    /// Reorder a folder's children
    Reorder(reorder::ReorderArgs),
    /// Resolve and apply a drag-and-drop gesture
    Drop(drop::DropArgs),
    /// Fuzzy unlock gate
    Unlock(unlock::UnlockArgs),
    /// Check that the configured backend is reachable
    Health,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        debug!(command = ?self.command, backend = %config.backend.mode, "Dispatching command");
        match &self.command {
            Commands::Tree(args) => tree::execute(args, config, self.format).await,
            Commands::Folder(args) => folder::execute(args, config, self.format).await,
            Commands::Leaf(args) => leaf::execute(args, config, self.format).await,
            Commands::Reorder(args) => reorder::execute(args, config).await,
            Commands::Drop(args) => drop::execute(args, config, self.format).await,
            Commands::Unlock(args) => unlock::execute(args, config, self.format).await,
            Commands::Health => health(config).await,
        }
    }
}

/// Child sequence selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ItemKind {
    /// Child folders
    Folder,
    /// Loadouts
    Leaf,
}

impl From<ItemKind> for ItemType {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Folder => ItemType::Folder,
            ItemKind::Leaf => ItemType::Leaf,
        }
    }
}

/// Helper: build the configured backend
pub async fn open_backend(config: &AppConfig) -> Result<BackendManager, AppError> {
    BackendManager::new(&config.backend).await
}

/// Helper: build a coordinator over the configured backend and load the tree
pub async fn open_tree(config: &AppConfig) -> Result<TreeCoordinator, AppError> {
    let backend = open_backend(config).await?;
    let coordinator = TreeCoordinator::new(Arc::new(backend), &config.coordinator);
    let tree = coordinator.refresh().await?;
    debug!(
        backend = coordinator.backend_type(),
        folders = tree.children.len(),
        loadouts = tree.leaves.len(),
        "Tree loaded"
    );
    Ok(coordinator)
}

/// Helper: unwrap a committed outcome
pub fn committed<T>(outcome: Outcome<T>) -> Result<T, AppError> {
    outcome
        .into_result()?
        .ok_or_else(|| AppError::internal("The change was replaced by a newer edit"))
}

async fn health(config: &AppConfig) -> Result<(), AppError> {
    let backend = open_backend(config).await?;
    if backend.health_check().await? {
        output::print_success(&format!("Backend '{}' is healthy", backend.backend_type()));
    } else {
        output::print_warning(&format!("Backend '{}' is unreachable", backend.backend_type()));
    }
    Ok(())
}

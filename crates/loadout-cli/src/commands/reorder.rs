//! Reorder command.

use clap::Args;

use super::ItemKind;
use crate::output;
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::FolderId;

/// Arguments for the reorder command
#[derive(Debug, Args)]
pub struct ReorderArgs {
    /// Folder whose children are reordered
    #[arg(allow_negative_numbers = true)]
    pub folder: FolderId,
    /// Which child sequence
    #[arg(short, long, value_enum)]
    pub kind: ItemKind,
    /// Every child ID of that kind, in the new order
    #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
    pub ids: Vec<i64>,
}

/// Execute the reorder command
pub async fn execute(args: &ReorderArgs, config: &AppConfig) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;
    super::committed(
        coordinator
            .reorder(args.folder, args.kind.into(), args.ids.clone())
            .await,
    )?;
    output::print_success(&format!("Folder {} reordered", args.folder));
    Ok(())
}

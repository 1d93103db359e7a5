//! Tree printing command.

use clap::Args;

use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::FolderId;
use loadout_entity::FolderNode;
use loadout_entity::folder::tree::find_folder;

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Folder to start from
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub folder: FolderId,
    /// Max depth below the starting folder
    #[arg(short, long)]
    pub depth: Option<usize>,
}

/// Execute the tree command
pub async fn execute(args: &TreeArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;
    let tree = coordinator.tree();
    let start = find_folder(&tree, args.folder)
        .ok_or_else(|| AppError::not_found(format!("Folder {} not found", args.folder)))?;

    match format {
        OutputFormat::Json => output::print_json(start)?,
        OutputFormat::Table => {
            let mut lines = Vec::new();
            render(start, 0, args.depth, &mut lines);
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn render(folder: &FolderNode, depth: usize, max_depth: Option<usize>, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let lock = if folder.is_read_only { " [read-only]" } else { "" };
    lines.push(format!("{indent}{}/ ({}){lock}", folder.name, folder.id));

    if max_depth.is_some_and(|max| depth >= max) {
        return;
    }
    for leaf in &folder.leaves {
        let protected = if leaf.is_protected { " *" } else { "" };
        lines.push(format!("{indent}  - {} ({}){protected}", leaf.name, leaf.id));
    }
    for child in &folder.children {
        render(child, depth + 1, max_depth, lines);
    }
}

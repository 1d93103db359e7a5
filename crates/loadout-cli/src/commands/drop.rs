//! Drag-and-drop command.

use clap::{Args, ValueEnum};

use super::ItemKind;
use crate::output::{self, OutputFormat};
use loadout_core::config::AppConfig;
use loadout_core::error::AppError;
use loadout_core::types::{FolderId, ItemType};
use loadout_service::{DragSource, DropIntent, DropTarget, DropZone, resolve_drop};

/// Pointer zone on the target row
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ZoneArg {
    /// Before the row
    Above,
    /// Into the row's folder
    Inside,
    /// After the row
    Below,
}

impl From<ZoneArg> for DropZone {
    fn from(zone: ZoneArg) -> Self {
        match zone {
            ZoneArg::Above => DropZone::Above,
            ZoneArg::Inside => DropZone::Inside,
            ZoneArg::Below => DropZone::Below,
        }
    }
}

/// Arguments for the drop command
#[derive(Debug, Args)]
pub struct DropArgs {
    /// Kind of the dragged item
    #[arg(long, value_enum)]
    pub kind: ItemKind,
    /// ID of the dragged item
    #[arg(long, allow_negative_numbers = true)]
    pub id: i64,
    /// Folder the dragged item is in
    #[arg(long, allow_negative_numbers = true)]
    pub from: FolderId,
    /// Kind of the row dropped on
    #[arg(long, value_enum)]
    pub onto_kind: ItemKind,
    /// ID of the row dropped on
    #[arg(long, allow_negative_numbers = true)]
    pub onto: i64,
    /// Pointer zone; derived from --offset and --height when omitted
    #[arg(long, value_enum)]
    pub zone: Option<ZoneArg>,
    /// Pointer offset from the top of the row
    #[arg(long, default_value = "0.5")]
    pub offset: f64,
    /// Row height
    #[arg(long, default_value = "1.0")]
    pub height: f64,
    /// Only print the resolved intent
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the drop command
pub async fn execute(args: &DropArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let coordinator = super::open_tree(config).await?;

    let onto_type: ItemType = args.onto_kind.into();
    let zone = args
        .zone
        .map(DropZone::from)
        .unwrap_or_else(|| DropZone::from_pointer(args.offset, args.height, onto_type));
    let source = DragSource {
        item_type: args.kind.into(),
        id: args.id,
        parent_id: args.from,
    };
    let target = DropTarget {
        item_type: onto_type,
        id: args.onto,
        zone,
    };

    let intent = resolve_drop(&coordinator.tree(), &source, &target);
    match format {
        OutputFormat::Json => output::print_json(&intent)?,
        OutputFormat::Table => output::print_kv("Intent", &describe(&intent)),
    }
    if args.dry_run {
        return Ok(());
    }
    if let DropIntent::Rejected(reason) = intent {
        output::print_warning(&format!("Nothing to do: {reason}"));
        return Ok(());
    }

    super::committed(coordinator.apply_drop(intent).await)?;
    output::print_success("Drop applied");
    Ok(())
}

fn describe(intent: &DropIntent) -> String {
    match intent {
        DropIntent::MoveInto {
            item_type,
            item_id,
            target_folder_id,
        } => format!("move {item_type} {item_id} into folder {target_folder_id}"),
        DropIntent::Reorder {
            folder_id,
            item_type,
            ordered_ids,
        } => format!("reorder {item_type} children of folder {folder_id} to {ordered_ids:?}"),
        DropIntent::MoveAndReorder {
            item_type,
            item_id,
            target_folder_id,
            ordered_ids,
            ..
        } => format!(
            "move {item_type} {item_id} into folder {target_folder_id} as {ordered_ids:?}"
        ),
        DropIntent::Rejected(reason) => format!("rejected ({reason})"),
    }
}

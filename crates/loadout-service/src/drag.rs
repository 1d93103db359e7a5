//! Drag and drop intent resolution.
//!
//! A drop is described by the dragged item and the row under the pointer.
//! [`resolve_drop`] turns that pair into one of three mutations, or a reason
//! to ignore the gesture. It only reads the tree; the coordinator applies
//! the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::FolderNode;
use loadout_entity::folder::tree::{
    child_ids, descendant_ids, effective_read_only, find_folder, find_leaf_and_parent,
};

/// Fraction of a folder row's height, at each edge, that means "beside"
/// rather than "inside".
pub const EDGE_BAND: f64 = 0.25;

/// Where on a row the pointer was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropZone {
    /// Before the row.
    Above,
    /// Into the row's folder.
    Inside,
    /// After the row.
    Below,
}

impl DropZone {
    /// Classify a pointer position inside a row.
    ///
    /// On folder rows the top and bottom [`EDGE_BAND`] mean above and below,
    /// the middle means inside. Leaf rows have no inside, so their middle
    /// resolves to the nearer edge.
    pub fn from_pointer(offset_y: f64, row_height: f64, row_type: ItemType) -> Self {
        let ratio = if row_height > 0.0 && offset_y.is_finite() {
            (offset_y / row_height).clamp(0.0, 1.0)
        } else {
            0.5
        };
        match row_type {
            ItemType::Folder if ratio < EDGE_BAND => Self::Above,
            ItemType::Folder if ratio >= 1.0 - EDGE_BAND => Self::Below,
            ItemType::Folder => Self::Inside,
            ItemType::Leaf if ratio < 0.5 => Self::Above,
            ItemType::Leaf => Self::Below,
        }
    }
}

/// The dragged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    /// Folder or leaf.
    pub item_type: ItemType,
    /// Raw id of the item.
    pub id: i64,
    /// The folder the item was listed in when the drag started.
    pub parent_id: FolderId,
}

/// The row the item was dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    /// Kind of the row.
    pub item_type: ItemType,
    /// Raw id of the row's item.
    pub id: i64,
    /// Pointer zone on the row.
    pub zone: DropZone,
}

/// Why a drop does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Dropped on itself.
    SelfDrop,
    /// A folder dropped into its own subtree.
    IntoDescendant,
    /// Source or destination is effectively read-only.
    ReadOnly,
    /// A folder placed among leaves or the other way round.
    TypeMismatch,
    /// The root row can be dropped into but not dragged or placed beside.
    RootRow,
    /// The source or target is not in the tree, or moved since the drag began.
    UnknownItem,
    /// The drop would leave everything where it is.
    AlreadyThere,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SelfDrop => "an item cannot be dropped onto itself",
            Self::IntoDescendant => "a folder cannot be moved into its own subtree",
            Self::ReadOnly => "the source or destination folder is read-only",
            Self::TypeMismatch => "folders and loadouts are ordered separately",
            Self::RootRow => "the root folder cannot be moved or placed beside",
            Self::UnknownItem => "the item is no longer where it was",
            Self::AlreadyThere => "the item is already there",
        };
        f.write_str(text)
    }
}

/// The mutation a drop asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DropIntent {
    /// Append the item to another folder.
    MoveInto {
        /// Folder or leaf.
        item_type: ItemType,
        /// Raw id of the item.
        item_id: i64,
        /// Destination folder.
        target_folder_id: FolderId,
    },
    /// Reorder within the current folder.
    Reorder {
        /// The folder whose sequence changes.
        folder_id: FolderId,
        /// Which sequence.
        item_type: ItemType,
        /// The complete new order.
        ordered_ids: Vec<i64>,
    },
    /// Move to another folder at a specific position.
    MoveAndReorder {
        /// Folder or leaf.
        item_type: ItemType,
        /// Raw id of the item.
        item_id: i64,
        /// Current folder.
        source_folder_id: FolderId,
        /// Destination folder.
        target_folder_id: FolderId,
        /// The destination's complete new order, the item included.
        ordered_ids: Vec<i64>,
    },
    /// Nothing to do.
    Rejected(RejectReason),
}

/// Resolve a drop gesture against the current tree.
///
/// Checks run in a fixed order: missing items and root rows first, then
/// self and descendant drops, type mismatches, read-only folders, and
/// finally drops that change nothing.
pub fn resolve_drop(tree: &FolderNode, source: &DragSource, target: &DropTarget) -> DropIntent {
    try_resolve(tree, source, target).unwrap_or_else(DropIntent::Rejected)
}

fn try_resolve(
    tree: &FolderNode,
    source: &DragSource,
    target: &DropTarget,
) -> Result<DropIntent, RejectReason> {
    let source_parent = parent_of(tree, source.item_type, source.id)?;
    if source_parent != source.parent_id {
        return Err(RejectReason::UnknownItem);
    }

    match target.zone {
        DropZone::Inside => {
            if target.item_type != ItemType::Folder {
                return Err(RejectReason::TypeMismatch);
            }
            let dest = FolderId(target.id);
            if find_folder(tree, dest).is_none() {
                return Err(RejectReason::UnknownItem);
            }
            check_not_into_self(tree, source, dest)?;
            check_writable(tree, source, source_parent, dest)?;
            if dest == source_parent {
                return Err(RejectReason::AlreadyThere);
            }
            Ok(DropIntent::MoveInto {
                item_type: source.item_type,
                item_id: source.id,
                target_folder_id: dest,
            })
        }
        DropZone::Above | DropZone::Below => {
            let dest = parent_of(tree, target.item_type, target.id)?;
            if target.item_type == source.item_type && target.id == source.id {
                return Err(RejectReason::SelfDrop);
            }
            if target.item_type != source.item_type {
                return Err(RejectReason::TypeMismatch);
            }
            check_not_into_self(tree, source, dest)?;
            check_writable(tree, source, source_parent, dest)?;

            let folder = find_folder(tree, dest).ok_or(RejectReason::UnknownItem)?;
            let current = child_ids(folder, source.item_type);
            let mut ordered: Vec<i64> = current
                .iter()
                .copied()
                .filter(|id| *id != source.id)
                .collect();
            let anchor = ordered
                .iter()
                .position(|id| *id == target.id)
                .ok_or(RejectReason::UnknownItem)?;
            let at = match target.zone {
                DropZone::Above => anchor,
                _ => anchor + 1,
            };
            ordered.insert(at, source.id);

            if dest != source_parent {
                return Ok(DropIntent::MoveAndReorder {
                    item_type: source.item_type,
                    item_id: source.id,
                    source_folder_id: source_parent,
                    target_folder_id: dest,
                    ordered_ids: ordered,
                });
            }
            if ordered == current {
                return Err(RejectReason::AlreadyThere);
            }
            Ok(DropIntent::Reorder {
                folder_id: dest,
                item_type: source.item_type,
                ordered_ids: ordered,
            })
        }
    }
}

/// The folder currently listing an item.
fn parent_of(tree: &FolderNode, item_type: ItemType, id: i64) -> Result<FolderId, RejectReason> {
    match item_type {
        ItemType::Folder => find_folder(tree, FolderId(id))
            .ok_or(RejectReason::UnknownItem)?
            .parent_id
            .ok_or(RejectReason::RootRow),
        ItemType::Leaf => find_leaf_and_parent(tree, LeafId(id))
            .map(|(parent, _)| parent.id)
            .ok_or(RejectReason::UnknownItem),
    }
}

fn check_not_into_self(
    tree: &FolderNode,
    source: &DragSource,
    dest: FolderId,
) -> Result<(), RejectReason> {
    if source.item_type != ItemType::Folder {
        return Ok(());
    }
    let folder_id = FolderId(source.id);
    if dest == folder_id {
        return Err(RejectReason::SelfDrop);
    }
    if descendant_ids(tree, folder_id).contains(&dest) {
        return Err(RejectReason::IntoDescendant);
    }
    Ok(())
}

fn check_writable(
    tree: &FolderNode,
    source: &DragSource,
    source_parent: FolderId,
    dest: FolderId,
) -> Result<(), RejectReason> {
    let locked_folder =
        source.item_type == ItemType::Folder && effective_read_only(tree, FolderId(source.id));
    if locked_folder
        || effective_read_only(tree, source_parent)
        || effective_read_only(tree, dest)
    {
        return Err(RejectReason::ReadOnly);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loadout_entity::LeafSummary;
    use std::sync::Arc;

    fn leaf(id: i64) -> LeafSummary {
        LeafSummary {
            id: LeafId(id),
            name: format!("Loadout {id}"),
            updated_at: Utc::now(),
            is_protected: false,
        }
    }

    fn folder(id: i64, parent: i64, children: Vec<FolderNode>, leaves: &[i64]) -> FolderNode {
        let mut node = FolderNode::new(FolderId(id), format!("Folder {id}"), FolderId(parent));
        node.children = children.into_iter().map(Arc::new).collect();
        node.leaves = leaves.iter().map(|id| leaf(*id)).collect();
        node
    }

    /// Root(0) -> A(1)[10, 11] -> B(2)[12]
    /// Root(0) -> C(3, read-only)[13]
    /// Root(0) -> D(4)
    fn sample() -> FolderNode {
        let b = folder(2, 1, vec![], &[12]);
        let a = folder(1, 0, vec![b], &[10, 11]);
        let mut c = folder(3, 0, vec![], &[13]);
        c.is_read_only = true;
        let d = folder(4, 0, vec![], &[]);

        let mut root = FolderNode::default();
        root.children = vec![Arc::new(a), Arc::new(c), Arc::new(d)];
        root
    }

    fn leaf_source(id: i64, parent: i64) -> DragSource {
        DragSource {
            item_type: ItemType::Leaf,
            id,
            parent_id: FolderId(parent),
        }
    }

    fn folder_source(id: i64, parent: i64) -> DragSource {
        DragSource {
            item_type: ItemType::Folder,
            id,
            parent_id: FolderId(parent),
        }
    }

    fn on(item_type: ItemType, id: i64, zone: DropZone) -> DropTarget {
        DropTarget {
            item_type,
            id,
            zone,
        }
    }

    fn rejected(reason: RejectReason) -> DropIntent {
        DropIntent::Rejected(reason)
    }

    #[test]
    fn test_zone_bands_on_folder_rows() {
        assert_eq!(DropZone::from_pointer(2.0, 40.0, ItemType::Folder), DropZone::Above);
        assert_eq!(DropZone::from_pointer(20.0, 40.0, ItemType::Folder), DropZone::Inside);
        assert_eq!(DropZone::from_pointer(30.0, 40.0, ItemType::Folder), DropZone::Below);
        assert_eq!(DropZone::from_pointer(-5.0, 40.0, ItemType::Folder), DropZone::Above);
    }

    #[test]
    fn test_leaf_rows_have_no_inside() {
        assert_eq!(DropZone::from_pointer(19.0, 40.0, ItemType::Leaf), DropZone::Above);
        assert_eq!(DropZone::from_pointer(21.0, 40.0, ItemType::Leaf), DropZone::Below);
    }

    #[test]
    fn test_degenerate_row_height_is_middle() {
        assert_eq!(DropZone::from_pointer(5.0, 0.0, ItemType::Folder), DropZone::Inside);
        assert_eq!(DropZone::from_pointer(f64::NAN, 40.0, ItemType::Folder), DropZone::Inside);
    }

    #[test]
    fn test_leaf_into_other_folder() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &leaf_source(10, 1),
            &on(ItemType::Folder, 4, DropZone::Inside),
        );
        assert_eq!(
            intent,
            DropIntent::MoveInto {
                item_type: ItemType::Leaf,
                item_id: 10,
                target_folder_id: FolderId(4),
            }
        );
    }

    #[test]
    fn test_leaf_into_own_folder_is_noop() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &leaf_source(10, 1),
            &on(ItemType::Folder, 1, DropZone::Inside),
        );
        assert_eq!(intent, rejected(RejectReason::AlreadyThere));
    }

    #[test]
    fn test_folder_into_itself_or_descendant() {
        let tree = sample();
        let source = folder_source(1, 0);
        assert_eq!(
            resolve_drop(&tree, &source, &on(ItemType::Folder, 1, DropZone::Inside)),
            rejected(RejectReason::SelfDrop)
        );
        assert_eq!(
            resolve_drop(&tree, &source, &on(ItemType::Folder, 2, DropZone::Inside)),
            rejected(RejectReason::IntoDescendant)
        );
    }

    #[test]
    fn test_read_only_on_either_side() {
        let tree = sample();
        assert_eq!(
            resolve_drop(&tree, &leaf_source(10, 1), &on(ItemType::Folder, 3, DropZone::Inside)),
            rejected(RejectReason::ReadOnly)
        );
        assert_eq!(
            resolve_drop(&tree, &leaf_source(13, 3), &on(ItemType::Folder, 4, DropZone::Inside)),
            rejected(RejectReason::ReadOnly)
        );
        assert_eq!(
            resolve_drop(&tree, &folder_source(3, 0), &on(ItemType::Folder, 4, DropZone::Inside)),
            rejected(RejectReason::ReadOnly)
        );
    }

    #[test]
    fn test_reorder_within_folder() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &leaf_source(11, 1),
            &on(ItemType::Leaf, 10, DropZone::Above),
        );
        assert_eq!(
            intent,
            DropIntent::Reorder {
                folder_id: FolderId(1),
                item_type: ItemType::Leaf,
                ordered_ids: vec![11, 10],
            }
        );
    }

    #[test]
    fn test_folder_reorder_at_root() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &folder_source(1, 0),
            &on(ItemType::Folder, 4, DropZone::Below),
        );
        assert_eq!(
            intent,
            DropIntent::Reorder {
                folder_id: FolderId::ROOT,
                item_type: ItemType::Folder,
                ordered_ids: vec![3, 4, 1],
            }
        );
    }

    #[test]
    fn test_reorder_to_same_position_is_noop() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &leaf_source(10, 1),
            &on(ItemType::Leaf, 11, DropZone::Above),
        );
        assert_eq!(intent, rejected(RejectReason::AlreadyThere));
    }

    #[test]
    fn test_beside_row_in_other_folder_moves_and_reorders() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &leaf_source(12, 2),
            &on(ItemType::Leaf, 10, DropZone::Below),
        );
        assert_eq!(
            intent,
            DropIntent::MoveAndReorder {
                item_type: ItemType::Leaf,
                item_id: 12,
                source_folder_id: FolderId(2),
                target_folder_id: FolderId(1),
                ordered_ids: vec![10, 12, 11],
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let tree = sample();
        assert_eq!(
            resolve_drop(&tree, &leaf_source(10, 1), &on(ItemType::Folder, 2, DropZone::Above)),
            rejected(RejectReason::TypeMismatch)
        );
        assert_eq!(
            resolve_drop(&tree, &folder_source(4, 0), &on(ItemType::Leaf, 10, DropZone::Inside)),
            rejected(RejectReason::TypeMismatch)
        );
    }

    #[test]
    fn test_root_and_unknown_rows() {
        let tree = sample();
        assert_eq!(
            resolve_drop(&tree, &folder_source(4, 0), &on(ItemType::Folder, 0, DropZone::Above)),
            rejected(RejectReason::RootRow)
        );
        assert_eq!(
            resolve_drop(&tree, &folder_source(0, 0), &on(ItemType::Folder, 4, DropZone::Inside)),
            rejected(RejectReason::RootRow)
        );
        assert_eq!(
            resolve_drop(&tree, &leaf_source(99, 1), &on(ItemType::Folder, 4, DropZone::Inside)),
            rejected(RejectReason::UnknownItem)
        );
        // the leaf moved since the drag began
        assert_eq!(
            resolve_drop(&tree, &leaf_source(10, 4), &on(ItemType::Folder, 2, DropZone::Inside)),
            rejected(RejectReason::UnknownItem)
        );
    }

    #[test]
    fn test_intent_json_shape() {
        let rejected = serde_json::to_value(DropIntent::Rejected(RejectReason::ReadOnly)).unwrap();
        assert_eq!(
            rejected,
            serde_json::json!({"kind": "rejected", "detail": "read_only"})
        );

        let moved = serde_json::to_value(DropIntent::MoveInto {
            item_type: ItemType::Leaf,
            item_id: -3,
            target_folder_id: FolderId(-1),
        })
        .unwrap();
        assert_eq!(moved["kind"], "move_into");
        assert_eq!(moved["detail"]["target_folder_id"], -1);
    }

    #[test]
    fn test_root_accepts_drops_inside() {
        let tree = sample();
        let intent = resolve_drop(
            &tree,
            &folder_source(2, 1),
            &on(ItemType::Folder, 0, DropZone::Inside),
        );
        assert_eq!(
            intent,
            DropIntent::MoveInto {
                item_type: ItemType::Folder,
                item_id: 2,
                target_folder_id: FolderId::ROOT,
            }
        );
    }
}

//! # loadout-service
//!
//! The layer presentation code talks to. [`TreeCoordinator`] owns the
//! visible tree, applies every mutation to it before the backend answers and
//! reconciles afterwards; [`drag`] turns a drop gesture into the mutation
//! the coordinator should run.

pub mod coordinator;
pub mod drag;

pub use coordinator::{MutationKey, Notice, Outcome, TreeCoordinator};
pub use drag::{DragSource, DropIntent, DropTarget, DropZone, RejectReason, resolve_drop};

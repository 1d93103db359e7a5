//! Leaf item (loadout) entities.

pub mod model;

pub use model::{LeafRecord, LeafSummary, Payload, copy_name};

//! Per-key tracking of in-flight edits so a newer edit can cancel an older one.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use loadout_core::types::{FolderId, LeafId};

/// What an edit targets. Two edits with the same key supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKey {
    /// One payload field of one leaf.
    PayloadField {
        /// The leaf.
        leaf_id: LeafId,
        /// The field.
        field: u32,
    },
    /// A leaf's name.
    LeafName(LeafId),
    /// A folder's name.
    FolderName(FolderId),
}

/// Handle held by one in-flight edit.
#[derive(Debug)]
pub struct Ticket {
    key: MutationKey,
    seq: u64,
    token: CancellationToken,
}

impl Ticket {
    /// Resolves once a newer edit for the same key has started.
    pub fn superseded(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Whether a newer edit for the same key has started.
    pub fn is_superseded(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Registry of the newest edit per key.
#[derive(Debug, Default)]
pub struct InFlight {
    entries: DashMap<MutationKey, (u64, CancellationToken)>,
    seq: AtomicU64,
}

impl InFlight {
    /// Register a new edit for `key`, cancelling the one it replaces.
    pub fn begin(&self, key: MutationKey) -> Ticket {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        if let Some((_, stale)) = self.entries.insert(key, (seq, token.clone())) {
            stale.cancel();
        }
        Ticket { key, seq, token }
    }

    /// Drop the entry for a finished edit unless a newer one replaced it.
    pub fn finish(&self, ticket: &Ticket) {
        self.entries
            .remove_if(&ticket.key, |_, (seq, _)| *seq == ticket.seq);
    }
}

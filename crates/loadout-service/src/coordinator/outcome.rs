//! How a coordinated mutation ended.

use loadout_core::error::AppError;
use loadout_core::result::AppResult;

/// Final state of one mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The backend accepted the change; the visible tree already shows it.
    Committed(T),
    /// The backend rejected the change and the visible tree was restored.
    RolledBack(AppError),
    /// A composite change failed halfway; the tree was re-fetched instead of
    /// restored. When the re-fetch failed too, the tree shows the part that
    /// did commit.
    Reconciled(AppError),
    /// A client-side precondition failed; nothing was dispatched.
    Rejected(AppError),
    /// A newer mutation for the same key replaced this one; its result was
    /// discarded.
    Superseded,
}

impl<T> Outcome<T> {
    /// Whether the change was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// The error that ended the mutation, if any.
    pub fn error(&self) -> Option<&AppError> {
        match self {
            Self::RolledBack(e) | Self::Reconciled(e) | Self::Rejected(e) => Some(e),
            Self::Committed(_) | Self::Superseded => None,
        }
    }

    /// Map the committed value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Committed(v) => Outcome::Committed(f(v)),
            Self::RolledBack(e) => Outcome::RolledBack(e),
            Self::Reconciled(e) => Outcome::Reconciled(e),
            Self::Rejected(e) => Outcome::Rejected(e),
            Self::Superseded => Outcome::Superseded,
        }
    }

    /// `Ok(Some(v))` when committed, `Ok(None)` when superseded, else the error.
    pub fn into_result(self) -> AppResult<Option<T>> {
        match self {
            Self::Committed(v) => Ok(Some(v)),
            Self::Superseded => Ok(None),
            Self::RolledBack(e) | Self::Reconciled(e) | Self::Rejected(e) => Err(e),
        }
    }
}

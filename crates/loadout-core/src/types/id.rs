//! Integer identifiers for folders and leaf items.
//!
//! Reserved ranges:
//!
//! * `0` is the root folder sentinel.
//! * Negative ids are allocated by the local backend, counting down from `-1`.
//! * Positive ids are allocated by the remote service.
//!
//! Because the ranges never overlap, the client can switch between backends
//! without an id translation table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `i64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }

            /// Whether this id was allocated by the local backend.
            pub fn is_local(self) -> bool {
                self.0 < 0
            }

            /// Whether this id was allocated by the remote service.
            pub fn is_remote(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a folder within one tree.
    FolderId
);

define_id!(
    /// Unique identifier for a leaf item (loadout).
    LeafId
);

impl FolderId {
    /// The root folder sentinel.
    pub const ROOT: FolderId = FolderId(0);

    /// Whether this is the root sentinel.
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

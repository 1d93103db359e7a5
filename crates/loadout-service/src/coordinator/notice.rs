//! Transient user-facing notices.

use serde::Serialize;

use loadout_core::error::{AppError, ErrorKind};

/// One notice per failed operation, shown briefly by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Error category.
    pub kind: ErrorKind,
    /// Text to display.
    pub message: String,
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind,
            message: err.user_message(),
        }
    }
}

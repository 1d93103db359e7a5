//! Unified error types for the loadout tree engine.
//!
//! Every crate maps its internal failures into [`AppError`] so that the
//! coordinator can treat local and remote backends identically.

use std::fmt;
use thiserror::Error;

/// Error category shared by both backends and the coordinator.
///
/// The serialized form doubles as the remote service's wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A referenced folder or leaf id does not exist.
    NotFound,
    /// The move would create a cycle, or targets the root / the item itself.
    InvalidMove,
    /// A reorder list is not a permutation of the current children.
    InvalidOrder,
    /// A non-forced delete was requested on a populated folder.
    NotEmpty,
    /// The local persistent store rejected a write due to capacity.
    StorageFull,
    /// The operation is not available with the active backend or the backend is unreachable.
    Unavailable,
    /// Input validation failed (e.g. an empty name).
    Validation,
    /// Any other local persistence failure.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// The remote service answered with an unexpected failure.
    ExternalService,
    /// An internal invariant was broken.
    Internal,
}

impl ErrorKind {
    /// The wire code for this kind (`NOT_FOUND`, `STORAGE_FULL`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidMove => "INVALID_MOVE",
            Self::InvalidOrder => "INVALID_ORDER",
            Self::NotEmpty => "NOT_EMPTY",
            Self::StorageFull => "STORAGE_FULL",
            Self::Unavailable => "UNAVAILABLE",
            Self::Validation => "VALIDATION",
            Self::Storage => "STORAGE",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Parse a wire code back into a kind.
    pub fn from_code(code: &str) -> Option<Self> {
        let kind = match code {
            "NOT_FOUND" => Self::NotFound,
            "INVALID_MOVE" => Self::InvalidMove,
            "INVALID_ORDER" => Self::InvalidOrder,
            "NOT_EMPTY" => Self::NotEmpty,
            "STORAGE_FULL" => Self::StorageFull,
            "UNAVAILABLE" => Self::Unavailable,
            "VALIDATION" => Self::Validation,
            "STORAGE" => Self::Storage,
            "SERIALIZATION" => Self::Serialization,
            "CONFIGURATION" => Self::Configuration,
            "EXTERNAL_SERVICE" => Self::ExternalService,
            "INTERNAL" => Self::Internal,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The unified error used throughout the workspace.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an invalid-move error.
    pub fn invalid_move(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMove, message)
    }

    /// Create an invalid-order error.
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOrder, message)
    }

    /// Create a not-empty error.
    pub fn not_empty(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotEmpty, message)
    }

    /// Create a storage-full error.
    pub fn storage_full(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFull, message)
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether repeating the same call could succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Unavailable | ErrorKind::ExternalService)
    }

    /// Text for the transient notice shown after a failed operation.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::StorageFull => format!(
                "Local storage is full ({}). Free space by deleting loadouts or folders, then retry.",
                self.message
            ),
            ErrorKind::NotFound => format!("That item no longer exists: {}", self.message),
            ErrorKind::InvalidMove => format!("That move is not allowed: {}", self.message),
            ErrorKind::InvalidOrder => {
                format!("The order changed underneath you: {}", self.message)
            }
            ErrorKind::NotEmpty => format!("The folder is not empty: {}", self.message),
            ErrorKind::Unavailable => format!("Not available right now: {}", self.message),
            _ => format!("Something went wrong: {}", self.message),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl PartialEq for AppError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::StorageFull {
            ErrorKind::StorageFull
        } else {
            ErrorKind::Storage
        };
        Self::with_source(kind, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

//! # loadout-core
//!
//! Core crate for the loadout tree engine. Contains the unified error
//! system, configuration schemas, typed identifiers and the persistent
//! key-space trait the local backend is built on.
//!
//! This crate has **no** internal dependencies on other loadout crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;

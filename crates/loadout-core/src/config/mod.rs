//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `LOADOUT__*` environment variables. Each sub-module
//! represents a logical configuration section.

pub mod backend;
pub mod coordinator;
pub mod logging;

use serde::{Deserialize, Serialize};

use self::backend::BackendConfig;
use self::coordinator::CoordinatorConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which store backend to use and how to reach it.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Optimistic mutation coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `path` (if present), the environment overlay
    /// `config/{LOADOUT_ENV}.toml` (if present) and environment variables
    /// prefixed with `LOADOUT__`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let env = std::env::var("LOADOUT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LOADOUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

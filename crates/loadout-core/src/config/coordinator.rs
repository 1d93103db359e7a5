//! Optimistic mutation coordinator configuration.

use serde::{Deserialize, Serialize};

/// Coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Capacity of the notice broadcast channel.
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            notice_capacity: default_notice_capacity(),
        }
    }
}

fn default_notice_capacity() -> usize {
    64
}

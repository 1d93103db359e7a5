//! Client-local persistent key spaces.

pub mod file;
pub mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use loadout_core::error::AppError;

/// Reject a write that would push the store past its quota.
///
/// `quota` of `0` means unlimited.
pub(crate) fn check_quota(
    key: &str,
    used_by_others: u64,
    incoming: u64,
    quota: u64,
) -> Result<(), AppError> {
    if quota == 0 {
        return Ok(());
    }
    let needed = used_by_others + incoming;
    if needed > quota {
        return Err(AppError::storage_full(format!(
            "writing '{key}' needs {needed} bytes but the quota is {quota} bytes"
        )));
    }
    Ok(())
}

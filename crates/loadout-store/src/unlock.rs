//! Fuzzy-match unlock gate.
//!
//! A guess unlocks a reference when it matches case-insensitively, or when
//! its edit distance to the reference is at most
//! `max(2, reference_len / 6)`. Unlocked references are remembered in the
//! local key space.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;

/// Smallest number of edits always tolerated.
const MIN_TOLERANCE: usize = 2;

/// Unit-cost insert/delete/substitute distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Number of edits a guess for `reference` may contain.
pub fn tolerance(reference: &str) -> usize {
    MIN_TOLERANCE.max(reference.chars().count() / 6)
}

/// Whether `guess` is close enough to `reference`.
pub fn guess_matches(guess: &str, reference: &str) -> bool {
    let guess = guess.trim().to_lowercase();
    let reference = reference.trim().to_lowercase();
    if reference.is_empty() {
        return false;
    }
    guess == reference || edit_distance(&guess, &reference) <= tolerance(&reference)
}

/// Remembers which references have been unlocked.
#[derive(Debug, Clone)]
pub struct UnlockGate {
    /// Backing key space.
    store: Arc<dyn KeyValueStore>,
    /// Key of the persisted unlock set.
    key: String,
}

impl UnlockGate {
    /// Create a gate persisting under `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Check a guess and record the reference when it matches.
    pub async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool> {
        if !guess_matches(guess, reference) {
            debug!(reference, "Unlock guess rejected");
            return Ok(false);
        }
        let mut unlocked = self.load().await?;
        if unlocked.insert(normalize(reference)) {
            let raw = serde_json::to_string(&unlocked)?;
            self.store.set(&self.key, &raw).await?;
            info!(reference, "Unlocked");
        }
        Ok(true)
    }

    /// Whether `reference` was unlocked before.
    pub async fn is_unlocked(&self, reference: &str) -> AppResult<bool> {
        Ok(self.load().await?.contains(&normalize(reference)))
    }

    async fn load(&self) -> AppResult<BTreeSet<String>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(BTreeSet::new());
        };
        // an unreadable set counts as nothing unlocked yet
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }
}

fn normalize(reference: &str) -> String {
    reference.trim().to_lowercase()
}

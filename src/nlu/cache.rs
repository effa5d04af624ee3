//! Memo cache for extracted features, keyed by the raw utterance.
//!
//! Chat traffic repeats itself (button presses, short confirmations), so the
//! pipeline memoizes whole [`TurnFeatures`] per exact input string. Entries
//! are shared behind `Arc`, making repeated lookups allocation-free.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::token::TurnFeatures;

/// Thread-safe text-to-features memo. Cloning shares the underlying store.
#[derive(Clone, Debug, Default)]
pub struct FeatureCache {
    entries: Arc<RwLock<HashMap<String, Arc<TurnFeatures>>>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up features for an exact utterance.
    pub fn read(&self, text: &str) -> Option<Arc<TurnFeatures>> {
        self.entries.read().get(text).cloned()
    }

    /// Store features for an utterance, replacing any previous entry.
    pub fn add(&self, text: &str, features: Arc<TurnFeatures>) {
        self.entries.write().insert(text.to_string(), features);
    }

    /// Number of memoized utterances.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry, e.g. after the slot vocabulary is reloaded.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

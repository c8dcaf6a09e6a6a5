//! Session-lifetime cache of resolved photo references

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::provider::{PhotoReference, PlaceId};

/// Memoizes references per place for the life of the process.
///
/// Entries are immutable: the first non-empty `put` for a key wins and later
/// puts are ignored. There is no eviction.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: RwLock<HashMap<PlaceId, Arc<[PhotoReference]>>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached references for `place_id`, if any. Never fetches.
    pub fn get(&self, place_id: &PlaceId) -> Option<Vec<PhotoReference>> {
        self.entries
            .read()
            .get(place_id)
            .map(|references| references.to_vec())
    }

    /// Store `references` unless an entry already exists or the list is
    /// empty. Returns whether the entry was written.
    pub fn put(&self, place_id: &PlaceId, references: &[PhotoReference]) -> bool {
        if references.is_empty() {
            return false;
        }

        let mut entries = self.entries.write();
        if entries.contains_key(place_id) {
            debug!(place_id = %place_id, "Cache entry already present, keeping first write");
            return false;
        }
        entries.insert(place_id.clone(), Arc::from(references));
        debug!(
            place_id = %place_id,
            count = references.len(),
            entries = entries.len(),
            "Cached photo references"
        );
        true
    }

    pub fn contains(&self, place_id: &PlaceId) -> bool {
        self.entries.read().contains_key(place_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

//! Type index: the dependency graph used for invalidation.
//!
//! Tracks type tag → request identities and request identity → type tags.
//! The reverse map lets an evicted identity be removed from every bucket it
//! sits in, not just the one that triggered the eviction.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{OperationKey, TypeTag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Maps {
    tag_to_keys: HashMap<TypeTag, HashSet<OperationKey>>,
    key_to_tags: HashMap<OperationKey, BTreeSet<TypeTag>>,
}

impl Maps {
    fn unregister(&mut self, key: OperationKey) -> Option<BTreeSet<TypeTag>> {
        let tags = self.key_to_tags.remove(&key)?;
        for tag in &tags {
            if let Some(keys) = self.tag_to_keys.get_mut(tag) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(tag);
                }
            }
        }
        Some(tags)
    }
}

/// Bidirectional mapping between type tags and cached request identities.
///
/// Both directions live behind one lock so they can never disagree.
#[derive(Default)]
pub struct TypeIndex {
    maps: RwLock<Maps>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the cached result for `key` depends on `tags`.
    ///
    /// Any earlier registration of `key` is dropped first, so the key ends up
    /// under exactly the given tags.
    pub fn register(&self, key: OperationKey, tags: BTreeSet<TypeTag>) {
        let mut maps = rw_write(&self.maps, SOURCE, "register");
        maps.unregister(key);

        if tags.is_empty() {
            return;
        }
        for tag in &tags {
            maps.tag_to_keys.entry(tag.clone()).or_default().insert(key);
        }
        maps.key_to_tags.insert(key, tags);
    }

    /// Union of the identities filed under any of `tags`, deduplicated.
    pub fn keys_for_tags<'a, I>(&self, tags: I) -> BTreeSet<OperationKey>
    where
        I: IntoIterator<Item = &'a TypeTag>,
    {
        let maps = rw_read(&self.maps, SOURCE, "keys_for_tags");
        tags.into_iter()
            .filter_map(|tag| maps.tag_to_keys.get(tag))
            .flat_map(|keys| keys.iter().copied())
            .collect()
    }

    /// Get all tags an identity was registered under.
    pub fn tags_for_key(&self, key: OperationKey) -> BTreeSet<TypeTag> {
        rw_read(&self.maps, SOURCE, "tags_for_key")
            .key_to_tags
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: OperationKey) -> bool {
        rw_read(&self.maps, SOURCE, "contains_key")
            .key_to_tags
            .contains_key(&key)
    }

    /// Remove `key` from every tag bucket, dropping buckets left empty.
    ///
    /// Returns the tags the key was registered under.
    pub fn unregister(&self, key: OperationKey) -> BTreeSet<TypeTag> {
        rw_write(&self.maps, SOURCE, "unregister")
            .unregister(key)
            .unwrap_or_default()
    }

    /// Clear all mappings.
    pub fn clear(&self) {
        let mut maps = rw_write(&self.maps, SOURCE, "clear");
        maps.tag_to_keys.clear();
        maps.key_to_tags.clear();
    }

    /// Get the number of tags with at least one dependent identity.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.maps, SOURCE, "tag_count").tag_to_keys.len()
    }

    /// Get the number of identities with at least one tag.
    pub fn key_count(&self) -> usize {
        rw_read(&self.maps, SOURCE, "key_count").key_to_tags.len()
    }
}

//! Result cache storage.
//!
//! Maps a request identity to the most recent successful query result.
//! There is no capacity bound; entries leave only through invalidation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{OperationKey, OperationResult};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// In-memory result cache for one client session.
#[derive(Default)]
pub struct ResultCache {
    results: RwLock<HashMap<OperationKey, OperationResult>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: OperationKey) -> Option<OperationResult> {
        rw_read(&self.results, SOURCE, "get").get(&key).cloned()
    }

    pub fn contains(&self, key: OperationKey) -> bool {
        rw_read(&self.results, SOURCE, "contains").contains_key(&key)
    }

    /// Store `result` under `key`, returning the entry it replaced.
    pub fn insert(&self, key: OperationKey, result: OperationResult) -> Option<OperationResult> {
        rw_write(&self.results, SOURCE, "insert").insert(key, result)
    }

    pub fn remove(&self, key: OperationKey) -> Option<OperationResult> {
        rw_write(&self.results, SOURCE, "remove").remove(&key)
    }

    pub fn clear(&self) {
        rw_write(&self.results, SOURCE, "clear").clear();
    }

    /// Get the number of cached results.
    pub fn len(&self) -> usize {
        rw_read(&self.results, SOURCE, "len").len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;

    use super::*;
    use crate::domain::Operation;

    fn todos_result() -> OperationResult {
        let operation = Operation::query("{ todos { id } }", None);
        OperationResult::with_data(operation, json!({"todos": [{"id": 1, "__typename": "Todo"}]}))
    }

    #[test]
    fn insert_get_remove() {
        let cache = ResultCache::new();
        let result = todos_result();
        let key = result.operation.key;

        assert!(cache.get(key).is_none());
        assert!(cache.insert(key, result.clone()).is_none());

        assert!(cache.contains(key));
        assert_eq!(cache.get(key).expect("cached result"), result);

        assert_eq!(cache.remove(key), Some(result));
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_replaces_previous_entry() {
        let cache = ResultCache::new();
        let first = todos_result();
        let key = first.operation.key;
        let second = OperationResult::with_data(first.operation.clone(), json!({"todos": []}));

        cache.insert(key, first.clone());
        let replaced = cache.insert(key, second.clone());

        assert_eq!(replaced, Some(first));
        assert_eq!(cache.get(key), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = ResultCache::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache
                .results
                .write()
                .expect("results lock should be acquired");
            panic!("poison results lock");
        }));

        let result = todos_result();
        cache.insert(result.operation.key, result);
        assert_eq!(cache.len(), 1);
    }
}

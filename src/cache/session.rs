//! Per-session cache state.
//!
//! A [`CacheSession`] owns the result cache and the type index of one client
//! session. It is the only writer of either map and keeps them consistent:
//! an identity is indexed under a tag if and only if its result is cached.

use std::collections::BTreeSet;

use metrics::{counter, gauge};
use tracing::debug;

use crate::domain::{OperationKind, OperationResult};

use super::keys::{OperationKey, TypeTag};
use super::registry::TypeIndex;
use super::store::ResultCache;

pub(crate) const METRIC_STORE_TOTAL: &str = "gqlcache_store_total";
pub(crate) const METRIC_ENTRIES: &str = "gqlcache_entries";

#[derive(Default)]
pub struct CacheSession {
    results: ResultCache,
    index: TypeIndex,
}

impl CacheSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: OperationKey) -> Option<OperationResult> {
        self.results.get(key)
    }

    /// Cache a query result and index it under `tags`.
    ///
    /// Only successful query results with data are stored; anything else is
    /// ignored and `false` is returned. A previous entry for the same key is
    /// removed from both maps before the new one is written.
    pub fn store_query_result(&self, result: OperationResult, tags: BTreeSet<TypeTag>) -> bool {
        if result.operation.kind != OperationKind::Query || !result.is_success() {
            return false;
        }

        let key = result.operation.key;
        self.index.unregister(key);
        self.results.insert(key, result);
        debug!(key = %key, tags = ?tags, "stored query result");
        self.index.register(key, tags);

        counter!(METRIC_STORE_TOTAL).increment(1);
        gauge!(METRIC_ENTRIES).set(self.results.len() as f64);
        true
    }

    /// Remove `key` from the result cache and from every tag bucket.
    pub fn evict(&self, key: OperationKey) -> Option<OperationResult> {
        self.index.unregister(key);
        let evicted = self.results.remove(key);
        gauge!(METRIC_ENTRIES).set(self.results.len() as f64);
        evicted
    }

    /// Drop every cached result and index entry.
    pub fn clear(&self) {
        self.index.clear();
        self.results.clear();
        gauge!(METRIC_ENTRIES).set(0.0);
    }

    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    pub fn index(&self) -> &TypeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{CombinedError, Operation};

    fn tags(names: &[&str]) -> BTreeSet<TypeTag> {
        names.iter().copied().map(TypeTag::from).collect()
    }

    fn query_result() -> OperationResult {
        OperationResult::with_data(
            Operation::query("{ todos { id } }", None),
            json!({"todos": [{"id": 1, "__typename": "Todo"}]}),
        )
    }

    #[test]
    fn stores_and_indexes_query_results() {
        let session = CacheSession::new();
        let result = query_result();
        let key = result.operation.key;

        assert!(session.store_query_result(result.clone(), tags(&["Todo"])));

        assert_eq!(session.lookup(key), Some(result));
        assert_eq!(
            session.index().keys_for_tags(&tags(&["Todo"])),
            BTreeSet::from([key])
        );
    }

    #[test]
    fn rejects_mutations_and_failures() {
        let session = CacheSession::new();

        let mutation = OperationResult::with_data(
            Operation::mutation("mutation { addTodo { id } }", None),
            json!({"addTodo": {"id": 2, "__typename": "Todo"}}),
        );
        let failed = OperationResult::with_error(
            Operation::query("{ todos { id } }", None),
            CombinedError::network("offline"),
        );
        let empty = OperationResult::empty(Operation::query("{ todos { id } }", None));

        assert!(!session.store_query_result(mutation, tags(&["Todo"])));
        assert!(!session.store_query_result(failed, tags(&["Todo"])));
        assert!(!session.store_query_result(empty, BTreeSet::new()));
        assert!(session.is_empty());
        assert_eq!(session.index().key_count(), 0);
    }

    #[test]
    fn restore_replaces_index_entries() {
        let session = CacheSession::new();
        let result = query_result();
        let key = result.operation.key;

        session.store_query_result(result.clone(), tags(&["Todo", "User"]));
        session.store_query_result(result, tags(&["Todo"]));

        assert_eq!(session.len(), 1);
        assert!(session.index().keys_for_tags(&tags(&["User"])).is_empty());
        assert_eq!(session.index().tags_for_key(key), tags(&["Todo"]));
    }

    #[test]
    fn evict_clears_both_maps() {
        let session = CacheSession::new();
        let result = query_result();
        let key = result.operation.key;
        session.store_query_result(result, tags(&["Todo", "User"]));

        assert!(session.evict(key).is_some());

        assert!(session.lookup(key).is_none());
        assert_eq!(session.index().key_count(), 0);
        assert_eq!(session.index().tag_count(), 0);
        assert!(session.evict(key).is_none());
    }
}

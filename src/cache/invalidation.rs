//! Post-mutation invalidation.
//!
//! Invalidation is coarse: a mutation result carrying an entity of type `T`
//! makes every cached query indexed under `T` stale, whichever entity it
//! held. Stale entries are evicted and the client re-executes them once.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use crate::domain::{Operation, OperationKind, OperationMeta, OperationResult, RequestPolicy};
use crate::pipeline::Client;

use super::config::CacheConfig;
use super::keys::{OperationKey, TypeTag};
use super::registry::TypeIndex;
use super::session::CacheSession;
use super::typenames::collect_typenames_with;

pub(crate) const METRIC_INVALIDATED_TOTAL: &str = "gqlcache_invalidated_total";
pub(crate) const METRIC_REEXECUTE_TOTAL: &str = "gqlcache_reexecute_total";
pub(crate) const METRIC_INVALIDATE_MS: &str = "gqlcache_invalidate_ms";

/// What a mutation result invalidates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Types found in the mutation payload.
    pub affected_tags: BTreeSet<TypeTag>,
    /// Cached identities indexed under any affected type, deduplicated.
    pub affected_keys: BTreeSet<OperationKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.affected_tags.iter().map(TypeTag::as_str).collect();
        write!(
            f,
            "InvalidationPlan {{ tags: [{}], keys: {} }}",
            tags.join(", "),
            self.affected_keys.len()
        )
    }
}

impl InvalidationPlan {
    /// Plan the invalidation caused by `result`.
    ///
    /// Empty unless `result` is a successful mutation with a data payload.
    pub fn for_mutation(result: &OperationResult, index: &TypeIndex, typename_field: &str) -> Self {
        if result.operation.kind != OperationKind::Mutation || !result.is_success() {
            return Self::default();
        }
        let Some(data) = result.data.as_ref() else {
            return Self::default();
        };

        let affected_tags = collect_typenames_with(data, typename_field);
        let affected_keys = index.keys_for_tags(&affected_tags);

        Self {
            affected_tags,
            affected_keys,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.affected_keys.is_empty()
    }
}

/// Executes invalidation plans against a session.
pub struct Invalidator {
    config: CacheConfig,
    session: Arc<CacheSession>,
    client: Arc<dyn Client>,
}

impl Invalidator {
    pub fn new(config: CacheConfig, session: Arc<CacheSession>, client: Arc<dyn Client>) -> Self {
        Self {
            config,
            session,
            client,
        }
    }

    /// Invalidate everything `result` makes stale.
    ///
    /// Each affected entry is evicted from both maps before its original
    /// operation is handed to the client, exactly once per identity.
    /// Returns the number of re-executions requested.
    #[instrument(skip_all, fields(mutation = %result.operation.key))]
    pub fn after_mutation(&self, result: &OperationResult) -> usize {
        if !self.config.invalidate_on_mutation {
            return 0;
        }

        let started_at = Instant::now();
        let plan = InvalidationPlan::for_mutation(
            result,
            self.session.index(),
            &self.config.typename_field,
        );
        if plan.is_empty() {
            debug!(tags = plan.affected_tags.len(), "mutation affects no cached query");
            return 0;
        }

        let mut reexecuted = 0;
        for key in &plan.affected_keys {
            let Some(stale) = self.session.evict(*key) else {
                continue;
            };
            self.client
                .reexecute_operation(prepare_reexecution(&stale.operation, self.config.reexecute_policy));
            reexecuted += 1;
        }

        info!(
            plan = %plan,
            reexecuted,
            "Cache invalidated after mutation"
        );

        counter!(METRIC_INVALIDATED_TOTAL).increment(plan.affected_keys.len() as u64);
        counter!(METRIC_REEXECUTE_TOTAL).increment(reexecuted as u64);
        histogram!(METRIC_INVALIDATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        reexecuted
    }
}

/// Fresh copy of `operation` to send back through the pipeline.
///
/// The stale cache outcome is dropped so the next pass annotates it anew.
pub(crate) fn prepare_reexecution(operation: &Operation, policy: RequestPolicy) -> Operation {
    let mut operation = operation.with_request_policy(policy);
    operation.context.meta = OperationMeta::default();
    operation
}

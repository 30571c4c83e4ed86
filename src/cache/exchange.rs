//! The cache decision stage.
//!
//! Sits between the application client and the network layer. Queries are
//! answered from the result cache when their request policy allows it;
//! everything else is forwarded, and responses flowing back are cached or
//! trigger invalidation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_stream::stream;
use futures::channel::mpsc;
use futures::{StreamExt, select_biased};
use metrics::counter;
use tracing::debug;

use crate::domain::{CacheOutcome, Operation, OperationKind, OperationResult, RequestPolicy};
use crate::pipeline::{Client, Forward, OperationStream, ResultStream};

use super::config::CacheConfig;
use super::document::fragment_type_conditions;
use super::invalidation::{Invalidator, prepare_reexecution};
use super::keys::{OperationKey, TypeTag};
use super::session::CacheSession;
use super::typenames::collect_typenames_with;

pub(crate) const METRIC_HIT_TOTAL: &str = "gqlcache_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "gqlcache_miss_total";

/// What to do with one incoming operation.
#[derive(Debug)]
enum Decision {
    /// Answer locally. `refresh` is re-executed after the answer is emitted.
    Respond {
        result: OperationResult,
        refresh: Option<Operation>,
    },
    Forward(Operation),
}

enum Step {
    Operation(Option<Operation>),
    Result(Option<OperationResult>),
    Done,
}

/// Cache stage for one client session.
pub struct CacheExchange {
    config: CacheConfig,
    session: Arc<CacheSession>,
    forward: Arc<dyn Forward>,
    client: Arc<dyn Client>,
    invalidator: Invalidator,
    /// Forwarded queries awaiting a response, per key. Responses for keys
    /// not listed here are emitted but never cached.
    pending: HashMap<OperationKey, usize>,
}

impl CacheExchange {
    pub fn new(
        config: CacheConfig,
        session: Arc<CacheSession>,
        forward: Arc<dyn Forward>,
        client: Arc<dyn Client>,
    ) -> Self {
        let invalidator = Invalidator::new(config.clone(), session.clone(), client.clone());
        Self {
            config,
            session,
            forward,
            client,
            invalidator,
            pending: HashMap::new(),
        }
    }

    /// Connect the stage to `operations` and return the downstream results.
    ///
    /// The output ends once `operations` has ended and the forwarded stream
    /// has drained. Ready responses are handled before the next operation is
    /// decided, so a query issued right after an identical one that has
    /// already been answered is served from the cache.
    pub fn run(mut self, operations: OperationStream) -> ResultStream {
        let (tx, rx) = mpsc::unbounded::<Operation>();
        let forwarded = self.forward.forward(rx.boxed());

        Box::pin(stream! {
            let mut tx = Some(tx);
            let mut operations = operations.fuse();
            let mut forwarded = forwarded.fuse();

            loop {
                let step = select_biased! {
                    result = forwarded.next() => Step::Result(result),
                    operation = operations.next() => Step::Operation(operation),
                    complete => Step::Done,
                };

                match step {
                    Step::Operation(Some(operation)) => match self.decide(operation) {
                        Decision::Respond { result, refresh } => {
                            yield result;
                            if let Some(operation) = refresh {
                                self.client.reexecute_operation(operation);
                            }
                        }
                        Decision::Forward(operation) => {
                            if let Some(sender) = tx.as_ref()
                                && sender.unbounded_send(operation).is_err()
                            {
                                debug!("forward stage stopped accepting operations");
                            }
                        }
                    },
                    // Closing the sender lets the forward stage drain and end.
                    Step::Operation(None) => tx = None,
                    Step::Result(Some(result)) => {
                        self.observe(&result);
                        yield result;
                    }
                    Step::Result(None) | Step::Done => break,
                }
            }
        })
    }

    fn decide(&mut self, operation: Operation) -> Decision {
        if !self.config.enabled {
            return Decision::Forward(operation);
        }

        match operation.kind {
            OperationKind::Query => self.decide_query(operation),
            OperationKind::Teardown => {
                if self.pending.remove(&operation.key).is_some() {
                    debug!(key = %operation.key, "teardown cancels pending cache write");
                }
                Decision::Forward(operation)
            }
            OperationKind::Mutation | OperationKind::Subscription => Decision::Forward(operation),
        }
    }

    fn decide_query(&mut self, operation: Operation) -> Decision {
        let policy = operation.request_policy();
        let cached = match policy {
            RequestPolicy::NetworkOnly => None,
            _ => self.session.lookup(operation.key),
        };

        if let Some(cached) = cached {
            debug!(key = %operation.key, ?policy, outcome = "hit", "serving cached result");
            counter!(METRIC_HIT_TOTAL, "policy" => policy_label(policy)).increment(1);

            let refresh = (policy == RequestPolicy::CacheAndNetwork)
                .then(|| prepare_reexecution(&operation, RequestPolicy::NetworkOnly));
            let result = cached.rebind(operation.with_cache_outcome(CacheOutcome::Hit));
            return Decision::Respond { result, refresh };
        }

        counter!(METRIC_MISS_TOTAL, "policy" => policy_label(policy)).increment(1);
        let operation = operation.with_cache_outcome(CacheOutcome::Miss);

        if policy == RequestPolicy::CacheOnly {
            debug!(key = %operation.key, outcome = "miss", "cache-only query without entry");
            return Decision::Respond {
                result: OperationResult::empty(operation),
                refresh: None,
            };
        }

        debug!(key = %operation.key, ?policy, outcome = "miss", "forwarding query");
        *self.pending.entry(operation.key).or_default() += 1;
        Decision::Forward(operation)
    }

    fn observe(&mut self, result: &OperationResult) {
        if !self.config.enabled {
            return;
        }

        match result.operation.kind {
            OperationKind::Query if self.settle(result.operation.key) => {
                if result.is_success() {
                    let tags = self.dependency_tags(result);
                    self.session.store_query_result(result.clone(), tags);
                }
            }
            OperationKind::Mutation => {
                self.invalidator.after_mutation(result);
            }
            _ => {}
        }
    }

    /// Release one pending forward for `key`; false when none was pending.
    fn settle(&mut self, key: OperationKey) -> bool {
        let Some(count) = self.pending.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending.remove(&key);
        }
        true
    }

    /// Tags a cached query result is indexed under.
    fn dependency_tags(&self, result: &OperationResult) -> BTreeSet<TypeTag> {
        let mut tags = result
            .data
            .as_ref()
            .map(|data| collect_typenames_with(data, &self.config.typename_field))
            .unwrap_or_default();

        if self.config.index_type_conditions {
            tags.extend(fragment_type_conditions(&result.operation.query));
        }
        tags.extend(
            result
                .operation
                .context
                .additional_typenames
                .iter()
                .map(|name| TypeTag::new(name.as_str())),
        );
        tags
    }
}

fn policy_label(policy: RequestPolicy) -> &'static str {
    match policy {
        RequestPolicy::CacheFirst => "cache-first",
        RequestPolicy::CacheOnly => "cache-only",
        RequestPolicy::NetworkOnly => "network-only",
        RequestPolicy::CacheAndNetwork => "cache-and-network",
    }
}

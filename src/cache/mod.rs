//! Document cache for GraphQL operations.
//!
//! Successful query results are cached per request identity and indexed by
//! the `__typename`s they contain. A successful mutation evicts every cached
//! query sharing a type with its payload and asks the client to re-run it.
//!
//! - [`CacheExchange`]: the pipeline stage deciding hit, miss or forward
//! - [`CacheSession`]: result cache plus type index for one client session
//! - [`Invalidator`]: post-mutation eviction and re-execution
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! typename_field = "__typename"
//! index_type_conditions = true
//! invalidate_on_mutation = true
//! reexecute_policy = "network-only"
//! ```

mod config;
mod document;
mod exchange;
mod invalidation;
pub(crate) mod keys;
mod lock;
mod registry;
mod session;
mod store;
mod typenames;

pub use config::CacheConfig;
pub use document::fragment_type_conditions;
pub use exchange::CacheExchange;
pub use invalidation::{InvalidationPlan, Invalidator};
pub use keys::{OperationKey, TypeTag, hash_value};
pub use registry::TypeIndex;
pub use session::CacheSession;
pub use store::ResultCache;
pub use typenames::{DEFAULT_TYPENAME_FIELD, collect_typenames, collect_typenames_with};

pub(crate) mod metric_names {
    pub(crate) use super::exchange::{METRIC_HIT_TOTAL, METRIC_MISS_TOTAL};
    pub(crate) use super::invalidation::{
        METRIC_INVALIDATE_MS, METRIC_INVALIDATED_TOTAL, METRIC_REEXECUTE_TOTAL,
    };
    pub(crate) use super::session::{METRIC_ENTRIES, METRIC_STORE_TOTAL};
}

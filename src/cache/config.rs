//! Cache configuration.
//!
//! Loaded from the `[cache]` table of `gqlcache.toml` or `GQLCACHE__CACHE__*`
//! environment variables; see [`crate::config::load`].

use serde::Deserialize;

use crate::domain::RequestPolicy;

use super::typenames::DEFAULT_TYPENAME_FIELD;

/// Behaviour switches for the cache exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false, every operation is forwarded untouched.
    pub enabled: bool,
    /// Discriminator field that names an entity's type.
    pub typename_field: String,
    /// Also index the type conditions (`... on T`) of a query's document.
    pub index_type_conditions: bool,
    /// Run invalidation after successful mutations.
    pub invalidate_on_mutation: bool,
    /// Request policy given to re-executed queries.
    pub reexecute_policy: RequestPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            typename_field: DEFAULT_TYPENAME_FIELD.to_string(),
            index_type_conditions: true,
            invalidate_on_mutation: true,
            reexecute_policy: RequestPolicy::NetworkOnly,
        }
    }
}

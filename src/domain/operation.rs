//! Operations issued by the application layer.
//!
//! An [`Operation`] is immutable once issued. Stages that need to record
//! metadata derive a new operation through the `with_*` helpers instead of
//! mutating a context that other in-flight operations may share.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::keys::hash_value;

/// Request identity: a stable key derived from document and variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(u64);

impl OperationKey {
    /// Wrap a key computed by an upstream collaborator.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Derive a key from a document and its variables.
    ///
    /// Whitespace runs in the document are collapsed and variable objects are
    /// hashed with sorted keys, so formatting differences do not split the
    /// identity of otherwise identical requests.
    pub fn from_request(query: &str, variables: Option<&Value>) -> Self {
        let document = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let variables = variables
            .map(|value| canonical_json(value).to_string())
            .unwrap_or_default();
        Self(hash_value(&(document, variables)))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OperationKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Sort object keys recursively so equal values serialize identically.
fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical_json(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}

/// The kind of GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    /// Cancels an earlier operation carrying the same key.
    Teardown,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
            Self::Subscription => write!(f, "subscription"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// How a query may use the result cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Serve from cache when possible, otherwise fetch.
    #[default]
    CacheFirst,
    /// Never contact the network.
    CacheOnly,
    /// Always fetch; the response still refreshes the cache.
    NetworkOnly,
    /// Serve from cache and refresh through the network at the same time.
    CacheAndNetwork,
}

/// Whether an operation was answered from the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// Execution metadata written by pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_outcome: Option<CacheOutcome>,
}

/// Side-channel context carried by an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    #[serde(default)]
    pub request_policy: RequestPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Type tags the caller declares as dependencies beyond the payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_typenames: Vec<String>,
    #[serde(default)]
    pub meta: OperationMeta,
    /// Fields owned by other stages; never read or rewritten by the cache.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A GraphQL request flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub key: OperationKey,
    pub kind: OperationKind,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default)]
    pub context: OperationContext,
}

impl Operation {
    /// Build an operation whose key is derived from `query` and `variables`.
    pub fn new(kind: OperationKind, query: impl Into<String>, variables: Option<Value>) -> Self {
        let query = query.into();
        let key = OperationKey::from_request(&query, variables.as_ref());
        Self {
            key,
            kind,
            query,
            variables,
            context: OperationContext::default(),
        }
    }

    pub fn query(query: impl Into<String>, variables: Option<Value>) -> Self {
        Self::new(OperationKind::Query, query, variables)
    }

    pub fn mutation(query: impl Into<String>, variables: Option<Value>) -> Self {
        Self::new(OperationKind::Mutation, query, variables)
    }

    pub fn subscription(query: impl Into<String>, variables: Option<Value>) -> Self {
        Self::new(OperationKind::Subscription, query, variables)
    }

    /// A teardown for this operation, carrying the same key and context.
    pub fn teardown(&self) -> Self {
        Self {
            kind: OperationKind::Teardown,
            ..self.clone()
        }
    }

    /// Replace the key, e.g. with one assigned by the client.
    pub fn with_key(mut self, key: OperationKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_context(mut self, context: OperationContext) -> Self {
        self.context = context;
        self
    }

    /// Copy of this operation annotated with a cache outcome.
    ///
    /// Every other context field is preserved.
    pub fn with_cache_outcome(&self, outcome: CacheOutcome) -> Self {
        let mut operation = self.clone();
        operation.context.meta.cache_outcome = Some(outcome);
        operation
    }

    /// Copy of this operation with a different request policy.
    pub fn with_request_policy(&self, policy: RequestPolicy) -> Self {
        let mut operation = self.clone();
        operation.context.request_policy = policy;
        operation
    }

    pub fn cache_outcome(&self) -> Option<CacheOutcome> {
        self.context.meta.cache_outcome
    }

    pub fn request_policy(&self) -> RequestPolicy {
        self.context.request_policy
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CombinedError;
use super::operation::Operation;

/// The outcome of executing an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CombinedError>,
}

impl OperationResult {
    pub fn new(operation: Operation, data: Option<Value>, error: Option<CombinedError>) -> Self {
        Self {
            operation,
            data,
            error,
        }
    }

    pub fn with_data(operation: Operation, data: Value) -> Self {
        Self::new(operation, Some(data), None)
    }

    pub fn with_error(operation: Operation, error: CombinedError) -> Self {
        Self::new(operation, None, Some(error))
    }

    /// A result carrying neither data nor error.
    pub fn empty(operation: Operation) -> Self {
        Self::new(operation, None, None)
    }

    /// True when a data payload is present and not `null`.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_null())
    }

    /// Successful, data-bearing results are the only ones the cache acts on.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.has_data()
    }

    /// Same payload, answering a different (live) operation.
    pub fn rebind(&self, operation: Operation) -> Self {
        Self {
            operation,
            data: self.data.clone(),
            error: self.error.clone(),
        }
    }
}

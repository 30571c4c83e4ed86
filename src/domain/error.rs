use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error attached to an [`OperationResult`](super::OperationResult) by the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombinedError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("graphql error: {}", messages.join("; "))]
    Graphql { messages: Vec<String> },
}

impl CombinedError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn graphql<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Graphql {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

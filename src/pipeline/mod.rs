//! Interfaces to the collaborators around the cache stage.
//!
//! The network layer is reached through [`Forward`], and the application
//! client is asked to re-run stale queries through [`Client`].

use futures::stream::BoxStream;

use crate::domain::{Operation, OperationResult};

/// Operations flowing into a stage.
pub type OperationStream = BoxStream<'static, Operation>;

/// Results flowing out of a stage.
pub type ResultStream = BoxStream<'static, OperationResult>;

/// The next stage of the pipeline, usually the network layer.
///
/// Implementations return one result per input operation, carrying that
/// operation on the result, and end once the input has ended and all
/// responses were delivered.
pub trait Forward: Send + Sync {
    fn forward(&self, operations: OperationStream) -> ResultStream;
}

impl<F> Forward for F
where
    F: Fn(OperationStream) -> ResultStream + Send + Sync,
{
    fn forward(&self, operations: OperationStream) -> ResultStream {
        self(operations)
    }
}

/// The application client that owns re-issuing operations.
pub trait Client: Send + Sync {
    /// Schedule `operation` to flow through the pipeline again.
    fn reexecute_operation(&self, operation: Operation);
}

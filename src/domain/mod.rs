//! Request and response model shared by every pipeline stage.

pub mod error;
pub mod operation;
pub mod result;

pub use error::CombinedError;
pub use operation::{
    CacheOutcome, Operation, OperationContext, OperationKey, OperationKind, OperationMeta,
    RequestPolicy,
};
pub use result::OperationResult;

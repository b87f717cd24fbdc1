//! Parse errors for the identifier types in this crate.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown step id: {0}")]
    UnknownStep(String),

    #[error("invalid workflow id: {0}")]
    InvalidWorkflowId(String),

    #[error("invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    #[error("invalid document type id: {0:?}")]
    InvalidDocumentId(String),
}

use kyc_types::WorkflowId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workflow {0} is already archived")]
    AlreadyArchived(WorkflowId),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("could not encode workflow record: {0}")]
    Serialization(String),

    #[error("stored workflow record is corrupted: {0}")]
    Corruption(String),
}

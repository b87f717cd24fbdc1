use thiserror::Error;

use kyc_types::WorkflowId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow error: {0}")]
    Workflow(#[from] kyc_verification::WorkflowError),

    #[error("store error: {0}")]
    Store(#[from] kyc_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] kyc_store_lmdb::LmdbError),

    #[error("submission error: {0}")]
    Submission(#[from] kyc_submission::SubmissionError),

    #[error("config error: {0}")]
    Config(String),

    #[error("workflow {0} not found")]
    NotFound(WorkflowId),
}

use thiserror::Error;

use kyc_types::{DocumentTypeId, FieldError, IdempotencyKey, StepId};

use crate::submission::SubmissionFailure;

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<FieldError>),

    #[error("workflow is locked while a submission is in flight")]
    WorkflowLocked,

    #[error("workflow has been submitted and archived")]
    WorkflowArchived,

    #[error("step {step} is not active (current step is {current})")]
    StepNotActive { step: StepId, current: StepId },

    #[error("unknown document type: {0}")]
    UnknownDocument(String),

    #[error("duplicate document type in catalog: {0}")]
    DuplicateDocumentType(DocumentTypeId),

    #[error("document {0} is not selected")]
    DocumentNotSelected(DocumentTypeId),

    #[error("document {doc} rejected: {reason}")]
    DocumentRejected { doc: DocumentTypeId, reason: String },

    #[error("invalid collaborator signal: {0}")]
    InvalidSignal(String),

    #[error("not at the terminal step (current step is {current})")]
    NotAtTerminalStep { current: StepId },

    #[error("not ready to submit; unmet steps: {}", join(.unmet))]
    NotReady { unmet: Vec<StepId> },

    #[error("submission was permanently rejected; correct the workflow before resubmitting")]
    ResubmissionUnchanged,

    #[error("no submission is in flight")]
    NoSubmissionInFlight,

    #[error("an earlier submission ({0}) is still being processed")]
    EarlierSubmissionProcessing(IdempotencyKey),

    #[error("submission result for {got:?} does not match in-flight {expected:?}")]
    SubmissionMismatch {
        expected: IdempotencyKey,
        got: IdempotencyKey,
    },

    #[error("missing evidence: {0}")]
    MissingEvidence(String),

    #[error("submission failed: {0}")]
    Submission(SubmissionFailure),

    #[error("corrupted workflow snapshot: {0}")]
    Corrupted(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

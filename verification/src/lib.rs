//! KYC verification workflow.
//!
//! A fixed sequence of steps (personal info, documents, address, professional
//! credentials, biometrics, background check) gated by synchronous field
//! validation, ending in a single idempotent hand-off to a remote verification
//! service.
//!
//! All state changes go through the pure [`reducer::reduce`] function; the
//! [`WorkflowController`] owns a [`WorkflowState`] and commits transitions.
//! Capture, storage and external registry calls are collaborators: the
//! engine only records the signals they report.

pub mod catalog;
pub mod controller;
pub mod documents;
pub mod error;
pub mod evidence;
pub mod payload;
pub mod personal_info;
pub mod reducer;
pub mod snapshot;
pub mod state;
pub mod submission;
pub mod validators;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{DocumentType, DocumentTypeCatalog, StepCatalog, StepDefinition};
pub use controller::{Advance, WorkflowController};
pub use documents::{DocumentSelectionSet, DocumentUploadAck, Toggle};
pub use error::WorkflowError;
pub use evidence::{ExternalVerification, LivenessSignal};
pub use payload::StepPayload;
pub use personal_info::{Gender, PersonalInfoRecord};
pub use reducer::{reduce, replay, Action, Context, Outcome, Transition};
pub use snapshot::{decode, encode, WorkflowSnapshot, SNAPSHOT_VERSION};
pub use state::{StepRecord, SubmissionState, WorkflowState};
pub use submission::{
    Confirmation, DocumentReference, ExternalEvidence, FailureKind, SubmissionContent,
    SubmissionFailure, SubmissionPayload, SubmissionTicket, Submitter,
};
pub use validators::{validate, validate_step, ValidationContext, ValidationResult};

//! The submission boundary between the workflow and the remote verification service.
//!
//! The workflow builds a [`SubmissionTicket`] from its state and hands it to a
//! [`Submitter`]; the submitter reports back a [`Confirmation`] or a
//! classified [`SubmissionFailure`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use kyc_types::{DocumentTypeId, IdempotencyKey, PayloadFingerprint, StepId, Timestamp, WorkflowId};

use crate::error::WorkflowError;
use crate::personal_info::PersonalInfoRecord;
use crate::state::WorkflowState;

/// How a failed submission should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network timeout, 5xx and similar; safe to retry with the same key.
    Transient,
    /// The service rejected the submission; the user must correct it.
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// A classified submission failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl SubmissionFailure {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.reason)
    }
}

/// Receipt issued by the verification service for an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Confirmation {
    pub verification_id: String,
    pub idempotency_key: IdempotencyKey,
    pub received_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub doc_id: DocumentTypeId,
    pub storage_ref: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvidence {
    pub step_id: StepId,
    pub evidence_ref: String,
}

/// The verification content of a submission, independent of delivery metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionContent {
    pub personal_info: PersonalInfoRecord,
    /// References returned by the storage collaborator, never raw files.
    pub documents: Vec<DocumentReference>,
    pub biometric_evidence: String,
    pub external_evidence: Vec<ExternalEvidence>,
}

impl SubmissionContent {
    /// Assemble the content from a workflow whose steps are complete.
    pub fn from_state(state: &WorkflowState) -> Result<Self, WorkflowError> {
        let mut documents = Vec::with_capacity(state.document_selection().len());
        for doc_id in state.document_selection().iter() {
            let ack = state.document_uploads().get(doc_id).ok_or_else(|| {
                WorkflowError::MissingEvidence(format!("document {doc_id} has no upload reference"))
            })?;
            documents.push(DocumentReference {
                doc_id: doc_id.clone(),
                storage_ref: ack.storage_ref.clone(),
            });
        }

        let biometric_evidence = state
            .liveness()
            .map(|s| s.evidence_token.clone())
            .ok_or_else(|| WorkflowError::MissingEvidence("no liveness evidence".into()))?;

        let mut external_evidence = Vec::new();
        for step in StepId::ALL.into_iter().filter(StepId::is_externally_verified) {
            let result = state.external_check(step).ok_or_else(|| {
                WorkflowError::MissingEvidence(format!("no {step} evidence"))
            })?;
            external_evidence.push(ExternalEvidence {
                step_id: step,
                evidence_ref: result.evidence_ref.clone(),
            });
        }

        Ok(Self {
            personal_info: state.personal_info().clone(),
            documents,
            biometric_evidence,
            external_evidence,
        })
    }

    pub fn fingerprint(&self) -> Result<PayloadFingerprint, WorkflowError> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| WorkflowError::Serialization(e.to_string()))?;
        Ok(PayloadFingerprint::of(&bytes))
    }
}

/// The body sent to the verification service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub workflow_id: WorkflowId,
    pub idempotency_key: IdempotencyKey,
    pub attempt: u32,
    #[serde(flatten)]
    pub content: SubmissionContent,
}

/// A submission in flight: what was sent and which draft it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub payload: SubmissionPayload,
    pub fingerprint: PayloadFingerprint,
}

impl SubmissionTicket {
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.payload.idempotency_key
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.payload.workflow_id
    }
}

/// Delivers a submission and classifies the result.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, ticket: &SubmissionTicket) -> Result<Confirmation, SubmissionFailure>;
}

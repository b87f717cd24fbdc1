//! The workflow aggregate.
//!
//! `WorkflowState` is read-only to the outside world: every field is private
//! and changes only through the reducer (and thus through the controller).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use kyc_types::{
    DocumentTypeId, FieldError, IdempotencyKey, PayloadFingerprint, StepId, StepStatus,
    Timestamp, WorkflowId,
};

use crate::catalog::StepCatalog;
use crate::documents::{DocumentSelectionSet, DocumentUploadAck};
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::payload::StepPayload;
use crate::personal_info::PersonalInfoRecord;
use crate::submission::{Confirmation, FailureKind};

/// Status of one step plus the errors of its latest failed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepRecord {
    pub(crate) id: StepId,
    pub(crate) status: StepStatus,
    pub(crate) errors: Vec<FieldError>,
}

impl StepRecord {
    pub(crate) fn pending(id: StepId) -> Self {
        Self {
            id,
            status: StepStatus::Pending,
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Non-empty only while the step is `Failed`.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

/// Where the workflow's submission stands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "state",
    rename_all = "snake_case",
    rename_all_fields = "camelCase",
    deny_unknown_fields
)]
pub enum SubmissionState {
    #[default]
    NotStarted,
    /// A submission is in flight; the workflow is locked.
    Pending {
        idempotency_key: IdempotencyKey,
        attempt: u32,
        fingerprint: PayloadFingerprint,
    },
    /// Accepted by the verification service; the workflow is archived.
    Succeeded { confirmation: Confirmation },
    /// The last submission failed; the user may retry.
    Failed {
        kind: FailureKind,
        reason: String,
        idempotency_key: IdempotencyKey,
        attempt: u32,
        fingerprint: PayloadFingerprint,
    },
}

impl SubmissionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// The key of the in-flight or most recent submission.
    pub fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        match self {
            Self::NotStarted => None,
            Self::Pending {
                idempotency_key, ..
            }
            | Self::Failed {
                idempotency_key, ..
            } => Some(idempotency_key),
            Self::Succeeded { confirmation } => Some(&confirmation.idempotency_key),
        }
    }
}

/// The aggregate root of one verification workflow.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowState {
    pub(crate) workflow_id: WorkflowId,
    pub(crate) current_step_index: usize,
    pub(crate) steps: Vec<StepRecord>,
    pub(crate) personal_info: PersonalInfoRecord,
    pub(crate) document_selection: DocumentSelectionSet,
    pub(crate) document_uploads: BTreeMap<DocumentTypeId, DocumentUploadAck>,
    pub(crate) liveness: Option<LivenessSignal>,
    pub(crate) external_checks: BTreeMap<StepId, ExternalVerification>,
    pub(crate) submission: SubmissionState,
    pub(crate) attempt_counter: u32,
    pub(crate) started_at: Timestamp,
    pub(crate) updated_at: Timestamp,
}

impl WorkflowState {
    /// A fresh workflow: every step `Pending`, positioned on the first step.
    pub fn new(workflow_id: WorkflowId, now: Timestamp) -> Self {
        Self {
            workflow_id,
            current_step_index: 0,
            steps: StepCatalog::STANDARD
                .iter()
                .map(|def| StepRecord::pending(def.id))
                .collect(),
            personal_info: PersonalInfoRecord::default(),
            document_selection: DocumentSelectionSet::new(),
            document_uploads: BTreeMap::new(),
            liveness: None,
            external_checks: BTreeMap::new(),
            submission: SubmissionState::NotStarted,
            attempt_counter: 0,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// The step at the current index.
    pub fn current_step(&self) -> StepId {
        self.steps[self.current_step_index].id
    }

    pub fn is_at_terminal_step(&self) -> bool {
        self.current_step_index == StepCatalog::STANDARD.last_index()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step(&self, id: StepId) -> &StepRecord {
        let index = StepCatalog::STANDARD
            .index_of(id)
            .unwrap_or_else(|| unreachable!("{id} is in the standard catalog"));
        &self.steps[index]
    }

    pub fn status(&self, id: StepId) -> StepStatus {
        self.step(id).status
    }

    pub fn personal_info(&self) -> &PersonalInfoRecord {
        &self.personal_info
    }

    pub fn document_selection(&self) -> &DocumentSelectionSet {
        &self.document_selection
    }

    pub fn document_uploads(&self) -> &BTreeMap<DocumentTypeId, DocumentUploadAck> {
        &self.document_uploads
    }

    pub fn liveness(&self) -> Option<&LivenessSignal> {
        self.liveness.as_ref()
    }

    pub fn external_check(&self, step: StepId) -> Option<&ExternalVerification> {
        self.external_checks.get(&step)
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn attempt_counter(&self) -> u32 {
        self.attempt_counter
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// A submission is in flight; all mutations are refused.
    pub fn is_locked(&self) -> bool {
        self.submission.is_pending()
    }

    /// The submission succeeded; the workflow is immutable.
    pub fn is_archived(&self) -> bool {
        self.submission.is_succeeded()
    }

    /// Required steps that are not `Completed`, in catalog order.
    pub fn unmet_required_steps(&self) -> Vec<StepId> {
        StepCatalog::STANDARD
            .iter()
            .zip(&self.steps)
            .filter(|(def, record)| def.required && record.status != StepStatus::Completed)
            .map(|(def, _)| def.id)
            .collect()
    }

    /// The slice of state the given step is validated against.
    pub fn payload(&self, step: StepId) -> StepPayload<'_> {
        match step {
            StepId::PersonalInfo => StepPayload::PersonalInfo(&self.personal_info),
            StepId::DocumentUpload => StepPayload::DocumentUpload(&self.document_selection),
            StepId::AddressVerification => {
                StepPayload::AddressVerification(self.external_checks.get(&step))
            }
            StepId::ProfessionalCredentials => {
                StepPayload::ProfessionalCredentials(self.external_checks.get(&step))
            }
            StepId::BiometricVerification => {
                StepPayload::BiometricVerification(self.liveness.as_ref())
            }
            StepId::BackgroundCheck => StepPayload::BackgroundCheck(self.external_checks.get(&step)),
        }
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> &mut StepRecord {
        &mut self.steps[index]
    }
}

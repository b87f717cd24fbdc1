//! Persisted form of a workflow.
//!
//! A snapshot is plain JSON (camelCase, unknown fields rejected). Loading is
//! fail-closed: anything that could not have been produced by the reducer is
//! reported as [`WorkflowError::Corrupted`] and the workflow is not hydrated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use kyc_types::{DocumentTypeId, IdempotencyKey, StepId, StepStatus, Timestamp, WorkflowId};

use crate::catalog::StepCatalog;
use crate::documents::DocumentUploadAck;
use crate::error::WorkflowError;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::personal_info::PersonalInfoRecord;
use crate::state::{StepRecord, SubmissionState, WorkflowState};
use crate::submission::SubmissionContent;
use crate::validators::ValidationContext;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowSnapshot {
    pub version: u32,
    pub workflow_id: WorkflowId,
    pub current_step_index: usize,
    pub steps: Vec<StepRecord>,
    pub personal_info: PersonalInfoRecord,
    pub document_selection: Vec<DocumentTypeId>,
    pub document_uploads: Vec<DocumentUploadAck>,
    pub liveness: Option<LivenessSignal>,
    pub external_checks: Vec<ExternalVerification>,
    pub submission_state: SubmissionState,
    pub attempt_counter: u32,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
}

fn corrupted(msg: impl Into<String>) -> WorkflowError {
    WorkflowError::Corrupted(msg.into())
}

impl WorkflowSnapshot {
    pub fn capture(state: &WorkflowState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            workflow_id: state.workflow_id,
            current_step_index: state.current_step_index,
            steps: state.steps.clone(),
            personal_info: state.personal_info.clone(),
            document_selection: state.document_selection.iter().cloned().collect(),
            document_uploads: state.document_uploads.values().cloned().collect(),
            liveness: state.liveness.clone(),
            external_checks: state.external_checks.values().cloned().collect(),
            submission_state: state.submission.clone(),
            attempt_counter: state.attempt_counter,
            started_at: state.started_at,
            updated_at: state.updated_at,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkflowError> {
        serde_json::to_vec(self).map_err(|e| WorkflowError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkflowError> {
        serde_json::from_slice(bytes).map_err(|e| corrupted(e.to_string()))
    }

    /// Rebuild the workflow, refusing any snapshot that breaks an invariant.
    ///
    /// A completed step must still carry the input it was completed with. The
    /// tunable rules (ID length, liveness threshold) are not re-run: they held
    /// when the step completed, and a later config change does not undo that.
    pub fn restore(self, ctx: &ValidationContext<'_>) -> Result<WorkflowState, WorkflowError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(corrupted(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        self.check_steps()?;
        self.check_documents(ctx)?;
        self.check_evidence()?;
        if self.updated_at < self.started_at {
            return Err(corrupted("updatedAt precedes startedAt"));
        }

        let state = WorkflowState {
            workflow_id: self.workflow_id,
            current_step_index: self.current_step_index,
            steps: self.steps,
            personal_info: self.personal_info,
            document_selection: self.document_selection.into_iter().collect(),
            document_uploads: self
                .document_uploads
                .into_iter()
                .map(|ack| (ack.doc_id.clone(), ack))
                .collect(),
            liveness: self.liveness,
            external_checks: self
                .external_checks
                .into_iter()
                .map(|check| (check.step_id, check))
                .collect::<BTreeMap<_, _>>(),
            submission: self.submission_state,
            attempt_counter: self.attempt_counter,
            started_at: self.started_at,
            updated_at: self.updated_at,
        };

        for record in &state.steps {
            if record.status == StepStatus::Completed && !has_completed_input(&state, record.id, ctx) {
                return Err(corrupted(format!(
                    "completed step {} lacks its input",
                    record.id
                )));
            }
        }
        check_submission(&state)?;
        Ok(state)
    }

    fn check_steps(&self) -> Result<(), WorkflowError> {
        let catalog = &StepCatalog::STANDARD;
        if self.steps.len() != catalog.len() {
            return Err(corrupted(format!(
                "expected {} steps, found {}",
                catalog.len(),
                self.steps.len()
            )));
        }
        for (def, record) in catalog.iter().zip(&self.steps) {
            if def.id != record.id {
                return Err(corrupted(format!(
                    "step order mismatch: expected {}, found {}",
                    def.id, record.id
                )));
            }
            let failed = record.status == StepStatus::Failed;
            if failed == record.errors.is_empty() {
                return Err(corrupted(format!(
                    "step {} has status {:?} with {} errors",
                    record.id,
                    record.status,
                    record.errors.len()
                )));
            }
        }
        if self.current_step_index >= self.steps.len() {
            return Err(corrupted(format!(
                "current step index {} out of range",
                self.current_step_index
            )));
        }
        if let Some(record) = self.steps[..self.current_step_index]
            .iter()
            .find(|r| r.status != StepStatus::Completed)
        {
            return Err(corrupted(format!(
                "step {} precedes the current step but is not completed",
                record.id
            )));
        }
        Ok(())
    }

    fn check_documents(&self, ctx: &ValidationContext<'_>) -> Result<(), WorkflowError> {
        if let Some(id) = self
            .document_selection
            .iter()
            .find(|id| !ctx.documents.contains(id))
        {
            return Err(corrupted(format!("unknown document {id} selected")));
        }
        if self.document_selection.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(corrupted("document selection not strictly ordered"));
        }
        let mut previous = None;
        for ack in &self.document_uploads {
            if previous.is_some_and(|p| p >= &ack.doc_id) {
                return Err(corrupted("document uploads not strictly ordered"));
            }
            previous = Some(&ack.doc_id);
            if !self.document_selection.contains(&ack.doc_id) {
                return Err(corrupted(format!("upload for unselected document {}", ack.doc_id)));
            }
            ack.check_against(ctx.documents)
                .map_err(|e| corrupted(e.to_string()))?;
        }
        Ok(())
    }

    fn check_evidence(&self) -> Result<(), WorkflowError> {
        if let Some(signal) = &self.liveness {
            signal.check_well_formed().map_err(|e| corrupted(e.to_string()))?;
        }
        let mut previous = None;
        for check in &self.external_checks {
            if previous.is_some_and(|p| p >= check.step_id) {
                return Err(corrupted("external checks not strictly ordered"));
            }
            previous = Some(check.step_id);
            check.check_well_formed().map_err(|e| corrupted(e.to_string()))?;
        }
        Ok(())
    }
}

fn has_completed_input(state: &WorkflowState, step: StepId, ctx: &ValidationContext<'_>) -> bool {
    match step {
        StepId::PersonalInfo => {
            let info = &state.personal_info;
            [
                &info.full_name,
                &info.national_id,
                &info.date_of_birth,
                &info.nationality,
                &info.gender,
            ]
            .iter()
            .all(|field| !field.trim().is_empty())
        }
        StepId::DocumentUpload => state.document_selection.is_complete(ctx.documents),
        StepId::BiometricVerification => state.liveness.as_ref().is_some_and(|s| s.success),
        external => state
            .external_checks
            .get(&external)
            .is_some_and(|check| check.success),
    }
}

fn check_submission(state: &WorkflowState) -> Result<(), WorkflowError> {
    let key_for = |attempt: u32| IdempotencyKey::derive(&state.workflow_id, attempt);
    let ready = state.unmet_required_steps().is_empty() && state.is_at_terminal_step();

    match &state.submission {
        SubmissionState::NotStarted => {
            if state.attempt_counter != 0 {
                return Err(corrupted("attempt counter set without a submission"));
            }
        }
        SubmissionState::Pending {
            idempotency_key,
            attempt,
            fingerprint,
        } => {
            if !ready {
                return Err(corrupted("submission in flight for an incomplete workflow"));
            }
            if *attempt == 0 || *attempt != state.attempt_counter {
                return Err(corrupted("in-flight attempt does not match the counter"));
            }
            if *idempotency_key != key_for(*attempt) {
                return Err(corrupted("in-flight idempotency key is inconsistent"));
            }
            let content = SubmissionContent::from_state(state).map_err(|e| corrupted(e.to_string()))?;
            if content.fingerprint()? != *fingerprint {
                return Err(corrupted("workflow changed while a submission was in flight"));
            }
        }
        SubmissionState::Succeeded { confirmation } => {
            if !ready {
                return Err(corrupted("succeeded submission for an incomplete workflow"));
            }
            if state.attempt_counter == 0 || confirmation.idempotency_key != key_for(state.attempt_counter) {
                return Err(corrupted("confirmation key is inconsistent"));
            }
        }
        SubmissionState::Failed {
            idempotency_key,
            attempt,
            ..
        } => {
            if *attempt == 0 || *attempt > state.attempt_counter {
                return Err(corrupted("failed attempt out of range"));
            }
            if *idempotency_key != key_for(*attempt) {
                return Err(corrupted("failed submission key is inconsistent"));
            }
        }
    }
    Ok(())
}

/// Serialize a workflow for storage.
pub fn encode(state: &WorkflowState) -> Result<Vec<u8>, WorkflowError> {
    WorkflowSnapshot::capture(state).to_bytes()
}

/// Parse and validate a stored workflow.
pub fn decode(bytes: &[u8], ctx: &ValidationContext<'_>) -> Result<WorkflowState, WorkflowError> {
    WorkflowSnapshot::from_bytes(bytes)?.restore(ctx)
}

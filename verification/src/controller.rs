//! Workflow controller: owns a [`WorkflowState`] and commits reducer transitions.
//!
//! Forward movement is gated by validation, backward movement is not. While a
//! submission is in flight every mutation is refused with
//! [`WorkflowError::WorkflowLocked`]; the `Pending` submission state is the
//! only mutual-exclusion mechanism.

use std::sync::Arc;

use kyc_types::{Clock, IdempotencyKey, WorkflowId, WorkflowParams};

use crate::catalog::DocumentTypeCatalog;
use crate::documents::{DocumentUploadAck, Toggle};
use crate::error::WorkflowError;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::personal_info::PersonalInfoRecord;
use crate::reducer::{reduce, Action, Context, Outcome};
use crate::state::{SubmissionState, WorkflowState};
use crate::submission::{
    Confirmation, FailureKind, SubmissionContent, SubmissionFailure, SubmissionPayload,
    SubmissionTicket, Submitter,
};

/// Result of a successful [`WorkflowController::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the step at this index.
    Moved { to: usize },
    /// The terminal step passed validation; call `submit`.
    ReadyToSubmit,
}

pub struct WorkflowController {
    state: WorkflowState,
    documents: Arc<DocumentTypeCatalog>,
    params: WorkflowParams,
    clock: Arc<dyn Clock>,
}

impl WorkflowController {
    /// Begin a new workflow.
    pub fn start(
        workflow_id: WorkflowId,
        documents: Arc<DocumentTypeCatalog>,
        params: WorkflowParams,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = WorkflowState::new(workflow_id, clock.now());
        tracing::info!(workflow = %workflow_id, "verification workflow started");
        Self::from_state(state, documents, params, clock)
    }

    /// Take over an existing (e.g. hydrated) state.
    pub fn from_state(
        state: WorkflowState,
        documents: Arc<DocumentTypeCatalog>,
        params: WorkflowParams,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state,
            documents,
            params,
            clock,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    pub fn documents(&self) -> &DocumentTypeCatalog {
        &self.documents
    }

    pub fn params(&self) -> &WorkflowParams {
        &self.params
    }

    /// Apply one action and commit the resulting state.
    pub fn apply(&mut self, action: Action) -> Result<Outcome, WorkflowError> {
        let ctx = Context {
            documents: &self.documents,
            params: &self.params,
            now: self.clock.now(),
            today: self.clock.today(),
        };
        let transition = match reduce(&self.state, &action, &ctx) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(
                    workflow = %self.state.workflow_id(),
                    action = action.name(),
                    error = %e,
                    "action refused"
                );
                return Err(e);
            }
        };
        self.state = transition.state;
        tracing::debug!(
            workflow = %self.state.workflow_id(),
            action = action.name(),
            step = %self.state.current_step(),
            "action applied"
        );
        Ok(transition.outcome)
    }

    /// Validate the current step and move forward if it passes.
    ///
    /// On failure the step is marked `Failed` with its errors (that change is
    /// kept) and the errors are returned as [`WorkflowError::Validation`].
    pub fn advance(&mut self) -> Result<Advance, WorkflowError> {
        match self.apply(Action::Advance)? {
            Outcome::Advanced { to, .. } => Ok(Advance::Moved { to }),
            Outcome::ReadyToSubmit => Ok(Advance::ReadyToSubmit),
            Outcome::ValidationFailed(errors) => {
                tracing::warn!(
                    workflow = %self.state.workflow_id(),
                    step = %self.state.current_step(),
                    errors = errors.len(),
                    "step failed validation"
                );
                Err(WorkflowError::Validation(errors))
            }
            other => unreachable!("advance produced {other:?}"),
        }
    }

    /// Step back one step (floor 0). Step statuses are untouched.
    pub fn retreat(&mut self) -> Result<usize, WorkflowError> {
        match self.apply(Action::Retreat)? {
            Outcome::Retreated { to, .. } => Ok(to),
            other => unreachable!("retreat produced {other:?}"),
        }
    }

    pub fn set_personal_info(&mut self, record: PersonalInfoRecord) -> Result<(), WorkflowError> {
        self.apply(Action::SetPersonalInfo(record)).map(drop)
    }

    pub fn toggle_document(&mut self, doc_id: &str) -> Result<Toggle, WorkflowError> {
        match self.apply(Action::ToggleDocument(doc_id.to_string()))? {
            Outcome::DocumentToggled(toggle) => Ok(toggle),
            other => unreachable!("toggle produced {other:?}"),
        }
    }

    pub fn record_document_upload(&mut self, ack: DocumentUploadAck) -> Result<(), WorkflowError> {
        self.apply(Action::RecordDocumentUpload(ack)).map(drop)
    }

    pub fn record_liveness(&mut self, signal: LivenessSignal) -> Result<(), WorkflowError> {
        self.apply(Action::RecordLiveness(signal)).map(drop)
    }

    pub fn record_external_verification(
        &mut self,
        result: ExternalVerification,
    ) -> Result<(), WorkflowError> {
        self.apply(Action::RecordExternalVerification(result)).map(drop)
    }

    /// Check preconditions, lock the workflow and produce the ticket to send.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, WorkflowError> {
        match self.apply(Action::BeginSubmission)? {
            Outcome::SubmissionStarted(ticket) => {
                tracing::info!(
                    workflow = %self.state.workflow_id(),
                    attempt = ticket.payload.attempt,
                    key = %ticket.idempotency_key(),
                    "submission started"
                );
                Ok(*ticket)
            }
            other => unreachable!("begin_submission produced {other:?}"),
        }
    }

    /// Rebuild the ticket of the submission in flight, with its original key.
    ///
    /// Used after a restart to re-send a `Pending` submission whose outcome is
    /// unknown; the service deduplicates on the key.
    pub fn in_flight_ticket(&self) -> Result<SubmissionTicket, WorkflowError> {
        let SubmissionState::Pending {
            idempotency_key,
            attempt,
            fingerprint,
        } = self.state.submission()
        else {
            return Err(WorkflowError::NoSubmissionInFlight);
        };
        let content = SubmissionContent::from_state(&self.state)?;
        Ok(SubmissionTicket {
            payload: SubmissionPayload {
                workflow_id: *self.state.workflow_id(),
                idempotency_key: idempotency_key.clone(),
                attempt: *attempt,
                content,
            },
            fingerprint: *fingerprint,
        })
    }

    /// Key of a transiently failed submission that the next
    /// [`begin_submission`](Self::begin_submission) would abandon, because the
    /// draft changed since it was sent. The service may still have recorded it.
    pub fn superseded_key(&self) -> Option<IdempotencyKey> {
        let SubmissionState::Failed {
            kind: FailureKind::Transient,
            idempotency_key,
            fingerprint,
            ..
        } = self.state.submission()
        else {
            return None;
        };
        let current = SubmissionContent::from_state(&self.state)
            .and_then(|content| content.fingerprint())
            .ok()?;
        (current != *fingerprint).then(|| idempotency_key.clone())
    }

    /// Settle a transiently failed submission with the confirmation the
    /// service issued for it after all.
    pub fn adopt_confirmation(&mut self, confirmation: Confirmation) -> Result<(), WorkflowError> {
        self.apply(Action::AdoptConfirmation(confirmation.clone()))?;
        tracing::info!(
            workflow = %self.state.workflow_id(),
            verification_id = %confirmation.verification_id,
            key = %confirmation.idempotency_key,
            "adopted confirmation of an earlier attempt"
        );
        Ok(())
    }

    /// Record the result of the in-flight submission and unlock the workflow.
    pub fn resolve_submission(
        &mut self,
        idempotency_key: &IdempotencyKey,
        result: Result<Confirmation, SubmissionFailure>,
    ) -> Result<&SubmissionState, WorkflowError> {
        let outcome = self.apply(Action::ResolveSubmission {
            idempotency_key: idempotency_key.clone(),
            result,
        })?;
        match outcome {
            Outcome::SubmissionSucceeded(confirmation) => tracing::info!(
                workflow = %self.state.workflow_id(),
                verification_id = %confirmation.verification_id,
                "submission accepted"
            ),
            Outcome::SubmissionFailed(failure) => tracing::warn!(
                workflow = %self.state.workflow_id(),
                kind = %failure.kind,
                reason = %failure.reason,
                "submission failed"
            ),
            other => unreachable!("resolve_submission produced {other:?}"),
        }
        Ok(self.state.submission())
    }

    /// Submit the workflow through `submitter` and record the result.
    pub async fn submit(&mut self, submitter: &dyn Submitter) -> Result<Confirmation, WorkflowError> {
        let ticket = self.begin_submission()?;
        let result = submitter.submit(&ticket).await;
        self.resolve_submission(ticket.idempotency_key(), result.clone())?;
        result.map_err(WorkflowError::Submission)
    }
}

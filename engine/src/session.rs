//! A verification session: one workflow, persisted after every change.
//!
//! The session owns the [`WorkflowController`] and writes a snapshot to the
//! store whenever the workflow state changes, so a restart resumes exactly
//! where the user left off. A succeeded workflow is moved to the archive.

use std::sync::Arc;

use kyc_store::WorkflowStore;
use kyc_submission::{RemoteStatus, SubmissionCoordinator, SubmissionError};
use kyc_types::WorkflowId;
use kyc_verification::{
    encode, Advance, Confirmation, DocumentUploadAck, ExternalVerification, LivenessSignal,
    PersonalInfoRecord, SubmissionFailure, SubmissionState, Toggle, WorkflowController,
    WorkflowError, WorkflowState,
};

use crate::EngineError;

/// Outcome of [`VerificationSession::recover_submission`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// No submission was in flight.
    NothingInFlight,
    /// The service has (or now has) accepted the submission.
    Confirmed(Confirmation),
    /// The submission failed; the workflow is unlocked.
    Failed(SubmissionFailure),
    /// The service is still deciding; the workflow stays locked.
    StillProcessing,
}

fn persist(store: &dyn WorkflowStore, state: &WorkflowState) -> Result<(), EngineError> {
    let bytes = encode(state)?;
    if state.is_archived() {
        store.archive_snapshot(state.workflow_id(), &bytes)?;
        tracing::info!(workflow = %state.workflow_id(), "workflow archived");
    } else {
        store.put_snapshot(state.workflow_id(), &bytes)?;
    }
    Ok(())
}

pub struct VerificationSession {
    controller: WorkflowController,
    store: Arc<dyn WorkflowStore>,
    coordinator: Arc<SubmissionCoordinator>,
}

impl VerificationSession {
    /// Wrap a controller and write its initial snapshot.
    pub(crate) fn open(
        controller: WorkflowController,
        store: Arc<dyn WorkflowStore>,
        coordinator: Arc<SubmissionCoordinator>,
        fresh: bool,
    ) -> Result<Self, EngineError> {
        if fresh {
            persist(store.as_ref(), controller.state())?;
        }
        Ok(Self {
            controller,
            store,
            coordinator,
        })
    }

    pub fn workflow_id(&self) -> WorkflowId {
        *self.controller.state().workflow_id()
    }

    pub fn state(&self) -> &WorkflowState {
        self.controller.state()
    }

    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    /// Run one controller operation and persist the state if it changed.
    ///
    /// A failed validation still changes the state (the step becomes
    /// `Failed`), so it is persisted before the error is returned. If that
    /// write fails too, the operation's error wins and the store error is logged.
    fn run<T>(
        &mut self,
        op: impl FnOnce(&mut WorkflowController) -> Result<T, WorkflowError>,
    ) -> Result<T, EngineError> {
        let before = self.controller.state().clone();
        let result = op(&mut self.controller);
        if self.controller.state() != &before {
            if let Err(store_error) = persist(self.store.as_ref(), self.controller.state()) {
                let Err(op_error) = result else {
                    return Err(store_error);
                };
                tracing::error!(
                    workflow = %self.workflow_id(),
                    error = %store_error,
                    "could not persist workflow state"
                );
                return Err(op_error.into());
            }
        }
        Ok(result?)
    }

    pub fn advance(&mut self) -> Result<Advance, EngineError> {
        self.run(|c| c.advance())
    }

    pub fn retreat(&mut self) -> Result<usize, EngineError> {
        self.run(|c| c.retreat())
    }

    pub fn set_personal_info(&mut self, record: PersonalInfoRecord) -> Result<(), EngineError> {
        self.run(|c| c.set_personal_info(record))
    }

    pub fn toggle_document(&mut self, doc_id: &str) -> Result<Toggle, EngineError> {
        self.run(|c| c.toggle_document(doc_id))
    }

    pub fn record_document_upload(&mut self, ack: DocumentUploadAck) -> Result<(), EngineError> {
        self.run(|c| c.record_document_upload(ack))
    }

    pub fn record_liveness(&mut self, signal: LivenessSignal) -> Result<(), EngineError> {
        self.run(|c| c.record_liveness(signal))
    }

    pub fn record_external_verification(
        &mut self,
        result: ExternalVerification,
    ) -> Result<(), EngineError> {
        self.run(|c| c.record_external_verification(result))
    }

    /// Submit the workflow, retrying transient failures per the retry policy.
    ///
    /// Every intermediate state (`Pending`, `Failed(Transient)`, final) is
    /// persisted before the next step is taken.
    pub async fn submit(&mut self) -> Result<Confirmation, EngineError> {
        let store = self.store.clone();
        self.coordinator
            .submit_workflow(&mut self.controller, |state| {
                persist(store.as_ref(), state)
            })
            .await
    }

    /// Settle a submission left `Pending` by a crash or lost response.
    ///
    /// The service is asked about the in-flight key: accepted and rejected
    /// submissions are resolved, a processing one stays locked, and an unknown
    /// one is re-sent with the same key.
    pub async fn recover_submission(&mut self) -> Result<Recovery, EngineError> {
        let Some(key) = self.pending_key() else {
            return Ok(Recovery::NothingInFlight);
        };
        let status = self
            .coordinator
            .query(&key)
            .await
            .map_err(WorkflowError::Submission)?;
        tracing::info!(workflow = %self.workflow_id(), ?status, "recovering in-flight submission");

        let result = match status {
            RemoteStatus::Processing => return Ok(Recovery::StillProcessing),
            RemoteStatus::Accepted { confirmation } => {
                if confirmation.idempotency_key != key {
                    return Err(SubmissionError::InvalidResponse(format!(
                        "status for {key} returned a confirmation for {}",
                        confirmation.idempotency_key
                    ))
                    .into());
                }
                Ok(confirmation)
            }
            RemoteStatus::Rejected { reason } => Err(SubmissionFailure::permanent(reason)),
            RemoteStatus::Unknown => {
                let ticket = self.controller.in_flight_ticket()?;
                self.coordinator.deliver(&ticket).await
            }
        };

        self.controller.resolve_submission(&key, result.clone())?;
        persist(self.store.as_ref(), self.controller.state())?;
        Ok(match result {
            Ok(confirmation) => Recovery::Confirmed(confirmation),
            Err(failure) => Recovery::Failed(failure),
        })
    }

    fn pending_key(&self) -> Option<kyc_types::IdempotencyKey> {
        match self.controller.state().submission() {
            SubmissionState::Pending {
                idempotency_key, ..
            } => Some(idempotency_key.clone()),
            _ => None,
        }
    }

    /// Drop the workflow and its stored snapshot.
    pub fn abandon(self) -> Result<(), EngineError> {
        if self.controller.state().is_locked() {
            return Err(WorkflowError::WorkflowLocked.into());
        }
        if self.controller.state().is_archived() {
            return Err(WorkflowError::WorkflowArchived.into());
        }
        self.store.delete_snapshot(&self.workflow_id())?;
        tracing::info!(workflow = %self.workflow_id(), "workflow abandoned");
        Ok(())
    }
}

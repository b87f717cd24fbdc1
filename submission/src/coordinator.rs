//! Submission coordinator: delivers workflow tickets to the verification
//! service, retrying transient failures with exponential backoff.
//!
//! Every retry re-sends the same ticket, so the idempotency key never changes
//! within one logical submission and the service can deduplicate.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use kyc_types::IdempotencyKey;
use kyc_utils::format_duration_ms;
use kyc_verification::{
    Confirmation, FailureKind, SubmissionFailure, SubmissionTicket, Submitter, WorkflowController,
    WorkflowError, WorkflowState,
};

use crate::error::SubmissionError;
use crate::retry::RetryPolicy;
use crate::service::{RemoteStatus, VerificationService};

/// Progress of the coordinator, published on a watch channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionEvent {
    Idle,
    /// Attempt `attempt` (1-based within this delivery) is being sent.
    Attempt { attempt: u32, key: IdempotencyKey },
    /// A transient failure; the next attempt starts after `after_ms`.
    Retrying {
        after_ms: u64,
        failure: SubmissionFailure,
    },
    Succeeded(Confirmation),
    Failed(SubmissionFailure),
}

pub struct SubmissionCoordinator {
    service: Arc<dyn VerificationService>,
    policy: RetryPolicy,
    events: watch::Sender<SubmissionEvent>,
}

impl SubmissionCoordinator {
    pub fn new(service: Arc<dyn VerificationService>, policy: RetryPolicy) -> Self {
        let (events, _) = watch::channel(SubmissionEvent::Idle);
        Self {
            service,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    pub fn last_event(&self) -> SubmissionEvent {
        self.events.borrow().clone()
    }

    fn publish(&self, event: SubmissionEvent) {
        self.events.send_replace(event);
    }

    fn timeout_error(&self) -> SubmissionError {
        SubmissionError::Timeout {
            after_ms: self.policy.attempt_timeout_ms,
        }
    }

    /// Send `ticket` once, bounded by the per-attempt timeout.
    pub async fn attempt(
        &self,
        ticket: &SubmissionTicket,
        attempt: u32,
    ) -> Result<Confirmation, SubmissionFailure> {
        self.publish(SubmissionEvent::Attempt {
            attempt,
            key: ticket.idempotency_key().clone(),
        });
        tracing::debug!(
            workflow = %ticket.workflow_id(),
            attempt,
            key = %ticket.idempotency_key(),
            "sending submission"
        );

        let sent = tokio::time::timeout(
            self.policy.attempt_timeout(),
            self.service.submit(&ticket.payload),
        )
        .await;
        let confirmation = match sent {
            Ok(Ok(confirmation)) => confirmation,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(self.timeout_error().into()),
        };
        if &confirmation.idempotency_key != ticket.idempotency_key() {
            return Err(SubmissionError::InvalidResponse(format!(
                "confirmation for key {} does not match the submission",
                confirmation.idempotency_key
            ))
            .into());
        }
        Ok(confirmation)
    }

    /// Decide what follows a failed attempt. Returns the backoff to wait before
    /// the next attempt, or `None` when the failure is final.
    fn after_failure(&self, failure: &SubmissionFailure, attempts_made: u32) -> Option<u64> {
        if failure.kind == FailureKind::Transient && self.policy.allows_another(attempts_made) {
            let delay = self.policy.backoff_ms(attempts_made.saturating_sub(1));
            tracing::warn!(
                attempt = attempts_made,
                retry_in = %format_duration_ms(delay),
                reason = %failure.reason,
                "transient submission failure, retrying"
            );
            self.publish(SubmissionEvent::Retrying {
                after_ms: delay,
                failure: failure.clone(),
            });
            Some(delay)
        } else {
            tracing::warn!(
                attempt = attempts_made,
                kind = %failure.kind,
                reason = %failure.reason,
                "submission failed"
            );
            self.publish(SubmissionEvent::Failed(failure.clone()));
            None
        }
    }

    fn succeeded(&self, confirmation: &Confirmation, attempts_made: u32) {
        tracing::info!(
            verification_id = %confirmation.verification_id,
            attempts = attempts_made,
            "submission confirmed"
        );
        self.publish(SubmissionEvent::Succeeded(confirmation.clone()));
    }

    /// Deliver one ticket, retrying transient failures in place.
    pub async fn deliver(&self, ticket: &SubmissionTicket) -> Result<Confirmation, SubmissionFailure> {
        let mut made = 0;
        loop {
            made += 1;
            match self.attempt(ticket, made).await {
                Ok(confirmation) => {
                    self.succeeded(&confirmation, made);
                    return Ok(confirmation);
                }
                Err(failure) => match self.after_failure(&failure, made) {
                    Some(delay) => tokio::time::sleep(std::time::Duration::from_millis(delay)).await,
                    None => return Err(failure),
                },
            }
        }
    }

    /// Submit a workflow through its controller, resolving every attempt.
    ///
    /// Between attempts the workflow sits in `Failed(Transient)`; the retry
    /// begins a new submission, which reuses the key because the content is
    /// unchanged. `checkpoint` runs after every state change (to persist it).
    ///
    /// If the draft was edited after a transient failure, the old key is looked
    /// up first: an accepted submission is adopted, a processing one refuses the
    /// new submission with [`WorkflowError::EarlierSubmissionProcessing`].
    pub async fn submit_workflow<E, F>(
        &self,
        controller: &mut WorkflowController,
        mut checkpoint: F,
    ) -> Result<Confirmation, E>
    where
        E: From<WorkflowError>,
        F: FnMut(&WorkflowState) -> Result<(), E>,
    {
        if let Some(previous) = controller.superseded_key() {
            if let Some(confirmation) = self.settle_superseded(controller, &previous).await? {
                checkpoint(controller.state())?;
                self.succeeded(&confirmation, 0);
                return Ok(confirmation);
            }
        }

        let mut made = 0;
        loop {
            let ticket = controller.begin_submission()?;
            checkpoint(controller.state())?;
            made += 1;

            let result = self.attempt(&ticket, made).await;
            controller.resolve_submission(ticket.idempotency_key(), result.clone())?;
            checkpoint(controller.state())?;

            match result {
                Ok(confirmation) => {
                    self.succeeded(&confirmation, made);
                    return Ok(confirmation);
                }
                Err(failure) => match self.after_failure(&failure, made) {
                    Some(delay) => tokio::time::sleep(std::time::Duration::from_millis(delay)).await,
                    None => return Err(WorkflowError::Submission(failure).into()),
                },
            }
        }
    }

    /// Before a changed draft is sent under a new key, find out whether the
    /// service recorded the transiently failed one. An accepted submission is
    /// adopted instead of sending a second one.
    async fn settle_superseded(
        &self,
        controller: &mut WorkflowController,
        previous: &IdempotencyKey,
    ) -> Result<Option<Confirmation>, WorkflowError> {
        let status = self
            .query(previous)
            .await
            .map_err(WorkflowError::Submission)?;
        tracing::debug!(key = %previous, ?status, "checked superseded submission");
        match status {
            RemoteStatus::Accepted { confirmation } => {
                if &confirmation.idempotency_key != previous {
                    return Err(WorkflowError::Submission(
                        SubmissionError::InvalidResponse(format!(
                            "status for {previous} returned a confirmation for {}",
                            confirmation.idempotency_key
                        ))
                        .into(),
                    ));
                }
                controller.adopt_confirmation(confirmation.clone())?;
                Ok(Some(confirmation))
            }
            RemoteStatus::Processing => {
                Err(WorkflowError::EarlierSubmissionProcessing(previous.clone()))
            }
            RemoteStatus::Rejected { .. } | RemoteStatus::Unknown => Ok(None),
        }
    }

    /// Ask the service what became of a submission key.
    pub async fn query(&self, key: &IdempotencyKey) -> Result<RemoteStatus, SubmissionFailure> {
        match tokio::time::timeout(self.policy.attempt_timeout(), self.service.status(key)).await {
            Ok(result) => result.map_err(SubmissionFailure::from),
            Err(_) => Err(self.timeout_error().into()),
        }
    }
}

#[async_trait]
impl Submitter for SubmissionCoordinator {
    async fn submit(&self, ticket: &SubmissionTicket) -> Result<Confirmation, SubmissionFailure> {
        self.deliver(ticket).await
    }
}

//! Pure state transitions.
//!
//! `reduce` never mutates its input: it returns the next state together with
//! an [`Outcome`], or an error when the action is refused (the state is then
//! unchanged). Because time, thresholds and reference data arrive through
//! [`Context`], an action log replays to the same state every time.

use chrono::NaiveDate;

use kyc_types::{FieldError, IdempotencyKey, StepId, StepStatus, Timestamp, WorkflowParams};

use crate::catalog::{DocumentTypeCatalog, StepCatalog};
use crate::documents::{DocumentUploadAck, Toggle};
use crate::error::WorkflowError;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::personal_info::PersonalInfoRecord;
use crate::state::{SubmissionState, WorkflowState};
use crate::submission::{
    Confirmation, FailureKind, SubmissionContent, SubmissionFailure, SubmissionPayload,
    SubmissionTicket,
};
use crate::validators::{validate, ValidationContext, ValidationResult};

/// Everything a transition may depend on besides the state.
#[derive(Clone, Copy, Debug)]
pub struct Context<'a> {
    pub documents: &'a DocumentTypeCatalog,
    pub params: &'a WorkflowParams,
    pub now: Timestamp,
    pub today: NaiveDate,
}

impl<'a> Context<'a> {
    pub fn validation(&self) -> ValidationContext<'a> {
        ValidationContext {
            documents: self.documents,
            params: self.params,
            today: self.today,
        }
    }
}

/// An input to the workflow.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Advance,
    Retreat,
    SetPersonalInfo(PersonalInfoRecord),
    ToggleDocument(String),
    RecordDocumentUpload(DocumentUploadAck),
    RecordLiveness(LivenessSignal),
    RecordExternalVerification(ExternalVerification),
    BeginSubmission,
    /// The service turned out to have accepted the transiently failed
    /// submission; settle the workflow with its confirmation.
    AdoptConfirmation(Confirmation),
    ResolveSubmission {
        idempotency_key: IdempotencyKey,
        result: Result<Confirmation, SubmissionFailure>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::SetPersonalInfo(_) => "set_personal_info",
            Self::ToggleDocument(_) => "toggle_document",
            Self::RecordDocumentUpload(_) => "record_document_upload",
            Self::RecordLiveness(_) => "record_liveness",
            Self::RecordExternalVerification(_) => "record_external_verification",
            Self::BeginSubmission => "begin_submission",
            Self::AdoptConfirmation(_) => "adopt_confirmation",
            Self::ResolveSubmission { .. } => "resolve_submission",
        }
    }
}

/// What an accepted action did.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Advanced { from: usize, to: usize },
    /// The terminal step validated; the workflow may be submitted.
    ReadyToSubmit,
    /// The current step failed validation and is now `Failed`.
    ValidationFailed(Vec<FieldError>),
    Retreated { from: usize, to: usize },
    DocumentToggled(Toggle),
    InputRecorded,
    SubmissionStarted(Box<SubmissionTicket>),
    SubmissionSucceeded(Confirmation),
    SubmissionFailed(SubmissionFailure),
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub state: WorkflowState,
    pub outcome: Outcome,
}

/// Compute the transition for `action` applied to `state`.
pub fn reduce(
    state: &WorkflowState,
    action: &Action,
    ctx: &Context<'_>,
) -> Result<Transition, WorkflowError> {
    if let Action::ResolveSubmission {
        idempotency_key,
        result,
    } = action
    {
        return resolve_submission(state, idempotency_key, result, ctx);
    }
    ensure_mutable(state)?;

    let mut next = state.clone();
    let outcome = match action {
        Action::Advance => advance(&mut next, ctx),
        Action::Retreat => retreat(&mut next),
        Action::SetPersonalInfo(record) => {
            ensure_active(&next, StepId::PersonalInfo)?;
            next.personal_info = record.clone();
            mark_edited(&mut next);
            Outcome::InputRecorded
        }
        Action::ToggleDocument(raw_id) => {
            ensure_active(&next, StepId::DocumentUpload)?;
            let toggle = next.document_selection.toggle(raw_id, ctx.documents)?;
            if toggle == Toggle::Deselected {
                next.document_uploads.retain(|id, _| next.document_selection.contains(id));
            }
            mark_edited(&mut next);
            Outcome::DocumentToggled(toggle)
        }
        Action::RecordDocumentUpload(ack) => {
            ensure_active(&next, StepId::DocumentUpload)?;
            ack.check_against(ctx.documents)?;
            if !next.document_selection.contains(&ack.doc_id) {
                return Err(WorkflowError::DocumentNotSelected(ack.doc_id.clone()));
            }
            next.document_uploads.insert(ack.doc_id.clone(), ack.clone());
            mark_edited(&mut next);
            Outcome::InputRecorded
        }
        Action::RecordLiveness(signal) => {
            ensure_active(&next, StepId::BiometricVerification)?;
            signal.check_well_formed()?;
            next.liveness = Some(signal.clone());
            mark_edited(&mut next);
            Outcome::InputRecorded
        }
        Action::RecordExternalVerification(result) => {
            result.check_well_formed()?;
            ensure_active(&next, result.step_id)?;
            next.external_checks.insert(result.step_id, result.clone());
            mark_edited(&mut next);
            Outcome::InputRecorded
        }
        Action::BeginSubmission => begin_submission(&mut next)?,
        Action::AdoptConfirmation(confirmation) => adopt_confirmation(&mut next, confirmation)?,
        Action::ResolveSubmission { .. } => unreachable!("handled above"),
    };
    next.updated_at = ctx.now;
    Ok(Transition {
        state: next,
        outcome,
    })
}

/// Fold an action log over `initial`. Refused actions leave the state as it was,
/// exactly as they do when applied live.
pub fn replay<'a>(
    initial: WorkflowState,
    actions: impl IntoIterator<Item = &'a Action>,
    ctx: &Context<'_>,
) -> WorkflowState {
    actions
        .into_iter()
        .fold(initial, |state, action| match reduce(&state, action, ctx) {
            Ok(transition) => transition.state,
            Err(_) => state,
        })
}

fn ensure_mutable(state: &WorkflowState) -> Result<(), WorkflowError> {
    if state.is_locked() {
        return Err(WorkflowError::WorkflowLocked);
    }
    if state.is_archived() {
        return Err(WorkflowError::WorkflowArchived);
    }
    Ok(())
}

fn ensure_active(state: &WorkflowState, step: StepId) -> Result<(), WorkflowError> {
    let current = state.current_step();
    if current != step {
        return Err(WorkflowError::StepNotActive { step, current });
    }
    Ok(())
}

/// Editing a step's input re-opens it: it must be advanced again.
fn mark_edited(state: &mut WorkflowState) {
    let record = state.record_mut(state.current_step_index);
    record.status = StepStatus::InProgress;
    record.errors.clear();
}

fn advance(state: &mut WorkflowState, ctx: &Context<'_>) -> Outcome {
    let from = state.current_step_index;
    let step = state.current_step();
    let result = validate(&state.payload(step), &ctx.validation());
    match result {
        ValidationResult::Valid => {
            let record = state.record_mut(from);
            record.status = StepStatus::Completed;
            record.errors.clear();

            let last = StepCatalog::STANDARD.last_index();
            if from >= last {
                return Outcome::ReadyToSubmit;
            }
            let to = from + 1;
            state.current_step_index = to;
            let next = state.record_mut(to);
            if next.status == StepStatus::Pending {
                next.status = StepStatus::InProgress;
            }
            Outcome::Advanced { from, to }
        }
        ValidationResult::Invalid(errors) => {
            let record = state.record_mut(from);
            record.status = StepStatus::Failed;
            record.errors = errors.clone();
            Outcome::ValidationFailed(errors)
        }
    }
}

fn retreat(state: &mut WorkflowState) -> Outcome {
    let from = state.current_step_index;
    let to = from.saturating_sub(1);
    state.current_step_index = to;
    Outcome::Retreated { from, to }
}

fn ensure_ready(state: &WorkflowState) -> Result<(), WorkflowError> {
    let unmet = state.unmet_required_steps();
    if !unmet.is_empty() {
        return Err(WorkflowError::NotReady { unmet });
    }
    if !state.is_at_terminal_step() {
        return Err(WorkflowError::NotAtTerminalStep {
            current: state.current_step(),
        });
    }
    Ok(())
}

fn begin_submission(state: &mut WorkflowState) -> Result<Outcome, WorkflowError> {
    ensure_ready(state)?;

    let content = SubmissionContent::from_state(state)?;
    let fingerprint = content.fingerprint()?;

    let attempt = match &state.submission {
        SubmissionState::Failed {
            kind: FailureKind::Transient,
            attempt,
            fingerprint: previous,
            ..
        } if *previous == fingerprint => *attempt,
        SubmissionState::Failed {
            kind: FailureKind::Permanent,
            fingerprint: previous,
            ..
        } if *previous == fingerprint => return Err(WorkflowError::ResubmissionUnchanged),
        _ => state.attempt_counter + 1,
    };
    let idempotency_key = IdempotencyKey::derive(&state.workflow_id, attempt);

    state.attempt_counter = attempt;
    state.submission = SubmissionState::Pending {
        idempotency_key: idempotency_key.clone(),
        attempt,
        fingerprint,
    };

    let ticket = SubmissionTicket {
        payload: SubmissionPayload {
            workflow_id: state.workflow_id,
            idempotency_key,
            attempt,
            content,
        },
        fingerprint,
    };
    Ok(Outcome::SubmissionStarted(Box::new(ticket)))
}

fn adopt_confirmation(
    state: &mut WorkflowState,
    confirmation: &Confirmation,
) -> Result<Outcome, WorkflowError> {
    let SubmissionState::Failed {
        kind: FailureKind::Transient,
        idempotency_key,
        ..
    } = &state.submission
    else {
        return Err(WorkflowError::NoSubmissionInFlight);
    };
    if *idempotency_key != confirmation.idempotency_key {
        return Err(WorkflowError::SubmissionMismatch {
            expected: idempotency_key.clone(),
            got: confirmation.idempotency_key.clone(),
        });
    }
    ensure_ready(state)?;
    state.submission = SubmissionState::Succeeded {
        confirmation: confirmation.clone(),
    };
    Ok(Outcome::SubmissionSucceeded(confirmation.clone()))
}

fn resolve_submission(
    state: &WorkflowState,
    key: &IdempotencyKey,
    result: &Result<Confirmation, SubmissionFailure>,
    ctx: &Context<'_>,
) -> Result<Transition, WorkflowError> {
    let SubmissionState::Pending {
        idempotency_key,
        attempt,
        fingerprint,
    } = &state.submission
    else {
        return Err(WorkflowError::NoSubmissionInFlight);
    };
    if idempotency_key != key {
        return Err(WorkflowError::SubmissionMismatch {
            expected: idempotency_key.clone(),
            got: key.clone(),
        });
    }

    let mut next = state.clone();
    let outcome = match result {
        Ok(confirmation) => {
            next.submission = SubmissionState::Succeeded {
                confirmation: confirmation.clone(),
            };
            Outcome::SubmissionSucceeded(confirmation.clone())
        }
        Err(failure) => {
            next.submission = SubmissionState::Failed {
                kind: failure.kind,
                reason: failure.reason.clone(),
                idempotency_key: idempotency_key.clone(),
                attempt: *attempt,
                fingerprint: *fingerprint,
            };
            Outcome::SubmissionFailed(failure.clone())
        }
    };
    next.updated_at = ctx.now;
    Ok(Transition {
        state: next,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[test]
    fn reduce_does_not_touch_input_state() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let before = state.clone();
        let t = reduce(
            &state,
            &Action::SetPersonalInfo(fx.personal_info()),
            &fx.context(),
        )
        .unwrap();
        assert_eq!(state, before);
        assert_eq!(t.outcome, Outcome::InputRecorded);
        assert_eq!(t.state.status(StepId::PersonalInfo), StepStatus::InProgress);
    }

    #[test]
    fn invalid_advance_marks_failed_and_keeps_index() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let t = reduce(&state, &Action::Advance, &fx.context()).unwrap();
        let Outcome::ValidationFailed(errors) = t.outcome else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 5);
        assert_eq!(t.state.current_step_index(), 0);
        assert_eq!(t.state.status(StepId::PersonalInfo), StepStatus::Failed);
        assert_eq!(t.state.step(StepId::PersonalInfo).errors(), errors.as_slice());
    }

    #[test]
    fn valid_advance_completes_and_opens_next() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let ctx = fx.context();
        let state = reduce(&state, &Action::SetPersonalInfo(fx.personal_info()), &ctx)
            .unwrap()
            .state;
        let t = reduce(&state, &Action::Advance, &ctx).unwrap();
        assert_eq!(t.outcome, Outcome::Advanced { from: 0, to: 1 });
        assert_eq!(t.state.status(StepId::PersonalInfo), StepStatus::Completed);
        assert_eq!(t.state.status(StepId::DocumentUpload), StepStatus::InProgress);
    }

    #[test]
    fn retreat_floors_at_zero() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let t = reduce(&state, &Action::Retreat, &fx.context()).unwrap();
        assert_eq!(t.outcome, Outcome::Retreated { from: 0, to: 0 });
        assert_eq!(t.state.steps(), state.steps());
    }

    #[test]
    fn input_for_inactive_step_is_refused() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let err = reduce(&state, &Action::RecordLiveness(fx.liveness()), &fx.context())
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::StepNotActive {
                step: StepId::BiometricVerification,
                current: StepId::PersonalInfo,
            }
        );
    }

    #[test]
    fn deselecting_drops_upload_ack() {
        let fx = fixture();
        let mut c = fx.controller();
        c.set_personal_info(fx.personal_info()).unwrap();
        c.advance().unwrap();
        c.toggle_document("national_id").unwrap();
        c.record_document_upload(fx.ack("national_id")).unwrap();
        assert_eq!(c.state().document_uploads().len(), 1);

        let t = reduce(
            c.state(),
            &Action::ToggleDocument("national_id".into()),
            &fx.context(),
        )
        .unwrap();
        assert_eq!(t.outcome, Outcome::DocumentToggled(Toggle::Deselected));
        assert!(t.state.document_uploads().is_empty());
    }

    #[test]
    fn upload_for_unselected_document_is_refused() {
        let fx = fixture();
        let mut c = fx.controller();
        c.set_personal_info(fx.personal_info()).unwrap();
        c.advance().unwrap();
        let err = reduce(
            c.state(),
            &Action::RecordDocumentUpload(fx.ack("passport")),
            &fx.context(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::DocumentNotSelected(_)));
    }

    #[test]
    fn begin_submission_names_every_unmet_step() {
        let fx = fixture();
        let state = fx.controller().into_state();
        let err = reduce(&state, &Action::BeginSubmission, &fx.context()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotReady {
                unmet: StepId::ALL.to_vec()
            }
        );
    }

    #[test]
    fn begin_submission_locks_and_derives_key() {
        let fx = fixture();
        let state = fx.ready_controller().into_state();
        let t = reduce(&state, &Action::BeginSubmission, &fx.context()).unwrap();
        let Outcome::SubmissionStarted(ticket) = t.outcome else {
            panic!("expected ticket");
        };
        assert_eq!(ticket.payload.attempt, 1);
        assert_eq!(
            ticket.idempotency_key(),
            &IdempotencyKey::derive(&fx.workflow_id, 1)
        );
        assert!(t.state.is_locked());
        assert_eq!(t.state.attempt_counter(), 1);

        for action in [
            Action::Retreat,
            Action::Advance,
            Action::BeginSubmission,
            Action::RecordLiveness(fx.liveness()),
        ] {
            assert_eq!(
                reduce(&t.state, &action, &fx.context()).unwrap_err(),
                WorkflowError::WorkflowLocked
            );
        }
    }

    #[test]
    fn resolve_requires_matching_key() {
        let fx = fixture();
        let state = fx.ready_controller().into_state();
        let ctx = fx.context();
        let locked = reduce(&state, &Action::BeginSubmission, &ctx).unwrap().state;
        let wrong = IdempotencyKey::derive(&fx.workflow_id, 9);
        let err = reduce(
            &locked,
            &Action::ResolveSubmission {
                idempotency_key: wrong,
                result: Err(SubmissionFailure::transient("timeout")),
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::SubmissionMismatch { .. }));

        let err = reduce(
            &state,
            &Action::ResolveSubmission {
                idempotency_key: IdempotencyKey::derive(&fx.workflow_id, 1),
                result: Err(SubmissionFailure::transient("timeout")),
            },
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, WorkflowError::NoSubmissionInFlight);
    }

    #[test]
    fn transient_retry_reuses_attempt() {
        let fx = fixture();
        let ctx = fx.context();
        let state = fx.ready_controller().into_state();
        let locked = reduce(&state, &Action::BeginSubmission, &ctx).unwrap().state;
        let key = IdempotencyKey::derive(&fx.workflow_id, 1);
        let failed = reduce(
            &locked,
            &Action::ResolveSubmission {
                idempotency_key: key.clone(),
                result: Err(SubmissionFailure::transient("503")),
            },
            &ctx,
        )
        .unwrap()
        .state;
        assert!(!failed.is_locked());

        let retry = reduce(&failed, &Action::BeginSubmission, &ctx).unwrap();
        let Outcome::SubmissionStarted(ticket) = retry.outcome else {
            panic!("expected ticket");
        };
        assert_eq!(ticket.idempotency_key(), &key);
        assert_eq!(retry.state.attempt_counter(), 1);
    }

    #[test]
    fn transient_failure_can_adopt_a_late_confirmation() {
        let fx = fixture();
        let ctx = fx.context();
        let state = fx.ready_controller().into_state();
        let key = IdempotencyKey::derive(&fx.workflow_id, 1);
        let confirmation = Confirmation {
            verification_id: "ver-late".into(),
            idempotency_key: key.clone(),
            received_at: ctx.now,
        };
        assert_eq!(
            reduce(&state, &Action::AdoptConfirmation(confirmation.clone()), &ctx).unwrap_err(),
            WorkflowError::NoSubmissionInFlight
        );

        let locked = reduce(&state, &Action::BeginSubmission, &ctx).unwrap().state;
        let failed = reduce(
            &locked,
            &Action::ResolveSubmission {
                idempotency_key: key.clone(),
                result: Err(SubmissionFailure::transient("connection reset")),
            },
            &ctx,
        )
        .unwrap()
        .state;

        let stranger = Confirmation {
            idempotency_key: IdempotencyKey::derive(&fx.workflow_id, 2),
            ..confirmation.clone()
        };
        assert!(matches!(
            reduce(&failed, &Action::AdoptConfirmation(stranger), &ctx),
            Err(WorkflowError::SubmissionMismatch { .. })
        ));

        let t = reduce(&failed, &Action::AdoptConfirmation(confirmation.clone()), &ctx).unwrap();
        assert_eq!(t.outcome, Outcome::SubmissionSucceeded(confirmation));
        assert!(t.state.is_archived());
        assert_eq!(t.state.attempt_counter(), 1);
        let bytes = crate::snapshot::encode(&t.state).unwrap();
        assert_eq!(
            crate::snapshot::decode(&bytes, &fx.validation()).unwrap(),
            t.state
        );
    }

    #[test]
    fn permanent_failure_requires_a_change() {
        let fx = fixture();
        let ctx = fx.context();
        let state = fx.ready_controller().into_state();
        let locked = reduce(&state, &Action::BeginSubmission, &ctx).unwrap().state;
        let failed = reduce(
            &locked,
            &Action::ResolveSubmission {
                idempotency_key: IdempotencyKey::derive(&fx.workflow_id, 1),
                result: Err(SubmissionFailure::permanent("license mismatch")),
            },
            &ctx,
        )
        .unwrap()
        .state;
        assert_eq!(
            reduce(&failed, &Action::BeginSubmission, &ctx).unwrap_err(),
            WorkflowError::ResubmissionUnchanged
        );

        let edited = reduce(
            &failed,
            &Action::RecordExternalVerification(fx.external(StepId::BackgroundCheck, "bg-2")),
            &ctx,
        )
        .unwrap()
        .state;
        let edited = reduce(&edited, &Action::Advance, &ctx).unwrap().state;
        let retry = reduce(&edited, &Action::BeginSubmission, &ctx).unwrap();
        let Outcome::SubmissionStarted(ticket) = retry.outcome else {
            panic!("expected ticket");
        };
        assert_eq!(ticket.payload.attempt, 2);
        assert_ne!(
            ticket.idempotency_key(),
            &IdempotencyKey::derive(&fx.workflow_id, 1)
        );
    }

    #[test]
    fn replay_is_deterministic_and_skips_refusals() {
        let fx = fixture();
        let ctx = fx.context();
        let actions = vec![
            Action::Advance,
            Action::SetPersonalInfo(fx.personal_info()),
            Action::RecordLiveness(fx.liveness()),
            Action::Advance,
            Action::ToggleDocument("passport".into()),
            Action::ToggleDocument("nope".into()),
            Action::Retreat,
        ];
        let initial = fx.controller().into_state();
        let a = replay(initial.clone(), &actions, &ctx);
        let b = replay(initial, &actions, &ctx);
        assert_eq!(a, b);
        assert_eq!(a.current_step_index(), 0);
        assert_eq!(a.status(StepId::PersonalInfo), StepStatus::Completed);
        assert_eq!(a.document_selection().len(), 1);
    }
}

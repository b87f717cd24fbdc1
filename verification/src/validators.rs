//! Field validators: pure predicates over a step's payload.
//!
//! No side effects and no I/O: "today" and all thresholds arrive through
//! [`ValidationContext`]. Every violated rule is reported, not only the first.

use chrono::NaiveDate;

use kyc_types::{Field, FieldError, StepId, WorkflowParams};

use crate::catalog::DocumentTypeCatalog;
use crate::documents::DocumentSelectionSet;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::payload::StepPayload;
use crate::personal_info::{Gender, PersonalInfoRecord};
use crate::state::WorkflowState;

/// Outcome of validating one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Everything the validators need besides the payload itself.
#[derive(Clone, Copy, Debug)]
pub struct ValidationContext<'a> {
    pub documents: &'a DocumentTypeCatalog,
    pub params: &'a WorkflowParams,
    pub today: NaiveDate,
}

/// Validate a step's payload.
pub fn validate(payload: &StepPayload<'_>, ctx: &ValidationContext<'_>) -> ValidationResult {
    let errors = match payload {
        StepPayload::PersonalInfo(record) => personal_info_errors(record, ctx),
        StepPayload::DocumentUpload(selection) => document_errors(selection, ctx.documents),
        StepPayload::BiometricVerification(signal) => liveness_errors(*signal, ctx.params),
        StepPayload::AddressVerification(result) => {
            external_errors(StepId::AddressVerification, *result)
        }
        StepPayload::ProfessionalCredentials(result) => {
            external_errors(StepId::ProfessionalCredentials, *result)
        }
        StepPayload::BackgroundCheck(result) => external_errors(StepId::BackgroundCheck, *result),
    };
    ValidationResult::from_errors(errors)
}

/// Validate the given step against the state's current draft.
pub fn validate_step(
    state: &WorkflowState,
    step: StepId,
    ctx: &ValidationContext<'_>,
) -> ValidationResult {
    validate(&state.payload(step), ctx)
}

fn personal_info_errors(record: &PersonalInfoRecord, ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let fields = [
        (Field::FullName, record.full_name.trim()),
        (Field::NationalId, record.national_id.trim()),
        (Field::DateOfBirth, record.date_of_birth.trim()),
        (Field::Nationality, record.nationality.trim()),
        (Field::Gender, record.gender.trim()),
    ];
    for (field, value) in fields {
        if value.is_empty() {
            errors.push(FieldError::Required(field));
            continue;
        }
        match field {
            Field::NationalId => {
                let well_formed = value.len() == ctx.params.national_id_length
                    && value.bytes().all(|b| b.is_ascii_digit());
                if !well_formed {
                    errors.push(FieldError::InvalidFormat(field));
                }
            }
            Field::DateOfBirth => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(dob) if dob < ctx.today => {}
                Ok(_) => errors.push(FieldError::NotInPast(field)),
                Err(_) => errors.push(FieldError::InvalidFormat(field)),
            },
            Field::Gender => {
                if value.parse::<Gender>().is_err() {
                    errors.push(FieldError::UnsupportedValue(field));
                }
            }
            Field::FullName | Field::Nationality => {}
        }
    }
    errors
}

fn document_errors(selection: &DocumentSelectionSet, catalog: &DocumentTypeCatalog) -> Vec<FieldError> {
    selection
        .missing_required(catalog)
        .into_iter()
        .map(FieldError::DocumentRequired)
        .collect()
}

fn liveness_errors(signal: Option<&LivenessSignal>, params: &WorkflowParams) -> Vec<FieldError> {
    match signal {
        None => vec![FieldError::LivenessRequired],
        Some(s)
            if s.success
                && s.confidence >= params.min_liveness_confidence
                && !s.evidence_token.trim().is_empty() =>
        {
            Vec::new()
        }
        Some(_) => vec![FieldError::LivenessFailed],
    }
}

fn external_errors(step: StepId, result: Option<&ExternalVerification>) -> Vec<FieldError> {
    let Some(result) = result else {
        return vec![FieldError::ResultRequired(step)];
    };
    let mut errors = Vec::new();
    if !result.success {
        errors.push(FieldError::VerificationFailed(step));
    }
    if result.evidence_ref.trim().is_empty() {
        errors.push(FieldError::EvidenceRequired(step));
    }
    errors
}

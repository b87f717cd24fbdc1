//! Field-level validation error codes.
//!
//! Validators never stop at the first problem; they return every violated
//! rule as a [`FieldError`] so the UI can surface all problems at once.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DocumentTypeId, StepId};

/// A personal-information field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FullName,
    NationalId,
    DateOfBirth,
    Nationality,
    Gender,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::NationalId => "nationalId",
            Self::DateOfBirth => "dateOfBirth",
            Self::Nationality => "nationality",
            Self::Gender => "gender",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated validation rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", content = "subject", rename_all = "snake_case")]
pub enum FieldError {
    /// The field is empty.
    Required(Field),
    /// The field does not match its expected shape.
    InvalidFormat(Field),
    /// A date that must lie in the past does not.
    NotInPast(Field),
    /// The value is not one of the enumerated options.
    UnsupportedValue(Field),
    /// A required document type is not selected.
    DocumentRequired(DocumentTypeId),
    /// No liveness signal has been recorded.
    LivenessRequired,
    /// The recorded liveness signal did not pass.
    LivenessFailed,
    /// No external verification result has been recorded for the step.
    ResultRequired(StepId),
    /// The external verification provider reported failure.
    VerificationFailed(StepId),
    /// The external result carries no evidence reference.
    EvidenceRequired(StepId),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required(field) => write!(f, "{field} required"),
            Self::InvalidFormat(field) => write!(f, "{field} invalid format"),
            Self::NotInPast(field) => write!(f, "{field} must be in the past"),
            Self::UnsupportedValue(field) => write!(f, "{field} unsupported value"),
            Self::DocumentRequired(doc) => write!(f, "document {doc} required"),
            Self::LivenessRequired => f.write_str("liveness signal required"),
            Self::LivenessFailed => f.write_str("liveness check failed"),
            Self::ResultRequired(step) => write!(f, "{step} result required"),
            Self::VerificationFailed(step) => write!(f, "{step} verification failed"),
            Self::EvidenceRequired(step) => write!(f, "{step} evidence required"),
        }
    }
}

//! Per-step payload views.
//!
//! Each step validates a different slice of the workflow state. [`StepPayload`]
//! has exactly one variant per [`StepId`], so validator dispatch is an
//! exhaustive match instead of a lookup keyed by string.

use kyc_types::StepId;

use crate::documents::DocumentSelectionSet;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::personal_info::PersonalInfoRecord;

/// Borrowed view of the input a single step is judged on.
#[derive(Clone, Copy, Debug)]
pub enum StepPayload<'a> {
    PersonalInfo(&'a PersonalInfoRecord),
    DocumentUpload(&'a DocumentSelectionSet),
    AddressVerification(Option<&'a ExternalVerification>),
    ProfessionalCredentials(Option<&'a ExternalVerification>),
    BiometricVerification(Option<&'a LivenessSignal>),
    BackgroundCheck(Option<&'a ExternalVerification>),
}

impl StepPayload<'_> {
    pub fn step_id(&self) -> StepId {
        match self {
            Self::PersonalInfo(_) => StepId::PersonalInfo,
            Self::DocumentUpload(_) => StepId::DocumentUpload,
            Self::AddressVerification(_) => StepId::AddressVerification,
            Self::ProfessionalCredentials(_) => StepId::ProfessionalCredentials,
            Self::BiometricVerification(_) => StepId::BiometricVerification,
            Self::BackgroundCheck(_) => StepId::BackgroundCheck,
        }
    }
}

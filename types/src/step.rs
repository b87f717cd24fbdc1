//! Step identifiers and per-step status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Identifies one step of the verification workflow.
///
/// The declaration order here is not sequencing truth; the step catalog is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    PersonalInfo,
    DocumentUpload,
    AddressVerification,
    ProfessionalCredentials,
    BiometricVerification,
    BackgroundCheck,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::PersonalInfo,
        StepId::DocumentUpload,
        StepId::AddressVerification,
        StepId::ProfessionalCredentials,
        StepId::BiometricVerification,
        StepId::BackgroundCheck,
    ];

    /// The stable wire identifier (`personal_info`, `document_upload`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::DocumentUpload => "document_upload",
            Self::AddressVerification => "address_verification",
            Self::ProfessionalCredentials => "professional_credentials",
            Self::BiometricVerification => "biometric_verification",
            Self::BackgroundCheck => "background_check",
        }
    }

    /// Whether this step's evidence comes from an external verification provider
    /// (utility-bill OCR, license registry, background-check callback).
    pub fn is_externally_verified(&self) -> bool {
        matches!(
            self,
            Self::AddressVerification | Self::ProfessionalCredentials | Self::BackgroundCheck
        )
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| TypeError::UnknownStep(s.to_string()))
    }
}

/// Lifecycle of a single step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_parse_from_wire_form() {
        for id in StepId::ALL {
            assert_eq!(id.as_str().parse::<StepId>().unwrap(), id);
        }
        assert!("selfie".parse::<StepId>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&StepId::BiometricVerification).unwrap();
        assert_eq!(json, "\"biometric_verification\"");
        let status = serde_json::to_string(&StepStatus::InProgress).unwrap();
        assert_eq!(status, "\"in_progress\"");
    }

    #[test]
    fn external_steps() {
        let external: Vec<_> = StepId::ALL
            .into_iter()
            .filter(StepId::is_externally_verified)
            .collect();
        assert_eq!(
            external,
            vec![
                StepId::AddressVerification,
                StepId::ProfessionalCredentials,
                StepId::BackgroundCheck
            ]
        );
    }
}

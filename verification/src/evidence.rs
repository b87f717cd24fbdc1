//! Signals recorded from external collaborators.
//!
//! The engine never captures biometrics or calls registries itself; it only
//! stores what the collaborators report and lets the validators check it.

use serde::{Deserialize, Serialize};

use kyc_types::StepId;

use crate::error::WorkflowError;

/// Liveness result from the biometric collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LivenessSignal {
    pub success: bool,
    /// 0.0..=1.0
    pub confidence: f64,
    /// Opaque token forwarded to the verification service as evidence.
    pub evidence_token: String,
}

impl LivenessSignal {
    pub(crate) fn check_well_formed(&self) -> Result<(), WorkflowError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(WorkflowError::InvalidSignal(format!(
                "liveness confidence {} outside 0..=1",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Result from an external verification provider for one step
/// (utility-bill OCR, license-registry lookup, background-check callback).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalVerification {
    pub step_id: StepId,
    pub success: bool,
    pub evidence_ref: String,
}

impl ExternalVerification {
    pub(crate) fn check_well_formed(&self) -> Result<(), WorkflowError> {
        if !self.step_id.is_externally_verified() {
            return Err(WorkflowError::InvalidSignal(format!(
                "{} is not verified by an external provider",
                self.step_id
            )));
        }
        Ok(())
    }
}

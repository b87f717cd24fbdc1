//! Tunable workflow parameters consumed by the field validators.

use serde::{Deserialize, Serialize};

/// Validation thresholds that deployments may tune without code changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowParams {
    /// Exact number of digits in a national identity number.
    pub national_id_length: usize,

    /// Minimum liveness confidence (0.0..=1.0) a successful biometric signal must carry.
    pub min_liveness_confidence: f64,
}

impl Default for WorkflowParams {
    fn default() -> Self {
        Self {
            national_id_length: 10,
            min_liveness_confidence: 0.80,
        }
    }
}

//! The remote verification service boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kyc_types::IdempotencyKey;
use kyc_verification::{Confirmation, SubmissionPayload};

use crate::error::SubmissionError;

/// What the service knows about a submission key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteStatus {
    Accepted { confirmation: Confirmation },
    Rejected { reason: String },
    /// Received but not yet decided.
    Processing,
    /// Never received.
    Unknown,
}

/// A verification service that deduplicates submissions by idempotency key.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Submit a payload. Re-submitting a key the service already accepted
    /// returns the original confirmation.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Confirmation, SubmissionError>;

    /// Look up a previously sent submission.
    async fn status(&self, key: &IdempotencyKey) -> Result<RemoteStatus, SubmissionError>;
}

use thiserror::Error;

use kyc_verification::{FailureKind, SubmissionFailure};

use crate::http::classify_status;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("attempt timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid service response: {0}")]
    InvalidResponse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl SubmissionError {
    /// Whether the failure may be retried with the same idempotency key.
    ///
    /// A malformed success response is retried: the key lets the service
    /// answer with the original confirmation.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::InvalidResponse(_) => {
                FailureKind::Transient
            }
            Self::Status { status, .. } => classify_status(*status),
            Self::Client(_) => FailureKind::Permanent,
        }
    }
}

impl From<SubmissionError> for SubmissionFailure {
    fn from(e: SubmissionError) -> Self {
        Self {
            kind: e.kind(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            SubmissionError::Network("reset".into()).kind(),
            FailureKind::Transient
        );
        assert_eq!(
            SubmissionError::Timeout { after_ms: 10 }.kind(),
            FailureKind::Transient
        );
        let status = |status| SubmissionError::Status {
            status,
            message: String::new(),
        };
        assert_eq!(status(503).kind(), FailureKind::Transient);
        assert_eq!(status(429).kind(), FailureKind::Transient);
        assert_eq!(status(422).kind(), FailureKind::Permanent);
    }

    #[test]
    fn converts_into_failure_with_reason() {
        let failure: SubmissionFailure = SubmissionError::Status {
            status: 400,
            message: "nationalId mismatch".into(),
        }
        .into();
        assert_eq!(failure.kind, FailureKind::Permanent);
        assert_eq!(
            failure.reason,
            "service returned HTTP 400: nationalId mismatch"
        );
    }
}

//! HTTP client for the verification service.
//!
//! `POST {base}/v1/verifications` with an `Idempotency-Key` header submits a
//! payload; `GET {base}/v1/verifications/{key}` reports its status.

use async_trait::async_trait;
use std::time::Duration;

use kyc_types::IdempotencyKey;
use kyc_verification::{Confirmation, FailureKind, SubmissionPayload};

use crate::error::SubmissionError;
use crate::service::{RemoteStatus, VerificationService};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Classify an HTTP status: 408, 429 and 5xx are transient, everything else
/// that is not a success is permanent.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        408 | 429 | 500..=599 => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

#[derive(Clone)]
pub struct HttpVerificationService {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpVerificationService {
    /// Create a client targeting `base_url` (e.g. `https://kyc.example.com`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| SubmissionError::Client(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> SubmissionError {
        if e.is_timeout() {
            SubmissionError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            SubmissionError::Network(e.to_string())
        }
    }

    async fn error_for(response: reqwest::Response) -> SubmissionError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        SubmissionError::Status {
            status,
            message: message.trim().to_string(),
        }
    }
}

#[async_trait]
impl VerificationService for HttpVerificationService {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Confirmation, SubmissionError> {
        let response = self
            .http
            .post(format!("{}/v1/verifications", self.base_url))
            .header(IDEMPOTENCY_HEADER, payload.idempotency_key.as_str())
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        response
            .json::<Confirmation>()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }

    async fn status(&self, key: &IdempotencyKey) -> Result<RemoteStatus, SubmissionError> {
        let response = self
            .http
            .get(format!("{}/v1/verifications/{}", self.base_url, key.as_str()))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(RemoteStatus::Unknown);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        response
            .json::<RemoteStatus>()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }
}

//! Nullable verification service: scripted responses, key deduplication,
//! and a record of everything received.

use async_trait::async_trait;
use kyc_submission::{classify_status, RemoteStatus, SubmissionError, VerificationService};
use kyc_types::{IdempotencyKey, Timestamp};
use kyc_verification::{Confirmation, FailureKind, SubmissionPayload};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What the service does with the next submission it receives.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Accept (or return the existing confirmation for a known key).
    Accept,
    /// Fail with the given error; permanent statuses mark the key rejected.
    Fail(SubmissionError),
    /// Accept, but lose the response on the way back.
    LoseResponse,
    /// Keep the submission processing and time out.
    Hold,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<Scripted>,
    received: Vec<SubmissionPayload>,
    accepted: HashMap<IdempotencyKey, Confirmation>,
    rejected: HashMap<IdempotencyKey, String>,
    processing: HashSet<IdempotencyKey>,
    status_queries: usize,
}

/// A verification service that answers from a script.
///
/// Once the script is exhausted every submission is accepted. Like the real
/// service, a key that was already accepted always yields the same confirmation.
#[derive(Default)]
pub struct NullVerificationService {
    inner: Mutex<Inner>,
}

impl NullVerificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: impl IntoIterator<Item = Scripted>) -> Self {
        let service = Self::new();
        service.lock().script.extend(script);
        service
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, step: Scripted) {
        self.lock().script.push_back(step);
    }

    /// Every payload received, in order.
    pub fn received(&self) -> Vec<SubmissionPayload> {
        self.lock().received.clone()
    }

    /// Idempotency keys of every payload received, in order.
    pub fn received_keys(&self) -> Vec<IdempotencyKey> {
        self.lock()
            .received
            .iter()
            .map(|p| p.idempotency_key.clone())
            .collect()
    }

    /// Number of distinct confirmations issued.
    pub fn confirmations(&self) -> usize {
        self.lock().accepted.len()
    }

    pub fn status_queries(&self) -> usize {
        self.lock().status_queries
    }

    /// Decide a held submission: accept it.
    pub fn complete_processing(&self, key: &IdempotencyKey) {
        let mut inner = self.lock();
        if inner.processing.remove(key) {
            let confirmation = Self::confirmation_for(&inner, key);
            inner.accepted.insert(key.clone(), confirmation);
        }
    }

    fn confirmation_for(inner: &Inner, key: &IdempotencyKey) -> Confirmation {
        Confirmation {
            verification_id: format!("null-ver-{}", inner.accepted.len() + 1),
            idempotency_key: key.clone(),
            received_at: Timestamp::EPOCH,
        }
    }

    fn accept(&self, inner: &mut Inner, key: &IdempotencyKey) -> Confirmation {
        if let Some(existing) = inner.accepted.get(key) {
            return existing.clone();
        }
        inner.processing.remove(key);
        let confirmation = Self::confirmation_for(inner, key);
        inner.accepted.insert(key.clone(), confirmation.clone());
        confirmation
    }
}

#[async_trait]
impl VerificationService for NullVerificationService {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Confirmation, SubmissionError> {
        let mut inner = self.lock();
        inner.received.push(payload.clone());
        let key = &payload.idempotency_key;
        match inner.script.pop_front().unwrap_or(Scripted::Accept) {
            Scripted::Accept => Ok(self.accept(&mut inner, key)),
            Scripted::LoseResponse => {
                self.accept(&mut inner, key);
                Err(SubmissionError::Network("connection reset".into()))
            }
            Scripted::Hold => {
                inner.processing.insert(key.clone());
                Err(SubmissionError::Timeout { after_ms: 0 })
            }
            Scripted::Fail(error) => {
                if let SubmissionError::Status { status, message } = &error {
                    if classify_status(*status) == FailureKind::Permanent {
                        inner.rejected.insert(key.clone(), message.clone());
                    }
                }
                Err(error)
            }
        }
    }

    async fn status(&self, key: &IdempotencyKey) -> Result<RemoteStatus, SubmissionError> {
        let mut inner = self.lock();
        inner.status_queries += 1;
        if let Some(confirmation) = inner.accepted.get(key) {
            return Ok(RemoteStatus::Accepted {
                confirmation: confirmation.clone(),
            });
        }
        if let Some(reason) = inner.rejected.get(key) {
            return Ok(RemoteStatus::Rejected {
                reason: reason.clone(),
            });
        }
        if inner.processing.contains(key) {
            return Ok(RemoteStatus::Processing);
        }
        Ok(RemoteStatus::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_types::WorkflowId;

    fn payload(attempt: u32) -> SubmissionPayload {
        let workflow_id = WorkflowId::from_bytes([9; 16]);
        let json = format!(
            r#"{{"workflowId":"{workflow_id}","idempotencyKey":"{}","attempt":{attempt},
            "personalInfo":{{"fullName":"A","nationalId":"1","dateOfBirth":"2000-01-01",
            "nationality":"SA","gender":"male"}},"documents":[],"biometricEvidence":"t",
            "externalEvidence":[]}}"#,
            IdempotencyKey::derive(&workflow_id, attempt)
        );
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn same_key_same_confirmation() {
        let service = NullVerificationService::new();
        let a = service.submit(&payload(1)).await.unwrap();
        let b = service.submit(&payload(1)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(service.confirmations(), 1);
        assert_eq!(service.received().len(), 2);
    }

    #[tokio::test]
    async fn scripted_failures_then_accept() {
        let service = NullVerificationService::scripted([
            Scripted::Fail(SubmissionError::Status {
                status: 503,
                message: "down".into(),
            }),
            Scripted::Fail(SubmissionError::Status {
                status: 400,
                message: "bad".into(),
            }),
        ]);
        let p = payload(1);
        assert!(service.submit(&p).await.is_err());
        assert_eq!(service.status(&p.idempotency_key).await.unwrap(), RemoteStatus::Unknown);
        assert!(service.submit(&p).await.is_err());
        assert_eq!(
            service.status(&p.idempotency_key).await.unwrap(),
            RemoteStatus::Rejected {
                reason: "bad".into()
            }
        );
        assert!(service.submit(&p).await.is_ok());
        assert_eq!(service.status_queries(), 2);
    }

    #[tokio::test]
    async fn lost_response_is_still_accepted() {
        let service = NullVerificationService::scripted([Scripted::LoseResponse]);
        let p = payload(2);
        assert!(matches!(
            service.submit(&p).await,
            Err(SubmissionError::Network(_))
        ));
        assert!(matches!(
            service.status(&p.idempotency_key).await.unwrap(),
            RemoteStatus::Accepted { .. }
        ));
    }

    #[tokio::test]
    async fn held_submission_reports_processing() {
        let service = NullVerificationService::scripted([Scripted::Hold]);
        let p = payload(1);
        assert!(service.submit(&p).await.is_err());
        assert_eq!(
            service.status(&p.idempotency_key).await.unwrap(),
            RemoteStatus::Processing
        );
        service.complete_processing(&p.idempotency_key);
        assert!(matches!(
            service.status(&p.idempotency_key).await.unwrap(),
            RemoteStatus::Accepted { .. }
        ));
    }
}

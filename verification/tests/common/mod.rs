use chrono::NaiveDate;
use std::sync::Arc;

use kyc_types::{Clock, DocumentTypeId, StepId, Timestamp, WorkflowId, WorkflowParams};
use kyc_verification::{
    DocumentTypeCatalog, DocumentUploadAck, ExternalVerification, LivenessSignal,
    PersonalInfoRecord, ValidationContext, WorkflowController,
};

pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(1_780_272_000)
    }

    fn today(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }
}

pub fn documents() -> Arc<DocumentTypeCatalog> {
    Arc::new(DocumentTypeCatalog::standard())
}

pub fn controller() -> WorkflowController {
    WorkflowController::start(
        WorkflowId::random(),
        documents(),
        WorkflowParams::default(),
        Arc::new(FixedClock),
    )
}

pub fn validation<'a>(
    documents: &'a DocumentTypeCatalog,
    params: &'a WorkflowParams,
) -> ValidationContext<'a> {
    ValidationContext {
        documents,
        params,
        today: FixedClock.today(),
    }
}

pub fn personal_info() -> PersonalInfoRecord {
    PersonalInfoRecord::new("Omar Haddad", "1234567890", "1988-11-30", "JO", "male")
}

pub fn ack(doc: &str) -> DocumentUploadAck {
    DocumentUploadAck {
        doc_id: DocumentTypeId::new(doc).unwrap(),
        storage_ref: format!("store://{doc}"),
        format: "png".into(),
        size_bytes: 4096,
    }
}

pub fn liveness(confidence: f64) -> LivenessSignal {
    LivenessSignal {
        success: true,
        confidence,
        evidence_token: "live-1".into(),
    }
}

pub fn external(step: StepId) -> ExternalVerification {
    ExternalVerification {
        step_id: step,
        success: true,
        evidence_ref: format!("{step}-ref"),
    }
}

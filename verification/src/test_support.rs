//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use std::sync::Arc;

use kyc_types::{Clock, DocumentTypeId, StepId, Timestamp, WorkflowId, WorkflowParams};

use crate::catalog::DocumentTypeCatalog;
use crate::controller::{Advance, WorkflowController};
use crate::documents::DocumentUploadAck;
use crate::evidence::{ExternalVerification, LivenessSignal};
use crate::personal_info::PersonalInfoRecord;
use crate::reducer::Context;
use crate::submission::Confirmation;
use crate::validators::ValidationContext;

pub(crate) struct FixedClock {
    pub now: Timestamp,
    pub today: NaiveDate,
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

pub(crate) struct Fixture {
    pub workflow_id: WorkflowId,
    pub documents: Arc<DocumentTypeCatalog>,
    pub params: WorkflowParams,
    pub clock: Arc<FixedClock>,
}

pub(crate) fn fixture() -> Fixture {
    Fixture {
        workflow_id: WorkflowId::from_bytes([7; 16]),
        documents: Arc::new(DocumentTypeCatalog::standard()),
        params: WorkflowParams::default(),
        clock: Arc::new(FixedClock {
            now: Timestamp::new(1_780_272_000),
            today: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        }),
    }
}

impl Fixture {
    pub fn validation(&self) -> ValidationContext<'_> {
        ValidationContext {
            documents: &self.documents,
            params: &self.params,
            today: self.clock.today,
        }
    }

    pub fn context(&self) -> Context<'_> {
        Context {
            documents: &self.documents,
            params: &self.params,
            now: self.clock.now,
            today: self.clock.today,
        }
    }

    pub fn controller(&self) -> WorkflowController {
        WorkflowController::start(
            self.workflow_id,
            self.documents.clone(),
            self.params.clone(),
            self.clock.clone(),
        )
    }

    pub fn personal_info(&self) -> PersonalInfoRecord {
        PersonalInfoRecord::new("Jane Doe", "1234567890", "1990-04-12", "SA", "female")
    }

    pub fn ack(&self, doc: &str) -> DocumentUploadAck {
        DocumentUploadAck {
            doc_id: DocumentTypeId::new(doc).unwrap(),
            storage_ref: format!("store://{doc}"),
            format: "pdf".into(),
            size_bytes: 2048,
        }
    }

    pub fn liveness(&self) -> LivenessSignal {
        LivenessSignal {
            success: true,
            confidence: 0.93,
            evidence_token: "live-token".into(),
        }
    }

    pub fn external(&self, step: StepId, evidence: &str) -> ExternalVerification {
        ExternalVerification {
            step_id: step,
            success: true,
            evidence_ref: evidence.into(),
        }
    }

    pub fn confirmation(&self, controller: &WorkflowController) -> Confirmation {
        Confirmation {
            verification_id: "ver-1".into(),
            idempotency_key: controller
                .state()
                .submission()
                .idempotency_key()
                .unwrap()
                .clone(),
            received_at: self.clock.now,
        }
    }

    /// A workflow with every step completed, positioned on the terminal step.
    pub fn ready_controller(&self) -> WorkflowController {
        let mut c = self.controller();
        c.set_personal_info(self.personal_info()).unwrap();
        assert_eq!(c.advance().unwrap(), Advance::Moved { to: 1 });

        for doc in ["national_id", "sce_license"] {
            c.toggle_document(doc).unwrap();
            c.record_document_upload(self.ack(doc)).unwrap();
        }
        c.advance().unwrap();

        c.record_external_verification(self.external(StepId::AddressVerification, "addr-1"))
            .unwrap();
        c.advance().unwrap();
        c.record_external_verification(self.external(StepId::ProfessionalCredentials, "lic-1"))
            .unwrap();
        c.advance().unwrap();
        c.record_liveness(self.liveness()).unwrap();
        c.advance().unwrap();
        c.record_external_verification(self.external(StepId::BackgroundCheck, "bg-1"))
            .unwrap();
        assert_eq!(c.advance().unwrap(), Advance::ReadyToSubmit);
        c
    }
}

/// A workflow whose first submission was accepted.
pub(crate) fn submitted_controller(fx: &Fixture) -> WorkflowController {
    let mut c = fx.ready_controller();
    let ticket = c.begin_submission().unwrap();
    let confirmation = fx.confirmation(&c);
    c.resolve_submission(ticket.idempotency_key(), Ok(confirmation))
        .unwrap();
    c
}

//! The engine: shared collaborators from which verification sessions are
//! started and resumed.

use std::sync::Arc;
use std::time::Duration;

use kyc_store::WorkflowStore;
use kyc_store_lmdb::LmdbEnvironment;
use kyc_submission::{HttpVerificationService, SubmissionCoordinator, VerificationService};
use kyc_types::{Clock, SystemClock, WorkflowId, WorkflowParams};
use kyc_verification::{
    decode, DocumentTypeCatalog, ValidationContext, WorkflowController, WorkflowState,
};

use crate::config::EngineConfig;
use crate::session::VerificationSession;
use crate::EngineError;

/// Named LMDB databases the engine needs.
const MAX_DBS: u32 = 2;

pub struct Engine {
    store: Arc<dyn WorkflowStore>,
    coordinator: Arc<SubmissionCoordinator>,
    documents: Arc<DocumentTypeCatalog>,
    params: WorkflowParams,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Assemble an engine from explicit collaborators.
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        service: Arc<dyn VerificationService>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            coordinator: Arc::new(SubmissionCoordinator::new(service, config.retry.clone())),
            documents: Arc::new(DocumentTypeCatalog::standard()),
            params: config.params.clone(),
            clock,
        }
    }

    /// Open the LMDB store and HTTP service described by `config`.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size)?;
        let service = HttpVerificationService::new(
            config.service_url.clone(),
            Duration::from_millis(config.retry.attempt_timeout_ms),
        )?;
        tracing::info!(
            data_dir = %config.data_dir.display(),
            service = %config.service_url,
            "verification engine opened"
        );
        Ok(Self::new(
            Arc::new(env.workflow_store()),
            Arc::new(service),
            config,
            Arc::new(SystemClock),
        ))
    }

    /// Replace the document catalog.
    pub fn with_documents(mut self, documents: DocumentTypeCatalog) -> Self {
        self.documents = Arc::new(documents);
        self
    }

    pub fn coordinator(&self) -> &SubmissionCoordinator {
        &self.coordinator
    }

    pub fn documents(&self) -> &DocumentTypeCatalog {
        &self.documents
    }

    fn controller(&self, state: Option<WorkflowState>) -> WorkflowController {
        match state {
            Some(state) => WorkflowController::from_state(
                state,
                self.documents.clone(),
                self.params.clone(),
                self.clock.clone(),
            ),
            None => WorkflowController::start(
                WorkflowId::random(),
                self.documents.clone(),
                self.params.clone(),
                self.clock.clone(),
            ),
        }
    }

    fn session(&self, controller: WorkflowController, fresh: bool) -> Result<VerificationSession, EngineError> {
        VerificationSession::open(
            controller,
            self.store.clone(),
            self.coordinator.clone(),
            fresh,
        )
    }

    /// Start a new workflow and persist it.
    pub fn begin(&self) -> Result<VerificationSession, EngineError> {
        self.session(self.controller(None), true)
    }

    /// Hydrate a stored workflow. Archived workflows resume read-only; a
    /// snapshot that fails any invariant check is refused.
    pub fn resume(&self, id: &WorkflowId) -> Result<VerificationSession, EngineError> {
        let bytes = match self.store.get_snapshot(id)? {
            Some(bytes) => bytes,
            None => self
                .store
                .get_archived(id)?
                .ok_or(EngineError::NotFound(*id))?,
        };
        let ctx = ValidationContext {
            documents: &self.documents,
            params: &self.params,
            today: self.clock.today(),
        };
        let state = decode(&bytes, &ctx).inspect_err(|e| {
            tracing::error!(workflow = %id, error = %e, "refusing to resume workflow");
        })?;
        tracing::debug!(workflow = %id, step = %state.current_step(), "workflow resumed");
        self.session(self.controller(Some(state)), false)
    }

    /// Ids of all workflows that have not been archived.
    pub fn active_workflows(&self) -> Result<Vec<WorkflowId>, EngineError> {
        Ok(self.store.list_active()?)
    }
}

//! Workflow snapshot storage trait.

use crate::StoreError;
use kyc_types::WorkflowId;

/// Trait for persisting serialized workflow snapshots.
///
/// Snapshots are opaque bytes at this layer; encoding and invariant checks
/// belong to the workflow crate. Active workflows may be overwritten freely.
/// Archived workflows (successful submissions) are write-once.
pub trait WorkflowStore: Send + Sync {
    /// Insert or replace the snapshot of an active workflow.
    fn put_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError>;

    /// Get the snapshot of an active workflow, if one exists.
    fn get_snapshot(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove an active workflow (abandon / restart).
    fn delete_snapshot(&self, id: &WorkflowId) -> Result<(), StoreError>;

    /// Move a workflow into the archive with its final snapshot.
    ///
    /// Fails with [`StoreError::AlreadyArchived`] if the workflow is already archived.
    fn archive_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError>;

    /// Get an archived snapshot.
    fn get_archived(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Ids of all active (non-archived) workflows.
    fn list_active(&self) -> Result<Vec<WorkflowId>, StoreError>;
}

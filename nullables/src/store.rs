//! Nullable store: thread-safe in-memory snapshot storage for testing.

use kyc_store::{StoreError, WorkflowStore};
use kyc_types::WorkflowId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Table = BTreeMap<WorkflowId, Vec<u8>>;

/// An in-memory workflow store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullWorkflowStore {
    active: Mutex<Table>,
    archived: Mutex<Table>,
    fail_writes: AtomicBool,
}

fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }

    pub fn archived_count(&self) -> usize {
        lock(&self.archived).len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }
}

impl WorkflowStore for NullWorkflowStore {
    fn put_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.active).insert(*id, snapshot.to_vec());
        Ok(())
    }

    fn get_snapshot(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.active).get(id).cloned())
    }

    fn delete_snapshot(&self, id: &WorkflowId) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.active).remove(id);
        Ok(())
    }

    fn archive_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut archived = lock(&self.archived);
        if archived.contains_key(id) {
            return Err(StoreError::AlreadyArchived(*id));
        }
        archived.insert(*id, snapshot.to_vec());
        lock(&self.active).remove(id);
        Ok(())
    }

    fn get_archived(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(lock(&self.archived).get(id).cloned())
    }

    fn list_active(&self) -> Result<Vec<WorkflowId>, StoreError> {
        Ok(lock(&self.active).keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_archive() {
        let store = NullWorkflowStore::new();
        let id = WorkflowId::from_bytes([3; 16]);
        store.put_snapshot(&id, b"one").unwrap();
        assert_eq!(store.get_snapshot(&id).unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(store.list_active().unwrap(), vec![id]);

        store.archive_snapshot(&id, b"final").unwrap();
        assert!(store.get_snapshot(&id).unwrap().is_none());
        assert_eq!(store.get_archived(&id).unwrap().as_deref(), Some(&b"final"[..]));
        assert!(matches!(
            store.archive_snapshot(&id, b"again"),
            Err(StoreError::AlreadyArchived(_))
        ));
    }

    #[test]
    fn failing_writes() {
        let store = NullWorkflowStore::new();
        let id = WorkflowId::from_bytes([4; 16]);
        store.fail_writes(true);
        assert!(matches!(
            store.put_snapshot(&id, b"x"),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.active_count(), 0);
        store.fail_writes(false);
        store.put_snapshot(&id, b"x").unwrap();
        assert_eq!(store.active_count(), 1);
    }
}

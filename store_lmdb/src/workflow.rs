//! LMDB implementation of WorkflowStore.
//!
//! Keys are the 16 raw bytes of the workflow id. Values are a bincode
//! [`SnapshotRecord`] envelope around the caller's snapshot bytes, so a torn
//! or foreign value is detected on read instead of being handed upstream.

use heed::types::Bytes;
use heed::{Database, Env};
use serde::{Deserialize, Serialize};

use kyc_store::{StoreError, WorkflowStore};
use kyc_types::{Timestamp, WorkflowId};

use crate::LmdbError;

const RECORD_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    version: u16,
    stored_at: Timestamp,
    snapshot: Vec<u8>,
}

fn encode_record(snapshot: &[u8]) -> Result<Vec<u8>, LmdbError> {
    let record = SnapshotRecord {
        version: RECORD_VERSION,
        stored_at: Timestamp::now(),
        snapshot: snapshot.to_vec(),
    };
    bincode::serialize(&record).map_err(|e| LmdbError::Serialization(e.to_string()))
}

fn decode_record(id: &WorkflowId, bytes: &[u8]) -> Result<Vec<u8>, LmdbError> {
    let record: SnapshotRecord = bincode::deserialize(bytes)
        .map_err(|e| LmdbError::Corruption(format!("workflow {id}: {e}")))?;
    if record.version != RECORD_VERSION {
        return Err(LmdbError::Corruption(format!(
            "workflow {id}: unsupported record version {}",
            record.version
        )));
    }
    Ok(record.snapshot)
}

pub struct LmdbWorkflowStore {
    pub(crate) env: Env,
    pub(crate) workflows_db: Database<Bytes, Bytes>,
    pub(crate) archive_db: Database<Bytes, Bytes>,
}

impl LmdbWorkflowStore {
    fn read(
        &self,
        db: &Database<Bytes, Bytes>,
        id: &WorkflowId,
    ) -> Result<Option<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match db.get(&rtxn, id.as_bytes())? {
            Some(bytes) => decode_record(id, bytes).map(Some),
            None => Ok(None),
        }
    }
}

impl WorkflowStore for LmdbWorkflowStore {
    fn put_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError> {
        let value = encode_record(snapshot)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.workflows_db
            .put(&mut wtxn, id.as_bytes(), &value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_snapshot(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read(&self.workflows_db, id)?)
    }

    fn delete_snapshot(&self, id: &WorkflowId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.workflows_db
            .delete(&mut wtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn archive_snapshot(&self, id: &WorkflowId, snapshot: &[u8]) -> Result<(), StoreError> {
        let value = encode_record(snapshot)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .archive_db
            .get(&wtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::AlreadyArchived(*id));
        }
        self.archive_db
            .put(&mut wtxn, id.as_bytes(), &value)
            .map_err(LmdbError::from)?;
        self.workflows_db
            .delete(&mut wtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(workflow = %id, "archived workflow snapshot");
        Ok(())
    }

    fn get_archived(&self, id: &WorkflowId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read(&self.archive_db, id)?)
    }

    fn list_active(&self) -> Result<Vec<WorkflowId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for entry in self.workflows_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let bytes: [u8; 16] = key.try_into().map_err(|_| {
                StoreError::Corruption(format!("workflow key of length {}", key.len()))
            })?;
            ids.push(WorkflowId::from_bytes(bytes));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024)
            .expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn put_then_get_returns_same_bytes() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        let id = WorkflowId::random();
        store.put_snapshot(&id, b"{\"v\":1}").unwrap();
        assert_eq!(store.get_snapshot(&id).unwrap().unwrap(), b"{\"v\":1}");
    }

    #[test]
    fn put_overwrites() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        let id = WorkflowId::random();
        store.put_snapshot(&id, b"first").unwrap();
        store.put_snapshot(&id, b"second").unwrap();
        assert_eq!(store.get_snapshot(&id).unwrap().unwrap(), b"second");
    }

    #[test]
    fn missing_workflow_is_none() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        assert!(store.get_snapshot(&WorkflowId::random()).unwrap().is_none());
    }

    #[test]
    fn archive_moves_out_of_active() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        let id = WorkflowId::random();
        store.put_snapshot(&id, b"draft").unwrap();
        store.archive_snapshot(&id, b"final").unwrap();

        assert!(store.get_snapshot(&id).unwrap().is_none());
        assert_eq!(store.get_archived(&id).unwrap().unwrap(), b"final");
        assert!(store.list_active().unwrap().is_empty());
    }

    #[test]
    fn archive_is_write_once() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        let id = WorkflowId::random();
        store.archive_snapshot(&id, b"final").unwrap();
        let err = store.archive_snapshot(&id, b"again").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyArchived(_)));
        assert_eq!(store.get_archived(&id).unwrap().unwrap(), b"final");
    }

    #[test]
    fn list_active_returns_every_id() {
        let (_dir, env) = temp_env();
        let store = env.workflow_store();
        let mut ids: Vec<_> = (0..3).map(|_| WorkflowId::random()).collect();
        for id in &ids {
            store.put_snapshot(id, b"x").unwrap();
        }
        let mut listed = store.list_active().unwrap();
        ids.sort();
        listed.sort();
        assert_eq!(listed, ids);
    }

    #[test]
    fn foreign_value_is_reported_as_corruption() {
        let (_dir, env) = temp_env();
        let id = WorkflowId::random();
        let mut wtxn = env.env().write_txn().unwrap();
        env.workflows_db
            .put(&mut wtxn, id.as_bytes(), &[0xffu8, 0x01][..])
            .unwrap();
        wtxn.commit().unwrap();

        let err = env.workflow_store().get_snapshot(&id).unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = WorkflowId::random();
        {
            let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024).unwrap();
            env.workflow_store().put_snapshot(&id, b"persisted").unwrap();
            env.sync().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 4, 10 * 1024 * 1024).unwrap();
        assert_eq!(
            env.workflow_store().get_snapshot(&id).unwrap().unwrap(),
            b"persisted"
        );
    }
}

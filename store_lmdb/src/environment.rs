//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::workflow::LmdbWorkflowStore;
use crate::LmdbError;

/// Number of named databases this crate opens.
const DB_COUNT: u32 = 2;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    pub(crate) workflows_db: Database<Bytes, Bytes>,
    pub(crate) archive_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// `max_dbs` must be at least the number of databases this crate uses.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // never memory-mapped elsewhere while open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DB_COUNT))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let workflows_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("workflows"))?;
        let archive_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("archived_workflows"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            workflows_db,
            archive_db,
        })
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    /// A workflow store backed by this environment.
    pub fn workflow_store(&self) -> LmdbWorkflowStore {
        LmdbWorkflowStore {
            env: self.env.clone(),
            workflows_db: self.workflows_db,
            archive_db: self.archive_db,
        }
    }

    /// Force an fsync of the environment.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env().force_sync()?;
        Ok(())
    }
}

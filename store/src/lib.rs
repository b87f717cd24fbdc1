//! Abstract storage traits for persisted verification workflows.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod workflow;

pub use error::StoreError;
pub use workflow::WorkflowStore;

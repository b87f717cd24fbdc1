//! LMDB storage backend for persisted verification workflows.
//!
//! Implements the `kyc-store` traits using the `heed` LMDB bindings.
//! Active and archived workflows live in two databases within a single environment.

pub mod environment;
pub mod error;
pub mod workflow;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use workflow::LmdbWorkflowStore;

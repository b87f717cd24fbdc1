//! KYC verification engine.
//!
//! Wires the workflow controller to durable storage and the remote
//! verification service:
//! - [`EngineConfig`]: TOML configuration (storage, logging, service, retry, thresholds).
//! - [`Engine`]: opens the store and service, starts and resumes sessions.
//! - [`VerificationSession`]: one workflow, persisted after every change,
//!   with submission and crash recovery.

pub mod config;
pub mod engine;
pub mod error;
pub mod session;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use kyc_utils::LogFormat;
pub use session::{Recovery, VerificationSession};

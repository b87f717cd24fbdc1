//! In-process stand-ins for the clock, the snapshot store and the remote
//! verification service.
//!
//! Each one is driven from the test itself (advance the clock, script the
//! service, make the store refuse writes) and records what it saw, so
//! session-level tests can assert on outcomes without a network or disk.

pub mod clock;
pub mod service;
pub mod store;

pub use clock::NullClock;
pub use service::{NullVerificationService, Scripted};
pub use store::NullWorkflowStore;

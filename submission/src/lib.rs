//! Submission of completed workflows to the remote verification service.
//!
//! - [`RetryPolicy`]: bounded exponential backoff and per-attempt timeout.
//! - [`VerificationService`]: the remote boundary, with an HTTP implementation.
//! - [`SubmissionCoordinator`]: drives attempts, classifies failures and
//!   publishes [`SubmissionEvent`]s.

pub mod coordinator;
pub mod error;
pub mod http;
pub mod retry;
pub mod service;

pub use coordinator::{SubmissionCoordinator, SubmissionEvent};
pub use error::SubmissionError;
pub use http::{classify_status, HttpVerificationService};
pub use retry::RetryPolicy;
pub use service::{RemoteStatus, VerificationService};

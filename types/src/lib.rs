//! Fundamental types for the KYC verification workflow.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! step identifiers and statuses, field-level error codes, document identifiers,
//! workflow and idempotency identifiers, timestamps, the clock seam, and
//! tunable workflow parameters.

pub mod document;
pub mod error;
pub mod field;
pub mod hash;
pub mod id;
pub mod params;
pub mod step;
pub mod time;

pub use document::DocumentTypeId;
pub use error::TypeError;
pub use field::{Field, FieldError};
pub use hash::{blake2b_256, blake2b_256_multi, PayloadFingerprint};
pub use id::{IdempotencyKey, WorkflowId};
pub use params::WorkflowParams;
pub use step::{StepId, StepStatus};
pub use time::{Clock, SystemClock, Timestamp};

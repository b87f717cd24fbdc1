//! Shared utilities for the KYC verification workflow.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::format_duration_ms;

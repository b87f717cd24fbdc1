//! Workflow identifiers and submission idempotency keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::hash::blake2b_256_multi;
use crate::TypeError;

/// Identifies one verification workflow for its whole life, across resumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    /// Generate a fresh random workflow id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for WorkflowId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| TypeError::InvalidWorkflowId(s.to_string()))
    }
}

/// Token that lets the remote verification service deduplicate repeated
/// deliveries of the same logical submission.
///
/// Derived from the workflow id and the workflow-scoped attempt counter, so it
/// is stable across network retries of one attempt and changes only when a
/// new logical submission begins.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Length of the hex-encoded key.
    pub const LEN: usize = 64;

    pub fn derive(workflow: &WorkflowId, attempt: u32) -> Self {
        let digest = blake2b_256_multi(&[workflow.as_bytes(), &attempt.to_be_bytes()]);
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdempotencyKey({})", &self.0[..8])
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdempotencyKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == Self::LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidIdempotencyKey(s.to_string()))
        }
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_per_attempt() {
        let wf = WorkflowId::random();
        assert_eq!(IdempotencyKey::derive(&wf, 1), IdempotencyKey::derive(&wf, 1));
        assert_ne!(IdempotencyKey::derive(&wf, 1), IdempotencyKey::derive(&wf, 2));
    }

    #[test]
    fn key_is_scoped_to_workflow() {
        let a = WorkflowId::random();
        let b = WorkflowId::random();
        assert_ne!(IdempotencyKey::derive(&a, 1), IdempotencyKey::derive(&b, 1));
    }

    #[test]
    fn key_parses_back() {
        let key = IdempotencyKey::derive(&WorkflowId::random(), 3);
        let parsed: IdempotencyKey = key.as_str().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("not-a-key".parse::<IdempotencyKey>().is_err());
    }

    #[test]
    fn workflow_id_round_trips_through_display() {
        let wf = WorkflowId::random();
        let parsed: WorkflowId = wf.to_string().parse().unwrap();
        assert_eq!(parsed, wf);
    }
}

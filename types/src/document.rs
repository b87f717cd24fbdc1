//! Document type identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Identifier of a document type in the document catalog (e.g. `national_id`).
///
/// Lower-case ASCII letters, digits and underscores only.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentTypeId(String);

impl DocumentTypeId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        let well_formed = !s.is_empty()
            && s.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if well_formed {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidDocumentId(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentTypeId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DocumentTypeId> for String {
    fn from(id: DocumentTypeId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snake_case() {
        assert!(DocumentTypeId::new("sce_license").is_ok());
        assert!(DocumentTypeId::new("form_2b").is_ok());
    }

    #[test]
    fn rejects_malformed() {
        assert!(DocumentTypeId::new("").is_err());
        assert!(DocumentTypeId::new("National ID").is_err());
        assert!(DocumentTypeId::new("passport-scan").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: DocumentTypeId = serde_json::from_str("\"passport\"").unwrap();
        assert_eq!(ok.as_str(), "passport");
        assert!(serde_json::from_str::<DocumentTypeId>("\"Bad Id\"").is_err());
    }
}

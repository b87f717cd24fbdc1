//! Static reference data: the ordered step catalog and the document-type catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use kyc_types::{DocumentTypeId, StepId};

use crate::error::WorkflowError;

/// Definition of one verification step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub description: &'static str,
    /// Must be `Completed` before submission is allowed.
    pub required: bool,
}

const STANDARD_STEPS: [StepDefinition; 6] = [
    StepDefinition {
        id: StepId::PersonalInfo,
        title: "Personal information",
        description: "Full name, national ID, date of birth, nationality and gender",
        required: true,
    },
    StepDefinition {
        id: StepId::DocumentUpload,
        title: "Document upload",
        description: "Identity and professional documents",
        required: true,
    },
    StepDefinition {
        id: StepId::AddressVerification,
        title: "Address verification",
        description: "Proof of residence checked against a recent utility bill",
        required: true,
    },
    StepDefinition {
        id: StepId::ProfessionalCredentials,
        title: "Professional credentials",
        description: "License checked against the professional registry",
        required: true,
    },
    StepDefinition {
        id: StepId::BiometricVerification,
        title: "Biometric verification",
        description: "Liveness check against the identity document photo",
        required: true,
    },
    StepDefinition {
        id: StepId::BackgroundCheck,
        title: "Background check",
        description: "Screening by the background-check provider",
        required: true,
    },
];

/// The immutable ordered sequence of verification steps.
///
/// Position in the catalog is the sole source of sequencing truth.
#[derive(Clone, Copy, Debug)]
pub struct StepCatalog {
    steps: &'static [StepDefinition],
}

impl StepCatalog {
    /// The six-step KYC flow.
    pub const STANDARD: StepCatalog = StepCatalog {
        steps: &STANDARD_STEPS,
    };

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&'static StepDefinition> {
        self.steps.get(index)
    }

    pub fn index_of(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn definition(&self, id: StepId) -> Option<&'static StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static StepDefinition> {
        self.steps.iter()
    }
}

/// A document type the user may select and upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: DocumentTypeId,
    pub name: String,
    /// Lower-case file extensions, e.g. `pdf`, `jpg`.
    pub accepted_formats: Vec<String>,
    pub max_size_bytes: u64,
    pub required: bool,
}

impl DocumentType {
    pub fn accepts_format(&self, format: &str) -> bool {
        let format = format.trim().trim_start_matches('.');
        self.accepted_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

/// Read-only set of document descriptors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentTypeCatalog {
    documents: Vec<DocumentType>,
}

const MIB: u64 = 1024 * 1024;

impl DocumentTypeCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(documents: Vec<DocumentType>) -> Result<Self, WorkflowError> {
        let mut seen = BTreeSet::new();
        for doc in &documents {
            if !seen.insert(doc.id.clone()) {
                return Err(WorkflowError::DuplicateDocumentType(doc.id.clone()));
            }
        }
        Ok(Self { documents })
    }

    /// The default catalog: national ID and SCE license required, the rest optional.
    pub fn standard() -> Self {
        let images = || vec!["pdf".into(), "jpg".into(), "jpeg".into(), "png".into()];
        let pdf = || vec!["pdf".to_string()];
        let doc = |id: &str, name: &str, formats: Vec<String>, max: u64, required: bool| {
            DocumentType {
                id: DocumentTypeId::new(id).unwrap_or_else(|_| unreachable!("static id {id}")),
                name: name.to_string(),
                accepted_formats: formats,
                max_size_bytes: max,
                required,
            }
        };
        Self {
            documents: vec![
                doc("national_id", "National ID", images(), 5 * MIB, true),
                doc("sce_license", "SCE professional license", images(), 5 * MIB, true),
                doc("passport", "Passport", images(), 5 * MIB, false),
                doc("academic_certificate", "Academic certificate", pdf(), 10 * MIB, false),
                doc("experience_certificate", "Experience certificate", pdf(), 10 * MIB, false),
            ],
        }
    }

    pub fn get(&self, id: &DocumentTypeId) -> Option<&DocumentType> {
        self.documents.iter().find(|d| &d.id == id)
    }

    /// Look up by raw string id; malformed ids simply are not found.
    pub fn find(&self, raw: &str) -> Option<&DocumentType> {
        self.documents.iter().find(|d| d.id.as_str() == raw)
    }

    pub fn contains(&self, id: &DocumentTypeId) -> bool {
        self.get(id).is_some()
    }

    pub fn required(&self) -> impl Iterator<Item = &DocumentType> {
        self.documents.iter().filter(|d| d.required)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentType> {
        self.documents.iter()
    }
}

impl Default for DocumentTypeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_six_ordered_steps() {
        let catalog = StepCatalog::STANDARD;
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.get(0).unwrap().id, StepId::PersonalInfo);
        assert_eq!(catalog.get(catalog.last_index()).unwrap().id, StepId::BackgroundCheck);
        for (i, id) in StepId::ALL.into_iter().enumerate() {
            assert_eq!(catalog.index_of(id), Some(i));
        }
    }

    #[test]
    fn standard_documents_require_id_and_license() {
        let docs = DocumentTypeCatalog::standard();
        let required: Vec<_> = docs.required().map(|d| d.id.as_str()).collect();
        assert_eq!(required, vec!["national_id", "sce_license"]);
    }

    #[test]
    fn duplicate_document_ids_rejected() {
        let mut docs: Vec<_> = DocumentTypeCatalog::standard().iter().cloned().collect();
        docs.push(docs[0].clone());
        assert!(matches!(
            DocumentTypeCatalog::new(docs),
            Err(WorkflowError::DuplicateDocumentType(_))
        ));
    }

    #[test]
    fn format_match_ignores_case_and_dot() {
        let docs = DocumentTypeCatalog::standard();
        let passport = docs.find("passport").unwrap();
        assert!(passport.accepts_format("PDF"));
        assert!(passport.accepts_format(".png"));
        assert!(!passport.accepts_format("gif"));
    }
}

//! Document selection state and upload acknowledgements.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use kyc_types::DocumentTypeId;

use crate::catalog::DocumentTypeCatalog;
use crate::error::WorkflowError;

/// Result of a [`DocumentSelectionSet::toggle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// The set of document types the user has chosen to provide.
///
/// Set semantics: a document is either selected or not; order is irrelevant
/// and iteration is sorted by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSelectionSet(BTreeSet<DocumentTypeId>);

impl FromIterator<DocumentTypeId> for DocumentSelectionSet {
    fn from_iter<I: IntoIterator<Item = DocumentTypeId>>(ids: I) -> Self {
        Self(ids.into_iter().collect())
    }
}

impl DocumentSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `raw_id` if absent, deselect it if present.
    ///
    /// Ids not in the catalog are reported as [`WorkflowError::UnknownDocument`]
    /// and leave the set untouched.
    pub fn toggle(
        &mut self,
        raw_id: &str,
        catalog: &DocumentTypeCatalog,
    ) -> Result<Toggle, WorkflowError> {
        let doc = catalog
            .find(raw_id)
            .ok_or_else(|| WorkflowError::UnknownDocument(raw_id.to_string()))?;
        if self.0.remove(&doc.id) {
            Ok(Toggle::Deselected)
        } else {
            self.0.insert(doc.id.clone());
            Ok(Toggle::Selected)
        }
    }

    pub fn contains(&self, id: &DocumentTypeId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentTypeId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every required document of the catalog is selected.
    pub fn is_complete(&self, catalog: &DocumentTypeCatalog) -> bool {
        catalog.required().all(|d| self.0.contains(&d.id))
    }

    /// Required documents not yet selected, in catalog order.
    pub fn missing_required(&self, catalog: &DocumentTypeCatalog) -> Vec<DocumentTypeId> {
        catalog
            .required()
            .filter(|d| !self.0.contains(&d.id))
            .map(|d| d.id.clone())
            .collect()
    }
}

/// Acknowledgement from the document-storage collaborator that a file was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentUploadAck {
    pub doc_id: DocumentTypeId,
    /// Opaque reference returned by the storage collaborator.
    pub storage_ref: String,
    /// File extension of the stored file.
    pub format: String,
    pub size_bytes: u64,
}

impl DocumentUploadAck {
    /// Check the ack against its descriptor: known type, non-empty reference,
    /// accepted format, size within limit.
    pub fn check_against(&self, catalog: &DocumentTypeCatalog) -> Result<(), WorkflowError> {
        let doc = catalog
            .get(&self.doc_id)
            .ok_or_else(|| WorkflowError::UnknownDocument(self.doc_id.to_string()))?;
        let reject = |reason: String| WorkflowError::DocumentRejected {
            doc: self.doc_id.clone(),
            reason,
        };
        if self.storage_ref.trim().is_empty() {
            return Err(reject("empty storage reference".into()));
        }
        if !doc.accepts_format(&self.format) {
            return Err(reject(format!(
                "format {:?} not in {:?}",
                self.format, doc.accepted_formats
            )));
        }
        if self.size_bytes == 0 || self.size_bytes > doc.max_size_bytes {
            return Err(reject(format!(
                "size {} bytes outside 1..={}",
                self.size_bytes, doc.max_size_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DocumentTypeId {
        DocumentTypeId::new(s).unwrap()
    }

    #[test]
    fn toggle_adds_then_removes() {
        let catalog = DocumentTypeCatalog::standard();
        let mut set = DocumentSelectionSet::new();
        assert_eq!(set.toggle("passport", &catalog).unwrap(), Toggle::Selected);
        assert!(set.contains(&id("passport")));
        assert_eq!(set.toggle("passport", &catalog).unwrap(), Toggle::Deselected);
        assert!(set.is_empty());
    }

    #[test]
    fn unknown_id_is_an_error_and_a_noop() {
        let catalog = DocumentTypeCatalog::standard();
        let mut set = DocumentSelectionSet::new();
        set.toggle("national_id", &catalog).unwrap();
        let before = set.clone();
        let err = set.toggle("driver_license", &catalog).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownDocument(ref s) if s == "driver_license"));
        assert_eq!(set, before);
    }

    #[test]
    fn only_national_id_is_incomplete() {
        let catalog = DocumentTypeCatalog::standard();
        let mut set = DocumentSelectionSet::new();
        set.toggle("national_id", &catalog).unwrap();
        assert!(!set.is_complete(&catalog));
        assert_eq!(set.missing_required(&catalog), vec![id("sce_license")]);

        set.toggle("sce_license", &catalog).unwrap();
        assert!(set.is_complete(&catalog));
    }

    #[test]
    fn optional_documents_do_not_affect_completeness() {
        let catalog = DocumentTypeCatalog::standard();
        let mut set = DocumentSelectionSet::new();
        set.toggle("passport", &catalog).unwrap();
        set.toggle("academic_certificate", &catalog).unwrap();
        assert!(!set.is_complete(&catalog));
        assert_eq!(set.missing_required(&catalog).len(), 2);
    }

    #[test]
    fn upload_ack_checks_descriptor() {
        let catalog = DocumentTypeCatalog::standard();
        let ok = DocumentUploadAck {
            doc_id: id("academic_certificate"),
            storage_ref: "s3://bucket/a.pdf".into(),
            format: "pdf".into(),
            size_bytes: 1024,
        };
        assert!(ok.check_against(&catalog).is_ok());

        let mut wrong_format = ok.clone();
        wrong_format.format = "png".into();
        assert!(matches!(
            wrong_format.check_against(&catalog),
            Err(WorkflowError::DocumentRejected { .. })
        ));

        let mut too_big = ok.clone();
        too_big.size_bytes = 11 * 1024 * 1024;
        assert!(too_big.check_against(&catalog).is_err());

        let mut no_ref = ok;
        no_ref.storage_ref = "  ".into();
        assert!(no_ref.check_against(&catalog).is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// What the file picker or drop zone hands over for each selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Image,
    #[serde(rename = "PDF")]
    Pdf,
    Document,
}

impl DocumentKind {
    /// Images win over PDFs, which win over everything else.
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            DocumentKind::Image
        } else if essence == "application/pdf" {
            DocumentKind::Pdf
        } else {
            DocumentKind::Document
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Image => "Image",
            DocumentKind::Pdf => "PDF",
            DocumentKind::Document => "Document",
        })
    }
}

/// Catalog entry for one uploaded file. The bytes themselves never reach us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub kind: DocumentKind,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedDocument {
    /// Size in mebibytes with two decimals, e.g. `1.00 MB`.
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

pub fn format_size(size_bytes: u64) -> String {
    format!("{:.2} MB", size_bytes as f64 / BYTES_PER_MIB)
}

/// Uploaded documents in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct DocumentCatalog {
    documents: Vec<UploadedDocument>,
}

impl DocumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: FileDescriptor) -> UploadedDocument {
        let document = UploadedDocument {
            id: Uuid::new_v4(),
            kind: DocumentKind::from_mime(&file.mime_type),
            name: file.name,
            size_bytes: file.size_bytes,
            uploaded_at: Utc::now(),
        };
        debug!(
            document_id = %document.id,
            name = %document.name,
            kind = %document.kind,
            size = %document.size_display(),
            "Document added to catalog"
        );
        self.documents.push(document.clone());
        document
    }

    /// Adds a whole selection, preserving selection order.
    pub fn add_batch<I>(&mut self, files: I) -> Vec<UploadedDocument>
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        let added: Vec<_> = files.into_iter().map(|file| self.add(file)).collect();
        info!(count = added.len(), total = self.documents.len(), "Documents uploaded");
        added
    }

    /// Removing an id that is not in the catalog is a no-op.
    pub fn remove(&mut self, id: &Uuid) -> Option<UploadedDocument> {
        let position = self.documents.iter().position(|d| &d.id == id)?;
        let removed = self.documents.remove(position);
        info!(document_id = %id, name = %removed.name, "Document removed from catalog");
        Some(removed)
    }

    pub fn get(&self, id: &Uuid) -> Option<&UploadedDocument> {
        self.documents.iter().find(|d| &d.id == id)
    }

    pub fn list(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.documents.iter().map(|d| d.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_mime_type() {
        assert_eq!(DocumentKind::from_mime("image/png"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_mime("IMAGE/JPEG"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_mime("application/pdf"), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::from_mime("application/pdf; charset=binary"),
            DocumentKind::Pdf
        );
        assert_eq!(DocumentKind::from_mime("application/dicom"), DocumentKind::Document);
        assert_eq!(DocumentKind::from_mime(""), DocumentKind::Document);
    }

    #[test]
    fn formats_size_in_mebibytes() {
        assert_eq!(format_size(1_048_576), "1.00 MB");
        assert_eq!(format_size(0), "0.00 MB");
        assert_eq!(format_size(2_621_440), "2.50 MB");
        assert_eq!(format_size(5_000), "0.00 MB");
    }

    #[test]
    fn add_then_remove_restores_catalog() {
        let mut catalog = DocumentCatalog::new();
        catalog.add(FileDescriptor::new("xray.png", 2048, "image/png"));
        let before: Vec<_> = catalog.list().to_vec();

        let added = catalog.add(FileDescriptor::new("labs.pdf", 1_048_576, "application/pdf"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(added.kind, DocumentKind::Pdf);
        assert_eq!(added.size_display(), "1.00 MB");
        assert_eq!(catalog.get(&added.id), Some(&added));

        let removed = catalog.remove(&added.id);
        assert_eq!(removed.map(|d| d.id), Some(added.id));
        assert_eq!(catalog.list(), before.as_slice());
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut catalog = DocumentCatalog::new();
        catalog.add(FileDescriptor::new("notes.docx", 10, "application/msword"));

        assert!(catalog.remove(&Uuid::new_v4()).is_none());
        assert_eq!(catalog.len(), 1);

        let id = catalog.list()[0].id;
        assert!(catalog.remove(&id).is_some());
        assert!(catalog.remove(&id).is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn batch_preserves_selection_order_and_unique_ids() {
        let mut catalog = DocumentCatalog::new();
        let names = ["a.png", "b.pdf", "c.txt", "d.jpg"];
        let added = catalog.add_batch(
            names
                .iter()
                .map(|name| FileDescriptor::new(*name, 100, "application/octet-stream")),
        );

        let listed: Vec<_> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(listed, names);
        assert_eq!(added.len(), names.len());
        assert_eq!(catalog.total_size_bytes(), 400);

        let mut ids: Vec<_> = catalog.list().iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), names.len());
    }
}

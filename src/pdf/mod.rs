//! Loading and saving documents as PDF files.
//!
//! The pipeline works on [`Document`] values only. A [`DocumentStore`]
//! is the seam between that model and files on disk, so the file-level
//! service can be exercised with an in-memory store in tests.

pub mod patch;
pub mod reader;
pub mod writer;

use crate::document::Document;
use crate::error::{AnonymizerError, AnonymizerResult};
use std::path::Path;
use tracing::debug;

/// Loads documents from, and persists documents to, a path.
pub trait DocumentStore: Send + Sync {
    /// Reads a document into the page/block model.
    fn load(&self, path: &Path) -> AnonymizerResult<Document>;

    /// Writes a document, replacing any file at `path`.
    fn save(&self, document: &Document, path: &Path) -> AnonymizerResult<()>;

    /// Flat text of the whole file.
    fn extract_text(&self, path: &Path) -> AnonymizerResult<String>;

    /// Returns a human-readable name for this store.
    fn name(&self) -> &str;
}

/// Reads with MuPDF and extracts flat text with pdf-extract.
///
/// A document read from a PDF is saved by patching that file (see
/// [`patch`]), which keeps figures and fonts. Anything else is re-rendered
/// from its text with printpdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct MuPdfStore;

impl MuPdfStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for MuPdfStore {
    fn load(&self, path: &Path) -> AnonymizerResult<Document> {
        reader::read_document(path)
    }

    fn save(&self, document: &Document, path: &Path) -> AnonymizerResult<()> {
        if patch::can_patch(document) {
            patch::patch_document(document, path)
        } else {
            debug!(output = %path.display(), "re-rendering document from text");
            writer::write_document(document, path)
        }
    }

    fn extract_text(&self, path: &Path) -> AnonymizerResult<String> {
        extract_text_from_pdf(path)
    }

    fn name(&self) -> &str {
        "MuPDF"
    }
}

/// Extracts the text of a PDF file with pdf-extract.
pub fn extract_text_from_pdf(path: &Path) -> AnonymizerResult<String> {
    let bytes = std::fs::read(path).map_err(|e| AnonymizerError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| AnonymizerError::Extraction {
        page: None,
        reason: format!("{}: {}", path.display(), e),
    })
}

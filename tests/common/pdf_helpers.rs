//! PDF inspection helpers and an in-memory document store.

use anonymizer::document::Document;
use anonymizer::{AnonymizerError, AnonymizerResult, DocumentStore};
use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Extracts text from a PDF safely, returning an error instead of panicking.
pub fn extract_text(pdf_path: &Path) -> Result<String> {
    anonymizer::extract_text_from_pdf(pdf_path)
        .map_err(|e| anyhow::anyhow!("Failed to extract text: {}", e))
}

/// Checks if a PDF contains all of the given patterns.
pub fn pdf_contains_all(pdf_path: &Path, patterns: &[&str]) -> Result<bool> {
    let text = extract_text(pdf_path)?;
    Ok(patterns.iter().all(|p| text.contains(p)))
}

/// Number of pages, read with lopdf.
pub fn pdf_page_count(pdf_path: &Path) -> Result<usize> {
    Ok(::lopdf::Document::load(pdf_path)?.get_pages().len())
}

fn page_id(pdf: &::lopdf::Document, page_number: u32) -> Result<::lopdf::ObjectId> {
    pdf.get_pages()
        .get(&page_number)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no page {}", page_number))
}

/// Whether the page's content fills or strokes a rectangle with exactly
/// these `re` operands.
pub fn page_has_rect(pdf_path: &Path, page_number: u32, rect: [f32; 4]) -> Result<bool> {
    let pdf = ::lopdf::Document::load(pdf_path)?;
    let content = pdf.get_page_content(page_id(&pdf, page_number)?)?;
    let content = ::lopdf::content::Content::decode(&content)?;
    Ok(content.operations.iter().any(|op| {
        op.operator == "re"
            && op.operands.len() == 4
            && op
                .operands
                .iter()
                .zip(rect)
                .all(|(o, v)| o.as_float().is_ok_and(|f| (f - v).abs() < 0.01))
    }))
}

/// Number of fonts the page's resources make available.
pub fn page_font_count(pdf_path: &Path, page_number: u32) -> Result<usize> {
    let pdf = ::lopdf::Document::load(pdf_path)?;
    Ok(pdf.get_page_fonts(page_id(&pdf, page_number)?).len())
}

/// Document store keeping documents in memory, keyed by path.
///
/// A placeholder file is written for every stored path so that input
/// validation sees it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<PathBuf, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &Path, document: Document) -> Result<()> {
        std::fs::write(path, b"")?;
        self.documents
            .lock()
            .expect("store lock poisoned")
            .insert(path.to_path_buf(), document);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<Document> {
        self.documents
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .cloned()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, path: &Path) -> AnonymizerResult<Document> {
        self.get(path)
            .ok_or_else(|| AnonymizerError::not_found(path.display().to_string()))
    }

    fn save(&self, document: &Document, path: &Path) -> AnonymizerResult<()> {
        std::fs::write(path, b"").map_err(|e| AnonymizerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.documents
            .lock()
            .expect("store lock poisoned")
            .insert(path.to_path_buf(), document.clone());
        Ok(())
    }

    fn extract_text(&self, path: &Path) -> AnonymizerResult<String> {
        self.load(path).map(|d| d.text())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

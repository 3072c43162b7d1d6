//! PDF → [`Document`] via MuPDF's structured text.
//!
//! Pages remember their index in the file and characters their
//! horizontal extent, so edits can later be burned into the same file.

use crate::document::{Document, Page, PageBlock, Rect, TextLine};
use crate::error::{AnonymizerError, AnonymizerResult};
use mupdf::{Document as MuDocument, TextPageFlags};
use std::path::Path;
use tracing::debug;

/// Typical line height divided by font size.
const LINE_HEIGHT_RATIO: f32 = 1.15;

/// Loads every page of the PDF at `path` as positioned text blocks.
pub fn read_document(path: &Path) -> AnonymizerResult<Document> {
    let path_str = path.to_str().ok_or_else(|| {
        AnonymizerError::invalid_input("input", "Path contains invalid UTF-8")
    })?;

    let doc = MuDocument::open(path_str).map_err(|e| AnonymizerError::PdfProcessing {
        message: "Failed to open PDF with MuPDF".to_string(),
        page: None,
        source: Some(Box::new(e)),
    })?;

    let page_count = doc.page_count().map_err(|e| AnonymizerError::BackendError {
        backend: "MuPDF".to_string(),
        message: format!("Failed to get page count: {}", e),
        source: Some(Box::new(e)),
    })?;

    let mut pages = Vec::with_capacity(page_count.max(0) as usize);
    for page_idx in 0..page_count {
        let page_number = page_idx as usize + 1;
        let page = doc
            .load_page(page_idx)
            .map_err(|e| AnonymizerError::PdfProcessing {
                message: format!("Failed to load page {}", page_number),
                page: Some(page_number),
                source: Some(Box::new(e)),
            })?;

        let bounds = page.bounds().map_err(|e| AnonymizerError::BackendError {
            backend: "MuPDF".to_string(),
            message: format!("Failed to get bounds for page {}", page_number),
            source: Some(Box::new(e)),
        })?;

        let text_page = page
            .to_text_page(TextPageFlags::empty())
            .map_err(|e| AnonymizerError::Extraction {
                page: Some(page_number),
                reason: e.to_string(),
            })?;

        let mut blocks = Vec::new();
        for block in text_page.blocks() {
            let mut lines = Vec::new();
            for line in block.lines() {
                let mut text = String::new();
                let mut glyphs = Vec::new();
                for c in line.chars() {
                    let Some(ch) = c.char() else { continue };
                    let quad = c.quad();
                    let x0 = quad.ul.x.min(quad.ll.x).min(quad.ur.x).min(quad.lr.x);
                    let x1 = quad.ul.x.max(quad.ll.x).max(quad.ur.x).max(quad.lr.x);
                    text.push(ch);
                    glyphs.push((x0 - bounds.x0, x1 - bounds.x0));
                }
                if text.trim().is_empty() {
                    continue;
                }
                let b = line.bounds();
                let rect = Rect::new(
                    b.x0 - bounds.x0,
                    b.y0 - bounds.y0,
                    b.x1 - bounds.x0,
                    b.y1 - bounds.y0,
                );
                let font_size = rect.height() / LINE_HEIGHT_RATIO;
                lines.push(TextLine::new(rect, text, font_size).with_glyphs(glyphs));
            }
            if !lines.is_empty() {
                blocks.push(PageBlock::from_lines(lines));
            }
        }

        debug!(page = page_number, blocks = blocks.len(), "read page");
        pages.push(
            Page::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0, blocks)
                .with_source_index(page_idx as usize),
        );
    }

    Ok(Document::new(pages).with_source(path))
}

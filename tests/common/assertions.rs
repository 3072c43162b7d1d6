//! Custom assertions for anonymization testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use anonymizer::document::{Document, HeaderRegion};
use std::path::Path;

/// Asserts that none of `values` can be found in the header region of page
/// one.
///
/// # Panics
/// Panics listing every value still present.
pub fn assert_header_clean(document: &Document, fraction: f32, values: &[&str]) {
    let page = document
        .first_page()
        .unwrap_or_else(|| panic!("document has no pages"));
    let region = HeaderRegion::new(page, fraction);
    let found: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !page.find(v, &region).is_empty())
        .collect();
    assert!(
        found.is_empty(),
        "The following values should be redacted but were found: {:?}",
        found
    );
}

/// Asserts that a pattern has been successfully redacted from a PDF.
///
/// # Panics
/// Panics if the pattern is still found in the PDF text.
pub fn assert_redacted(pdf_path: &Path, pattern: &str) {
    let text = extract_text_or_panic(pdf_path);
    assert!(
        !text.contains(pattern),
        "Pattern '{}' should be redacted but was found in output PDF at '{}'.\nExtracted text length: {} chars",
        pattern,
        pdf_path.display(),
        text.len()
    );
}

/// Asserts that a pattern has been preserved (not redacted) in a PDF.
///
/// # Panics
/// Panics if the pattern is not found in the PDF.
pub fn assert_preserved(pdf_path: &Path, pattern: &str) {
    let text = extract_text_or_panic(pdf_path);
    assert!(
        text.contains(pattern),
        "Pattern '{}' should be preserved but was not found in PDF at '{}'",
        pattern,
        pdf_path.display()
    );
}

/// Asserts that a PDF exists, is non-empty and parses.
///
/// # Panics
/// Panics if the PDF appears to be empty or corrupted.
pub fn assert_valid_pdf(pdf_path: &Path) {
    assert!(
        pdf_path.exists(),
        "PDF should exist at '{}'",
        pdf_path.display()
    );
    let metadata = std::fs::metadata(pdf_path).expect("Failed to get PDF metadata");
    assert!(
        metadata.len() > 0,
        "PDF should not be empty at '{}'",
        pdf_path.display()
    );
    assert!(
        ::lopdf::Document::load(pdf_path).is_ok(),
        "PDF should parse at '{}'",
        pdf_path.display()
    );
}

fn extract_text_or_panic(pdf_path: &Path) -> String {
    anonymizer::extract_text_from_pdf(pdf_path)
        .unwrap_or_else(|e| panic!("Failed to extract text from PDF '{}': {}", pdf_path.display(), e))
}

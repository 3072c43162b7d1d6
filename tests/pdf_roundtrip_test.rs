//! PDF-backed tests: printpdf fixtures read with MuPDF, patched in place
//! with MuPDF redactions and lopdf, and checked with pdf-extract and lopdf.

mod common;

use anonymizer::{AnonymizationService, AnonymizerConfig, EncryptionKey, FieldFlags, Mapping};
use anyhow::Result;
use common::*;
use std::sync::Mutex;
use tempfile::TempDir;

// MuPDF font initialization is not thread-safe, so tests touching it run
// one at a time
static MUPDF_LOCK: Mutex<()> = Mutex::new(());

macro_rules! with_mupdf_lock {
    ($body:expr) => {{
        let _guard = MUPDF_LOCK.lock().expect("MuPDF lock poisoned");
        $body
    }};
}

fn service(config: AnonymizerConfig) -> Result<AnonymizationService> {
    Ok(AnonymizationService::with_mupdf(
        config,
        EncryptionKey::from_passphrase("pdf-roundtrip"),
    )?)
}

#[test]
fn test_fixture_is_readable() -> Result<()> {
    let temp = TempDir::new()?;
    let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;

    assert_valid_pdf(&input);
    assert!(pdf_contains_all(&input, &SMITH_VALUES)?);
    Ok(())
}

#[test]
fn test_scan_pdf_header() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;

        let records = service(AnonymizerConfig::default())?.scan(&input)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email.as_deref(), Some("jsmith@example.edu"));
        Ok(())
    })
}

#[test]
fn test_anonymize_and_restore_pdf() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;
        let anonymized = temp.path().join("paper.anon.pdf");
        let restored = temp.path().join("paper.restored.pdf");
        let mapping_path = temp.path().join("paper.mapping.json");

        let service = service(AnonymizerConfig::default())?;
        let result = service.anonymize(&input, &anonymized, FieldFlags::default())?;
        result.mapping.save(&mapping_path)?;

        assert_valid_pdf(&anonymized);
        for value in SMITH_VALUES {
            assert_redacted(&anonymized, value);
        }
        assert_preserved(&anonymized, "Introduction");

        let mapping = Mapping::load(&mapping_path)?;
        let restore = service.restore(&anonymized, &restored, &mapping)?;
        assert!(restore.failures.is_empty(), "{:?}", restore.failures);

        assert_valid_pdf(&restored);
        for value in SMITH_VALUES {
            assert_preserved(&restored, value);
        }
        Ok(())
    })
}

#[test]
fn test_embedded_info_page_pdf() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = create_smith_pdf(&temp.path().join("paper.pdf"))?;
        let anonymized = temp.path().join("paper.anon.pdf");
        let restored = temp.path().join("paper.restored.pdf");

        let service = service(AnonymizerConfig {
            append_info_page: true,
            ..Default::default()
        })?;
        service.anonymize(&input, &anonymized, FieldFlags::default())?;

        assert_eq!(pdf_page_count(&anonymized)?, 2);
        assert_preserved(&anonymized, "ENCRYPTED INFORMATION");

        let restore = service.restore_embedded(&anonymized, &restored)?;
        assert!(restore.failures.is_empty(), "{:?}", restore.failures);
        assert_eq!(pdf_page_count(&restored)?, 1);
        assert_preserved(&restored, "John Smith");
        Ok(())
    })
}

#[test]
fn test_patched_output_keeps_figures_and_fonts() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = PaperPdfBuilder::new()
            .with_header_line(SMITH_HEADER)
            .with_body("1 Introduction")
            .with_page(&["Figure 1"])
            .with_figure()
            .build(&temp.path().join("paper.pdf"))?;
        let output = temp.path().join("paper.anon.pdf");
        assert!(page_has_rect(&input, 2, FIGURE_RECT)?);

        let config = AnonymizerConfig {
            redaction_pad: 2.0,
            ..Default::default()
        };
        service(config)?.anonymize(&input, &output, FieldFlags::default())?;

        for value in SMITH_VALUES {
            assert_redacted(&output, value);
        }
        assert_preserved(&output, "Introduction");
        assert_eq!(pdf_page_count(&output)?, 2);
        assert!(page_has_rect(&output, 2, FIGURE_RECT)?);
        // The paper's own font plus the one used for markers
        assert!(page_font_count(&output, 1)? >= 2);
        Ok(())
    })
}

#[test]
fn test_two_authors_on_one_header_line_pdf() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = PaperPdfBuilder::new()
            .with_header_line("Alice Brown alice@uni.edu Bob Green bob@uni.edu")
            .with_body("1 Introduction")
            .build(&temp.path().join("paper.pdf"))?;
        let output = temp.path().join("paper.anon.pdf");

        let result =
            service(AnonymizerConfig::default())?.anonymize(&input, &output, FieldFlags::default())?;
        assert!(result.mapping.sensitive_data_found.name);
        for value in ["Alice Brown", "Bob Green", "alice@uni.edu", "bob@uni.edu"] {
            assert_redacted(&output, value);
        }
        Ok(())
    })
}

#[test]
fn test_text_below_header_is_kept() -> Result<()> {
    with_mupdf_lock!({
        let temp = TempDir::new()?;
        let input = PaperPdfBuilder::new()
            .with_title("On Reversible Redaction")
            .with_header_line(SMITH_HEADER)
            .with_body("Contact jsmith@example.edu for the artifact")
            .build(&temp.path().join("paper.pdf"))?;
        let output = temp.path().join("out.pdf");

        service(AnonymizerConfig::default())?.anonymize(&input, &output, FieldFlags::default())?;

        // Only the header occurrence is redacted
        assert_preserved(&output, "On Reversible Redaction");
        assert_preserved(&output, "jsmith@example.edu");
        Ok(())
    })
}

#[test]
fn test_extract_text() -> Result<()> {
    let temp = TempDir::new()?;
    let input = PaperPdfBuilder::new()
        .with_header_line("Ada Lovelace")
        .with_page(&["Appendix"])
        .build(&temp.path().join("paper.pdf"))?;

    let text = service(AnonymizerConfig::default())?.extract_text(&input)?;
    assert!(text.contains("Ada Lovelace"));
    assert!(text.contains("Appendix"));
    assert_eq!(pdf_page_count(&input)?, 2);
    Ok(())
}

//! Reversible de-identification of author metadata in academic-paper PDFs.
//!
//! Names, emails, affiliations, titles and addresses in the header of page
//! one are detected with pattern heuristics, encrypted into a mapping and
//! replaced in place with redaction markers. Given the mapping (or the
//! ENCRYPTED INFORMATION page appended to the document) the original
//! values can later be written back.
//!
//! # Features
//!
//! - **Heuristic extraction**: pluggable matcher strategies for names,
//!   emails, affiliations, titles and addresses
//! - **Reversible encryption**: AES-256-CBC with a fresh IV per field, or
//!   SHA-256 for fields that must not be recoverable
//! - **Overlap-safe redaction**: longest values first, covered regions
//!   never redacted twice
//! - **Partial reversal**: one corrupt field never blocks the others
//!
//! # Architecture
//!
//! - [`document`]: in-memory page/block model
//! - [`domain`]: sensitive-field heuristics
//! - [`crypto`]: field codec
//! - [`redaction`]: redaction plans and engine
//! - [`mapping`]: the encrypted mapping and its embedded-page form
//! - [`reversal`]: re-identification
//! - [`pipeline`]: in-memory de-/re-identification
//! - [`pdf`] and [`service`]: PDF files on disk
//! - [`error`]: error handling
//!
//! # Quick Start
//!
//! ```no_run
//! use anonymizer::{AnonymizationService, AnonymizerConfig, EncryptionKey, FieldFlags};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = EncryptionKey::from_env()?;
//! let service = AnonymizationService::with_mupdf(AnonymizerConfig::default(), key)?;
//!
//! let result = service.anonymize(
//!     Path::new("paper.pdf"),
//!     Path::new("paper.anon.pdf"),
//!     FieldFlags::default(),
//! )?;
//! result.mapping.save(Path::new("paper.mapping.json"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Examples
//!
//! ## In-memory round trip
//!
//! ```
//! use anonymizer::document::{Document, Page, LETTER_HEIGHT, LETTER_WIDTH};
//! use anonymizer::{Anonymizer, AnonymizerConfig, EncryptionKey, FieldFlags};
//!
//! let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
//!     .line("John Smith jsmith@example.edu Dept. of Computer Science", 10.0)
//!     .build();
//! let document = Document::new(vec![page]);
//!
//! let anonymizer =
//!     Anonymizer::new(AnonymizerConfig::default(), EncryptionKey::from_passphrase("secret")).unwrap();
//! let out = anonymizer.deidentify(&document, FieldFlags::default()).unwrap();
//! assert!(!out.document.text().contains("John Smith"));
//!
//! let back = anonymizer.reidentify(&out.document, &out.mapping).unwrap();
//! assert_eq!(back.document, document);
//! ```

// Public API
pub mod config;
pub mod crypto;
pub mod document;
pub mod domain;
pub mod error;
pub mod mapping;
pub mod pdf;
pub mod pipeline;
pub mod redaction;
pub mod reversal;
pub mod service;

// Re-exports for convenient access
pub use config::{AnonymizerConfig, EncryptionKey, KEY_ENV_VAR};
pub use crypto::FieldCodec;
pub use domain::{AuthorRecord, FieldKind, FieldMatcher, SensitiveFieldExtractor};
pub use error::{AnonymizerError, AnonymizerResult, CodecError};
pub use mapping::{Algorithm, EncryptedField, FieldFlags, Mapping};
pub use pdf::{extract_text_from_pdf, DocumentStore, MuPdfStore};
pub use pipeline::{Anonymizer, DeidentifyOutcome};
pub use redaction::{MarkerStyle, RedactionEngine, RedactionPlan, RedactionReport};
pub use reversal::{FailureReason, FieldFailure, ReidentifyOutcome, ReversalEngine};
pub use service::{AnonymizationService, AnonymizeResult, DocumentLocks, RestoreResult};

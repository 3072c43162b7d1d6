//! File-level anonymization service.
//!
//! Wraps the in-memory [`Anonymizer`] with a [`DocumentStore`], input
//! validation and per-document serialization: two operations on the same
//! input path never run at the same time within one service.

use crate::config::{AnonymizerConfig, EncryptionKey};
use crate::domain::AuthorRecord;
use crate::error::{AnonymizerError, AnonymizerResult};
use crate::mapping::{FieldFlags, Mapping};
use crate::pdf::{DocumentStore, MuPdfStore};
use crate::pipeline::{Anonymizer, DeidentifyOutcome};
use crate::redaction::RedactionReport;
use crate::reversal::{FieldFailure, ReidentifyOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// One lock per document path.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `path`.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

/// Summary of a file-level de-identification.
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymizeResult {
    pub mapping: Mapping,
    pub report: RedactionReport,
    pub pages_written: usize,
}

/// Summary of a file-level re-identification.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreResult {
    pub applied: usize,
    pub failures: Vec<FieldFailure>,
    pub pages_written: usize,
}

impl From<(ReidentifyOutcome, usize)> for RestoreResult {
    fn from((outcome, pages_written): (ReidentifyOutcome, usize)) -> Self {
        Self {
            applied: outcome.applied,
            failures: outcome.failures,
            pages_written,
        }
    }
}

/// Anonymization service coordinating a document store and the pipeline.
pub struct AnonymizationService {
    store: Box<dyn DocumentStore>,
    anonymizer: Anonymizer,
    locks: DocumentLocks,
}

impl AnonymizationService {
    /// Creates a service over the given store.
    pub fn new(store: Box<dyn DocumentStore>, anonymizer: Anonymizer) -> Self {
        Self {
            store,
            anonymizer,
            locks: DocumentLocks::new(),
        }
    }

    /// Creates a service backed by MuPDF, lopdf and printpdf.
    pub fn with_mupdf(config: AnonymizerConfig, key: EncryptionKey) -> AnonymizerResult<Self> {
        Ok(Self::new(
            Box::new(MuPdfStore::new()),
            Anonymizer::new(config, key)?,
        ))
    }

    pub fn anonymizer(&self) -> &Anonymizer {
        &self.anonymizer
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// De-identifies `input` into `output` and returns the mapping.
    ///
    /// When nothing is found the output is still written, unchanged, and
    /// the result carries an empty mapping.
    pub fn anonymize(
        &self,
        input: &Path,
        output: &Path,
        options: FieldFlags,
    ) -> AnonymizerResult<AnonymizeResult> {
        validate_input(input)?;
        if !options.any() {
            return Err(AnonymizerError::invalid_input(
                "options",
                "No field kinds enabled",
            ));
        }

        self.locks.with_lock(input, || {
            let document = self.store.load(input)?;
            let DeidentifyOutcome {
                document,
                mapping,
                report,
            } = self.anonymizer.deidentify(&document, options)?;
            self.store.save(&document, output)?;
            info!(input = %input.display(), output = %output.display(), "anonymized");
            Ok(AnonymizeResult {
                mapping,
                report,
                pages_written: document.page_count(),
            })
        })
    }

    /// Re-identifies `input` into `output` with an explicit mapping.
    pub fn restore(
        &self,
        input: &Path,
        output: &Path,
        mapping: &Mapping,
    ) -> AnonymizerResult<RestoreResult> {
        validate_input(input)?;
        self.locks.with_lock(input, || {
            let document = self.store.load(input)?;
            let outcome = self.anonymizer.reidentify(&document, mapping)?;
            self.store.save(&outcome.document, output)?;
            let pages = outcome.document.page_count();
            Ok((outcome, pages).into())
        })
    }

    /// Re-identifies `input` using its embedded ENCRYPTED INFORMATION page.
    pub fn restore_embedded(&self, input: &Path, output: &Path) -> AnonymizerResult<RestoreResult> {
        validate_input(input)?;
        self.locks.with_lock(input, || {
            let document = self.store.load(input)?;
            let outcome = self.anonymizer.reidentify_embedded(&document)?;
            self.store.save(&outcome.document, output)?;
            let pages = outcome.document.page_count();
            Ok((outcome, pages).into())
        })
    }

    /// Detected author records in `input`.
    pub fn scan(&self, input: &Path) -> AnonymizerResult<Vec<AuthorRecord>> {
        validate_input(input)?;
        self.locks.with_lock(input, || {
            let document = self.store.load(input)?;
            self.anonymizer.scan(&document)
        })
    }

    /// Extracts text from a PDF for analysis.
    pub fn extract_text(&self, input: &Path) -> AnonymizerResult<String> {
        validate_input(input)?;
        self.store.extract_text(input)
    }
}

fn validate_input(input: &Path) -> AnonymizerResult<()> {
    if !input.exists() {
        return Err(AnonymizerError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "Input file does not exist"),
        });
    }
    Ok(())
}

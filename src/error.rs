//! Error types for the anonymization pipeline.
//!
//! Document-level failures (missing file, undecodable page) abort an
//! operation. Field-level failures (a corrupt token) are carried as
//! [`CodecError`] values inside per-field results instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for anonymizer operations.
pub type AnonymizerResult<T> = Result<T, AnonymizerError>;

/// Failures of the reversible codec.
///
/// These are recoverable per field: the reversal engine records them and
/// moves on to the next field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Token is not `hex(iv):hex(ciphertext)`
    #[error("malformed token: {reason}")]
    MalformedToken { reason: String },

    /// PKCS#7 padding did not verify after decryption
    #[error("invalid padding (wrong key or tampered ciphertext)")]
    Padding,

    /// Decrypted bytes are not UTF-8
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }
}

/// Error type for all anonymizer operations.
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// A page could not be decoded into positioned text
    #[error("{}", extraction_message(*page, reason))]
    Extraction { page: Option<usize>, reason: String },

    /// Token could not be decrypted
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Requested document, page or token is absent
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Extraction found nothing to redact
    #[error("no sensitive data found in the header region")]
    NoSensitiveData,

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Error occurred during PDF processing
    #[error("{}", pdf_message(message, *page))]
    PdfProcessing {
        message: String,
        page: Option<usize>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend-specific error (MuPDF, printpdf, ...)
    #[error("{backend} backend error: {message}")]
    BackendError {
        backend: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Mapping or configuration (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn extraction_message(page: Option<usize>, reason: &str) -> String {
    match page {
        Some(p) => format!("Text extraction failed on page {}: {}", p, reason),
        None => format!("Text extraction failed: {}", reason),
    }
}

fn pdf_message(message: &str, page: Option<usize>) -> String {
    match page {
        Some(p) => format!("PDF processing error on page {}: {}", p, message),
        None => format!("PDF processing error: {}", message),
    }
}

impl AnonymizerError {
    /// Shorthand for an [`AnonymizerError::InvalidInput`].
    pub fn invalid_input(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`AnonymizerError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl From<io::Error> for AnonymizerError {
    fn from(err: io::Error) -> Self {
        Self::BackendError {
            backend: "std::io".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<anyhow::Error> for AnonymizerError {
    fn from(err: anyhow::Error) -> Self {
        Self::BackendError {
            backend: "anyhow".to_string(),
            message: err.to_string(),
            source: None,
        }
    }
}

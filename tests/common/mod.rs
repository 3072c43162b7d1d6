//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Custom assertions
//! - Paper fixtures, both as PDFs and as in-memory documents
//! - PDF inspection helpers and an in-memory document store

pub mod assertions;
pub mod fixtures;
pub mod pdf_helpers;

pub use assertions::*;
pub use fixtures::*;
pub use pdf_helpers::*;

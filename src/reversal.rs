//! Re-identification: decrypt each mapped field and write it back where
//! its marker sits.
//!
//! One bad field never blocks the others. Every field that cannot be
//! restored is reported as a [`FieldFailure`] alongside the partially
//! restored document.

use crate::crypto::FieldCodec;
use crate::document::{Document, HeaderRegion, Page, TextEdit, TextExtractor};
use crate::domain::FieldKind;
use crate::error::{AnonymizerError, AnonymizerResult, CodecError};
use crate::mapping::{EncryptedField, Mapping};
use crate::redaction::{segments, MarkerStyle};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a field could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("decryption failed: {0}")]
    Decrypt(CodecError),

    /// Hashed fields cannot be recovered
    #[error("field was hashed, not encrypted")]
    OneWay,

    #[error("decrypted value does not match the stored original")]
    OriginalMismatch,

    /// The configured marker style leaves nothing to search for
    #[error("marker cannot be located on the page")]
    UnrecoverableMarker,

    #[error("marker not found in the header region")]
    MarkerNotFound,

    /// An information-page entry was damaged and could not be read
    #[error("incomplete information entry: {0}")]
    Incomplete(String),
}

/// A field of the mapping that was not restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Position in `Mapping::encrypted_data`, or the entry's position
    /// across the information pages for embedded restores
    pub index: usize,
    pub kind: FieldKind,
    pub reason: FailureReason,
}

/// Result of a re-identification.
#[derive(Debug, Clone, PartialEq)]
pub struct ReidentifyOutcome {
    pub document: Document,
    /// Marker occurrences replaced with their original value
    pub applied: usize,
    pub failures: Vec<FieldFailure>,
}

impl ReidentifyOutcome {
    /// True when every field was restored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One line-sized piece of a decrypted field, waiting for its marker.
struct Segment {
    field: usize,
    original: String,
    marker: String,
}

/// Restores documents redacted by the pipeline.
#[derive(Debug, Clone)]
pub struct ReversalEngine {
    codec: FieldCodec,
    marker: MarkerStyle,
    header_fraction: f32,
    /// Padding blanked around each restored marker
    pad: f32,
}

impl ReversalEngine {
    pub fn new(codec: FieldCodec, marker: MarkerStyle, header_fraction: f32) -> Self {
        Self {
            codec,
            marker,
            header_fraction,
            pad: 1.0,
        }
    }

    pub fn with_pad(mut self, pad: f32) -> Self {
        self.pad = pad;
        self
    }

    /// Restores every recoverable field of `mapping` on page one.
    ///
    /// Fails only for document-level problems (no pages, unreadable page
    /// geometry). Field-level problems end up in `failures`.
    pub fn reverse(
        &self,
        document: &Document,
        mapping: &Mapping,
    ) -> AnonymizerResult<ReidentifyOutcome> {
        let page = document
            .first_page()
            .ok_or_else(|| AnonymizerError::not_found("page 1"))?;
        TextExtractor::extract(page, 1)?;

        let mut failures = Vec::new();
        let mut pending = Vec::new();
        for (index, field) in mapping.encrypted_data.iter().enumerate() {
            match self.prepare(field) {
                Ok(segments) => pending.extend(segments.into_iter().map(|(original, marker)| {
                    Segment {
                        field: index,
                        original,
                        marker,
                    }
                })),
                Err(reason) => {
                    if let FailureReason::Decrypt(err) = &reason {
                        warn!(index, kind = %field.kind, error = %err, "skipping undecryptable field");
                    }
                    failures.push(FieldFailure {
                        index,
                        kind: field.kind,
                        reason,
                    });
                }
            }
        }

        let region = HeaderRegion::new(page, self.header_fraction);
        let (restored, applied, found) = restore_segments(page, &region, pending, self.pad);

        for (index, field) in mapping.encrypted_data.iter().enumerate() {
            let prepared = !failures.iter().any(|f| f.index == index);
            if prepared && !found.contains(&index) {
                failures.push(FieldFailure {
                    index,
                    kind: field.kind,
                    reason: FailureReason::MarkerNotFound,
                });
            }
        }
        failures.sort_by_key(|f| f.index);

        debug!(applied, failed = failures.len(), "reversal complete");

        let mut document = document.clone();
        document.pages[0] = restored;
        Ok(ReidentifyOutcome {
            document,
            applied,
            failures,
        })
    }

    /// Decrypts a field and pairs each of its segments with its marker.
    fn prepare(&self, field: &EncryptedField) -> Result<Vec<(String, String)>, FailureReason> {
        if !field.algorithm.is_reversible() {
            return Err(FailureReason::OneWay);
        }
        let value = self
            .codec
            .decrypt_reversible(&field.encrypted)
            .map_err(FailureReason::Decrypt)?;
        if field.original.as_ref().is_some_and(|o| *o != value) {
            return Err(FailureReason::OriginalMismatch);
        }

        let pairs: Vec<(String, String)> = segments(&value)
            .map(|s| (s.to_string(), self.marker.marker_for(s)))
            .collect();
        if !self.marker.is_recoverable() || pairs.iter().any(|(_, m)| m.is_empty()) {
            return Err(FailureReason::UnrecoverableMarker);
        }
        Ok(pairs)
    }
}

/// Claimed span of one line.
type Span = (usize, usize, Range<usize>);

fn restore_segments(
    page: &Page,
    region: &HeaderRegion,
    mut pending: Vec<Segment>,
    pad: f32,
) -> (Page, usize, Vec<usize>) {
    // Longest markers first; fields sharing a marker stay in mapping order
    pending.sort_by(|a, b| {
        b.marker
            .chars()
            .count()
            .cmp(&a.marker.chars().count())
            .then_with(|| a.marker.cmp(&b.marker))
    });

    let mut claimed: Vec<Span> = Vec::new();
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut found: Vec<usize> = Vec::new();
    let mut restored = page.clone();

    let mut start = 0;
    while start < pending.len() {
        let marker = pending[start].marker.clone();
        let end = pending[start..]
            .iter()
            .position(|s| s.marker != marker)
            .map_or(pending.len(), |n| start + n);
        let group = &pending[start..end];
        start = end;

        let mut available = page
            .find(&marker, region)
            .into_iter()
            .filter(|occ| is_whole_marker(page, occ.block, occ.line, &occ.range, &marker))
            .filter(|occ| {
                !claimed
                    .iter()
                    .any(|(b, l, r)| *b == occ.block && *l == occ.line && overlaps(r, &occ.range))
            })
            .collect::<Vec<_>>()
            .into_iter();

        for (i, segment) in group.iter().enumerate() {
            // The last field sharing a marker takes every remaining
            // occurrence; the others take one each, in reading order.
            let take = if i + 1 == group.len() { usize::MAX } else { 1 };
            for occ in available.by_ref().take(take) {
                claimed.push((occ.block, occ.line, occ.range.clone()));
                restored.overlay(&occ, segment.original.clone(), pad);
                edits.push(occ.into_edit(segment.original.clone()));
                if !found.contains(&segment.field) {
                    found.push(segment.field);
                }
            }
        }
    }

    let applied = edits.len();
    restored.apply_edits(edits);
    (restored, applied, found)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// A marker made of one repeated character only matches a whole run of
/// that character, so `*****` does not match inside `**********`.
fn is_whole_marker(page: &Page, block: usize, line: usize, range: &Range<usize>, marker: &str) -> bool {
    let mut chars = marker.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !chars.all(|c| c == first) {
        return true;
    }
    let text = &page.blocks[block].lines[line].text;
    let before = text[..range.start].chars().next_back();
    let after = text[range.end..].chars().next();
    before != Some(first) && after != Some(first)
}

//! Redaction plans and the markers that replace redacted values.

use crate::crypto::FieldCodec;
use crate::document::Rect;
use serde::{Deserialize, Serialize};

/// Marker used by [`MarkerStyle::Fixed`].
pub const FIXED_MARKER: &str = "[REDACTED]";

/// What a redacted value is replaced with on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// One `*` per character of the value.
    #[default]
    LengthPreserving,

    /// The constant [`FIXED_MARKER`], which hides the value's length.
    Fixed,

    /// Nothing. The value is removed and cannot be restored in place.
    Blank,

    /// Leading hex digits of the value's SHA-256, one per character.
    Hash,
}

impl MarkerStyle {
    /// Marker for a single-line segment.
    pub fn marker_for(&self, segment: &str) -> String {
        let len = segment.chars().count();
        match self {
            Self::LengthPreserving => "*".repeat(len),
            Self::Fixed => FIXED_MARKER.to_string(),
            Self::Blank => String::new(),
            Self::Hash => FieldCodec::hash_one_way(segment)
                .chars()
                .cycle()
                .take(len)
                .collect(),
        }
    }

    /// Whether a marker can be located again on the page.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Blank)
    }
}

/// Splits a value into the single-line segments that are searched for.
///
/// Multi-line values such as a title block are rendered one line at a
/// time, so each line is redacted and restored on its own.
pub fn segments(value: &str) -> impl Iterator<Item = &str> {
    value.split('\n').map(str::trim).filter(|s| !s.is_empty())
}

/// One `original -> marker` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub original: String,
    pub marker: String,
}

/// Values to redact with their markers, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionPlan {
    entries: Vec<PlanEntry>,
}

impl RedactionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair. Empty originals and repeated originals are ignored.
    pub fn insert(&mut self, original: impl Into<String>, marker: impl Into<String>) -> bool {
        let original = original.into();
        if original.is_empty() || self.entries.iter().any(|e| e.original == original) {
            return false;
        }
        self.entries.push(PlanEntry {
            original,
            marker: marker.into(),
        });
        true
    }

    /// Adds every segment of `value` with a marker in `style`.
    pub fn add_value(&mut self, value: &str, style: MarkerStyle) {
        for segment in segments(value) {
            self.insert(segment, style.marker_for(segment));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Entries by descending character length, ties broken by value, so a
    /// shorter value never claims text inside a longer one.
    pub fn ordered(&self) -> Vec<&PlanEntry> {
        let mut ordered: Vec<&PlanEntry> = self.entries.iter().collect();
        ordered.sort_by(|a, b| {
            b.original
                .chars()
                .count()
                .cmp(&a.original.chars().count())
                .then_with(|| a.original.cmp(&b.original))
        });
        ordered
    }
}

/// Statistics and diagnostics from one redaction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedactionReport {
    /// Occurrences replaced by a marker
    pub instances_redacted: usize,

    /// Occurrences left alone because a longer value already covered them
    pub skipped_overlaps: usize,

    /// Padded rectangles of every redaction
    pub regions: Vec<Rect>,
}

impl RedactionReport {
    /// Returns true if any redactions were applied.
    pub fn has_redactions(&self) -> bool {
        self.instances_redacted > 0
    }
}

//! Heuristics for locating author metadata in a paper's header.
//!
//! Each family of pattern lives in its own matcher implementing
//! [`FieldMatcher`]. The [`SensitiveFieldExtractor`] runs them in a fixed
//! priority order and assembles [`AuthorRecord`]s.

pub mod address;
pub mod affiliation;
pub mod email;
pub mod extractor;
pub mod name;
pub mod title;

pub use address::AddressMatcher;
pub use affiliation::{DepartmentMatcher, InstitutionMatcher, LocationMatcher};
pub use email::EmailMatcher;
pub use extractor::SensitiveFieldExtractor;
pub use name::{CapitalizedNameMatcher, LabeledNameMatcher, OrdinalNameMatcher};
pub use title::{LabeledTitleMatcher, TitleDetector};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of sensitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Name,
    Email,
    Affiliation,
    Title,
    Address,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Name,
        FieldKind::Email,
        FieldKind::Affiliation,
        FieldKind::Title,
        FieldKind::Address,
    ];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Affiliation => "affiliation",
            Self::Title => "title",
            Self::Address => "address",
        }
    }

    /// Capitalized label used on the encrypted-information page.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Affiliation => "Affiliation",
            Self::Title => "Title",
            Self::Address => "Address",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FieldKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown field kind '{}'", s))
    }
}

/// One detected author candidate. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
}

impl AuthorRecord {
    pub fn get(&self, kind: FieldKind) -> Option<&str> {
        match kind {
            FieldKind::Name => self.name.as_deref(),
            FieldKind::Email => self.email.as_deref(),
            FieldKind::Affiliation => self.affiliation.as_deref(),
            FieldKind::Title => self.title.as_deref(),
            FieldKind::Address => self.address.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        FieldKind::ALL.iter().all(|k| self.get(*k).is_none())
    }
}

/// A matched value with its byte span in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl Candidate {
    pub fn new(value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            value: value.into(),
            start,
            end,
        }
    }

    fn overlaps(&self, other: &Candidate) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A pattern family that proposes candidates for one field kind.
pub trait FieldMatcher: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Candidates in order of appearance.
    fn find(&self, text: &str) -> Vec<Candidate>;
}

/// Drops candidates overlapping an earlier-starting one, then duplicate
/// values, keeping first-seen order.
pub(crate) fn merge_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().any(|k| k.overlaps(&candidate) || k.value == candidate.value) {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

/// Stands in for every byte of a claimed span. It is neither whitespace
/// nor a word character, so no pattern can run across a masked value.
pub(crate) const MASK: char = '\u{1}';

/// Overwrites the given spans with [`MASK`], keeping byte offsets intact.
pub(crate) fn mask_spans(text: &str, spans: &[Candidate]) -> String {
    let mut masked = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if spans.iter().any(|s| idx >= s.start && idx < s.end) && ch != '\n' {
            masked.extend(std::iter::repeat(MASK).take(ch.len_utf8()));
        } else {
            masked.push(ch);
        }
    }
    masked
}

/// Cuts a candidate found in masked text at the first masked byte and
/// trims what is left. Returns `None` when nothing remains.
pub(crate) fn clip_at_mask(candidate: Candidate) -> Option<Candidate> {
    let Some(cut) = candidate.value.find(MASK) else {
        return Some(candidate);
    };
    let value = candidate.value[..cut]
        .trim_end_matches(|c: char| c.is_whitespace() || ",;:(".contains(c));
    (!value.trim().is_empty())
        .then(|| Candidate::new(value, candidate.start, candidate.start + value.len()))
}

/// Whether `value` holds a gap of two or more blanks inside one line,
/// which no single name is written with.
pub(crate) fn has_wide_gap(value: &str) -> bool {
    value
        .as_bytes()
        .windows(2)
        .any(|w| matches!(w, [b' ' | b'\t', b' ' | b'\t']))
}

//! Paper title detection.

use super::{Candidate, FieldMatcher};
use crate::document::PageBlock;
use once_cell::sync::Lazy;
use regex::Regex;

/// Picks the header block set in the clearly largest type as the title.
///
/// The winner's line height must exceed every other block's by
/// `min_ratio`, so a header made of uniformly sized text has no title.
#[derive(Debug, Clone)]
pub struct TitleDetector {
    min_ratio: f32,
    max_len: usize,
}

impl Default for TitleDetector {
    fn default() -> Self {
        Self {
            min_ratio: 1.15,
            max_len: 300,
        }
    }
}

impl TitleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index into `blocks` of the title block, if any.
    pub fn detect(&self, blocks: &[PageBlock]) -> Option<usize> {
        let candidates: Vec<(usize, f32)> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.text().trim().is_empty())
            .map(|(i, b)| (i, b.line_height()))
            .collect();
        if candidates.len() < 2 {
            return None;
        }

        let (best, best_height) = candidates
            .iter()
            .copied()
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        let clearly_larger = candidates
            .iter()
            .filter(|(i, _)| *i != best)
            .all(|(_, h)| best_height >= h * self.min_ratio);

        let text = blocks[best].text();
        (clearly_larger && !text.contains('@') && text.chars().count() <= self.max_len)
            .then_some(best)
    }
}

/// `Title: ...` on its own line.
#[derive(Debug, Clone, Default)]
pub struct LabeledTitleMatcher;

impl LabeledTitleMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?im)^[ \t]*title[ \t]*:[ \t]*([^\n.]*[^\s.])").expect("Valid title regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for LabeledTitleMatcher {
    fn name(&self) -> &'static str {
        "labeled-title"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

//! Postal address lines.

use super::{Candidate, FieldMatcher};
use once_cell::sync::Lazy;
use regex::Regex;

/// `Address: ...` or `Location: ...` up to the end of the line.
#[derive(Debug, Clone, Default)]
pub struct AddressMatcher;

impl AddressMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?im)^[ \t]*(?:postal[ \t]+)?(?:address|location)[ \t]*:[ \t]*([^\n]*[^\s.])")
                .expect("Valid address regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for AddressMatcher {
    fn name(&self) -> &'static str {
        "address"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

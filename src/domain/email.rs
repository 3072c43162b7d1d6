//! Email detection, and names recovered from around an email.
//!
//! Emails are the most reliable signal in a header, so every match is
//! taken as-is.

use super::name::CapitalizedNameMatcher;
use super::{Candidate, FieldMatcher};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `local@domain.tld` addresses.
#[derive(Debug, Clone, Default)]
pub struct EmailMatcher;

impl EmailMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b")
                .expect("Valid email regex")
        });
        &PATTERN
    }

    /// Rebuilds `First Last` from a `first.last` style local part, but
    /// only returns it if that name is written in `text`. The returned
    /// candidate carries the casing used in the text.
    pub fn name_from_local_part(email: &str, text: &str) -> Option<Candidate> {
        let local = email.split('@').next()?;
        let parts: Vec<&str> = local
            .split(['.', '_', '-'])
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 2 || parts.len() > 4 {
            return None;
        }
        if parts
            .iter()
            .any(|p| p.chars().count() < 2 || !p.chars().all(char::is_alphabetic))
        {
            return None;
        }

        let pattern = parts
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join(r"[ \t]+");
        let re = Regex::new(&format!(r"(?i)\b{}\b", pattern)).ok()?;
        re.find(text)
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
    }

    /// The name written right before an email on the same line, as in
    /// `Jane Doe jdoe@uni.edu` or `Jane Doe <jdoe@uni.edu>`.
    pub fn name_before(email: &Candidate, text: &str) -> Option<Candidate> {
        let line_start = text[..email.start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &text[line_start..email.start];
        let trimmed_len = prefix
            .trim_end_matches(|c: char| c.is_whitespace() || ",;:<([".contains(c))
            .len();

        CapitalizedNameMatcher::new()
            .find(prefix)
            .into_iter()
            .filter(|c| c.end == trimmed_len)
            .last()
            .map(|c| Candidate::new(c.value, c.start + line_start, c.end + line_start))
    }
}

impl FieldMatcher for EmailMatcher {
    fn name(&self) -> &'static str {
        "email"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .find_iter(text)
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

//! Author name heuristics.
//!
//! Three strategies, tried in priority order by the extractor:
//! ordinal-prefixed names (`1st John Smith`, the IEEE template), labelled
//! author lists (`Authors: A, B and C`), and finally any run of 2 to 4
//! capitalized words that contains no role word.

use super::{Candidate, FieldMatcher, MASK};
use once_cell::sync::Lazy;
use regex::Regex;

/// One capitalized word, optionally hyphenated or with an apostrophe.
const WORD: &str = r"\p{Lu}(?:['’]\p{Lu})?\p{Ll}+(?:\p{Lu}\p{Ll}+)?(?:-\p{Lu}\p{Ll}+)?";
/// A middle initial such as `A.`.
const INITIAL: &str = r"\p{Lu}\.";

/// Names longer than this are rejected.
const MAX_NAME_LEN: usize = 40;

/// Words that mark institutions, section headings or title vocabulary.
const ROLE_WORDS: &[&str] = &[
    "abstract", "academy", "accepted", "address", "analysis", "and", "applied", "approach",
    "association", "author", "authors", "avenue", "based", "biology", "business", "center",
    "centre", "chemistry", "college", "computer", "computing", "conference", "contact",
    "copyright", "corresponding", "data", "deep", "department", "dept", "division", "economics",
    "electrical", "electronics", "email", "engineering", "faculty", "figure", "for", "from",
    "group", "health", "index", "information", "institute", "international", "introduction",
    "journal", "keywords", "lab", "laboratory", "learning", "machine", "management",
    "mathematics", "mechanical", "medical", "medicine", "method", "methods", "model", "models",
    "national", "network", "networks", "novel", "physics", "polytechnic", "proceedings",
    "published", "received", "research", "road", "school", "science", "sciences", "section",
    "society", "street", "study", "system", "systems", "table", "technology", "terms", "the",
    "this", "title", "towards", "university", "using", "volume", "with",
];

fn is_role_word(token: &str) -> bool {
    let cleaned: String = token
        .trim_end_matches(['.', ','])
        .chars()
        .flat_map(char::to_lowercase)
        .collect();
    ROLE_WORDS.binary_search(&cleaned.as_str()).is_ok()
}

fn is_initial(token: &str) -> bool {
    token.len() <= 3 && token.ends_with('.')
}

/// Splits a capitalized run at role words and keeps the pieces that look
/// like names. Offsets are relative to `text`.
fn name_runs(text: &str, start: usize, end: usize) -> Vec<Candidate> {
    static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("Valid token regex"));

    let mut runs: Vec<Vec<(usize, usize)>> = vec![Vec::new()];
    for m in TOKEN.find_iter(&text[start..end]) {
        let span = (start + m.start(), start + m.end());
        if is_role_word(m.as_str()) {
            runs.push(Vec::new());
        } else if let Some(current) = runs.last_mut() {
            current.push(span);
        }
    }

    runs.into_iter()
        .filter_map(|mut run| {
            // A run may not begin or end on an initial.
            while run.first().is_some_and(|(s, e)| is_initial(&text[*s..*e])) {
                run.remove(0);
            }
            while run.last().is_some_and(|(s, e)| is_initial(&text[*s..*e])) {
                run.pop();
            }
            let words = run.len();
            if !(2..=4).contains(&words) {
                return None;
            }
            let (s, _) = run[0];
            let (_, e) = run[words - 1];
            let value = &text[s..e];
            (value.chars().count() < MAX_NAME_LEN).then(|| Candidate::new(value, s, e))
        })
        .collect()
}

/// Whether `value` is, as a whole, a plausible personal name.
pub fn looks_like_name(value: &str) -> bool {
    let value = value.trim();
    let capitalized = value
        .split_whitespace()
        .all(|t| t.chars().next().is_some_and(char::is_uppercase));
    if !capitalized {
        return false;
    }
    let runs = name_runs(value, 0, value.len());
    runs.len() == 1 && runs[0].value == value
}

/// Runs of 2 to 4 capitalized words on a single line.
#[derive(Debug, Clone, Default)]
pub struct CapitalizedNameMatcher;

impl CapitalizedNameMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&format!(
                r"\b{w}(?:[ \t]+(?:{i}[ \t]+)*{w})+",
                w = WORD,
                i = INITIAL
            ))
            .expect("Valid capitalized-name regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for CapitalizedNameMatcher {
    fn name(&self) -> &'static str {
        "capitalized-name"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .find_iter(text)
            .flat_map(|m| name_runs(text, m.start(), m.end()))
            .collect()
    }
}

/// `1st John Smith`, `2nd Jane A. Doe`, ...
#[derive(Debug, Clone, Default)]
pub struct OrdinalNameMatcher;

impl OrdinalNameMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&format!(
                r"\b\d{{1,2}}(?:st|nd|rd|th)[ \t]+({w}(?:[ \t]+(?:{i}[ \t]+)*{w}){{1,3}})",
                w = WORD,
                i = INITIAL
            ))
            .expect("Valid ordinal-name regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for OrdinalNameMatcher {
    fn name(&self) -> &'static str {
        "ordinal-name"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .flat_map(|m| name_runs(text, m.start(), m.end()))
            .collect()
    }
}

/// Names listed after an `Authors:` / `By:` label, possibly on the next
/// line, separated by commas, semicolons, `and` or `&`.
#[derive(Debug, Clone, Default)]
pub struct LabeledNameMatcher;

impl LabeledNameMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?im)^[ \t]*(?:authors?|written by|submitted by|presented by|by)[ \t]*:[ \t]*\n?[ \t]*(\S[^\n]*)$",
            )
            .expect("Valid labeled-name regex")
        });
        &PATTERN
    }

    fn separator() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"\s*(?:,|;|&|\band\b)\s*").expect("Valid separator regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for LabeledNameMatcher {
    fn name(&self) -> &'static str {
        "labeled-name"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        let mut found = Vec::new();
        for caps in Self::regex().captures_iter(text) {
            let Some(list) = caps.get(1) else { continue };
            let mut cursor = list.start();
            let mut pieces: Vec<(usize, usize)> = Vec::new();
            for sep in Self::separator().find_iter(list.as_str()) {
                pieces.push((cursor, list.start() + sep.start()));
                cursor = list.start() + sep.end();
            }
            pieces.push((cursor, list.end()));

            for (start, end) in pieces {
                let raw = &text[start..end];
                let blank = |c: char| c.is_whitespace() || c == MASK;
                let value = raw.trim_matches(blank);
                if value.is_empty() || !looks_like_name(value) {
                    continue;
                }
                let offset = start + (raw.len() - raw.trim_start_matches(blank).len());
                found.push(Candidate::new(value, offset, offset + value.len()));
            }
        }
        found
    }
}

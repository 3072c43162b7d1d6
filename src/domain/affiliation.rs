//! Affiliation pattern families.
//!
//! - [`DepartmentMatcher`]: `Department of ...`, `Dept. of ...`, `School of ...`
//! - [`InstitutionMatcher`]: `National University of ...`, `Stanford University`
//! - [`LocationMatcher`]: a trailing `City, Country` on a line

use super::{Candidate, FieldMatcher};
use once_cell::sync::Lazy;
use regex::Regex;

/// Capitalized continuation words, allowing `of`, `and`, `for`, `the`, `&`
/// between them.
const CONTINUATION: &str =
    r"\p{Lu}[\p{L}\-]*(?:[ \t]+(?:(?:of|and|for|the|&)[ \t]+)?\p{Lu}[\p{L}\-]*)*";

const COUNTRIES: &str = "USA|U\\.S\\.A\\.|United States|UK|United Kingdom|Canada|Germany|France|\
Italy|Spain|Portugal|Netherlands|Belgium|Switzerland|Austria|Sweden|Norway|Denmark|Finland|\
Poland|Romania|Greece|Ireland|Czech Republic|Hungary|Israel|Turkey|India|China|Japan|\
South Korea|Korea|Singapore|Australia|New Zealand|Brazil|Mexico|Argentina|Chile|\
South Africa|Egypt|Nigeria|Russia|Ukraine|Iran|Pakistan|Taiwan|Hong Kong|Vietnam|Thailand|\
Malaysia|Indonesia|Saudi Arabia|UAE";

/// Organisational unit followed by `of`/`for` and a capitalized subject.
#[derive(Debug, Clone, Default)]
pub struct DepartmentMatcher;

impl DepartmentMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&format!(
                r"\b(?:Department|Dept\.|School|Faculty|Institute|Laboratory|Lab|Division|Centre|Center)[ \t]+(?:of|for)[ \t]+(?:the[ \t]+)?{}",
                CONTINUATION
            ))
            .expect("Valid department regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for DepartmentMatcher {
    fn name(&self) -> &'static str {
        "department"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .find_iter(text)
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

/// A named university, institute or college, at the start of a line or
/// right after a comma.
#[derive(Debug, Clone, Default)]
pub struct InstitutionMatcher;

impl InstitutionMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&format!(
                r"(?m)(?:^|,)[ \t]*((?:\p{{Lu}}[\p{{L}}\-]*[ \t]+){{0,4}}(?:University|Institute|College|Polytechnic|Politehnica|Academy)(?:[ \t]+of[ \t]+(?:the[ \t]+)?{})?)",
                CONTINUATION
            ))
            .expect("Valid institution regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for InstitutionMatcher {
    fn name(&self) -> &'static str {
        "institution"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

/// `City, Country` closing a line.
#[derive(Debug, Clone, Default)]
pub struct LocationMatcher;

impl LocationMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(&format!(
                r"(?m)(?:^|,)[ \t]*(\p{{Lu}}[\p{{L}}\-]+(?:[ \t]+\p{{Lu}}[\p{{L}}\-]+)?,[ \t]*(?:{}))[ \t]*$",
                COUNTRIES
            ))
            .expect("Valid location regex")
        });
        &PATTERN
    }
}

impl FieldMatcher for LocationMatcher {
    fn name(&self) -> &'static str {
        "location"
    }

    fn find(&self, text: &str) -> Vec<Candidate> {
        Self::regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Candidate::new(m.as_str(), m.start(), m.end()))
            .collect()
    }
}

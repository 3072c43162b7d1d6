//! Sensitive-field extraction over the header of page one.
//!
//! The steps, in order:
//! 1. Restrict to the header region (blocks whose bottom edge lies within
//!    `header_fraction` of the page height, or a text prefix of that
//!    fraction for plain text).
//! 2. Pull out the title block, if one is set in clearly larger type.
//! 3. Emails, then addresses, labelled titles and affiliations, each
//!    family masking what it claimed so later families cannot reuse it.
//! 4. Names from the first name strategy that finds anything, plus names
//!    recovered from around each email.
//! 5. Drop surplus names when there are more than two per email.

use super::email::EmailMatcher;
use super::{
    clip_at_mask, has_wide_gap, mask_spans, merge_candidates, AddressMatcher, AuthorRecord, Candidate,
    CapitalizedNameMatcher, DepartmentMatcher, FieldMatcher, InstitutionMatcher,
    LabeledNameMatcher, LabeledTitleMatcher, LocationMatcher, OrdinalNameMatcher, TitleDetector,
};
use crate::document::{HeaderRegion, Page, PageBlock, TextExtractor};
use crate::error::AnonymizerResult;
use tracing::debug;

/// Upper bound on names per detected email.
const NAMES_PER_EMAIL: usize = 2;

/// Applies the matcher families to a page header.
pub struct SensitiveFieldExtractor {
    header_fraction: f32,
    emails: EmailMatcher,
    addresses: Vec<Box<dyn FieldMatcher>>,
    affiliations: Vec<Box<dyn FieldMatcher>>,
    titles: Vec<Box<dyn FieldMatcher>>,
    /// Tried in order; the first strategy with results wins.
    name_strategies: Vec<Box<dyn FieldMatcher>>,
    title_detector: TitleDetector,
}

impl std::fmt::Debug for SensitiveFieldExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.name_strategies.iter().map(|m| m.name()).collect();
        f.debug_struct("SensitiveFieldExtractor")
            .field("header_fraction", &self.header_fraction)
            .field("name_strategies", &names)
            .finish()
    }
}

impl SensitiveFieldExtractor {
    /// Creates an extractor with the default matcher families.
    pub fn new(header_fraction: f32) -> Self {
        Self {
            header_fraction,
            emails: EmailMatcher::new(),
            addresses: vec![Box::new(AddressMatcher::new())],
            affiliations: vec![
                Box::new(DepartmentMatcher::new()),
                Box::new(InstitutionMatcher::new()),
                Box::new(LocationMatcher::new()),
            ],
            titles: vec![Box::new(LabeledTitleMatcher::new())],
            name_strategies: vec![
                Box::new(OrdinalNameMatcher::new()),
                Box::new(LabeledNameMatcher::new()),
                Box::new(CapitalizedNameMatcher::new()),
            ],
            title_detector: TitleDetector::new(),
        }
    }

    /// Adds a name strategy ahead of the built-in ones.
    pub fn with_name_strategy(mut self, matcher: Box<dyn FieldMatcher>) -> Self {
        self.name_strategies.insert(0, matcher);
        self
    }

    /// Adds an affiliation pattern family.
    pub fn with_affiliation_matcher(mut self, matcher: Box<dyn FieldMatcher>) -> Self {
        self.affiliations.push(matcher);
        self
    }

    pub fn header_fraction(&self) -> f32 {
        self.header_fraction
    }

    /// Extracts author records from the header of `page`, which is
    /// always the first page of a document.
    pub fn extract(&self, page: &Page) -> AnonymizerResult<Vec<AuthorRecord>> {
        let extracted = TextExtractor::extract(page, 1)?;
        let region = HeaderRegion::new(page, self.header_fraction);
        let header: Vec<PageBlock> = extracted
            .blocks
            .into_iter()
            .filter(|b| region.contains(&b.rect))
            .collect();

        let title_idx = self.title_detector.detect(&header);
        let title = title_idx.map(|i| {
            header[i]
                .lines
                .iter()
                .map(|l| l.text.trim())
                .collect::<Vec<_>>()
                .join("\n")
        });

        let text = header
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != title_idx)
            .map(|(_, b)| b.text())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            blocks = header.len(),
            title = title.is_some(),
            "scanning header region"
        );
        Ok(self.extract_from_header_text(&text, title))
    }

    /// Extracts author records from plain text, scanning the leading
    /// `header_fraction` of its characters.
    pub fn extract_text(&self, text: &str) -> Vec<AuthorRecord> {
        let total = text.chars().count();
        let keep = ((total as f32) * self.header_fraction).ceil() as usize;
        let end = text
            .char_indices()
            .nth(keep)
            .map_or(text.len(), |(idx, _)| idx);
        self.extract_from_header_text(&text[..end], None)
    }

    fn extract_from_header_text(&self, text: &str, title: Option<String>) -> Vec<AuthorRecord> {
        let emails = merge_candidates(self.emails.find(text));
        let mut claimed: Vec<Candidate> = emails.clone();

        let addresses = run_family(&self.addresses, &mask_spans(text, &claimed));
        claimed.extend(addresses.iter().cloned());

        let labeled_titles = if title.is_none() {
            run_family(&self.titles, &mask_spans(text, &claimed))
        } else {
            Vec::new()
        };
        claimed.extend(labeled_titles.iter().cloned());

        let affiliations = run_family(&self.affiliations, &mask_spans(text, &claimed));
        claimed.extend(affiliations.iter().cloned());

        let masked = mask_spans(text, &claimed);
        let mut names = Vec::new();
        for strategy in &self.name_strategies {
            let found = name_candidates(strategy.find(&masked));
            if !found.is_empty() {
                debug!(strategy = strategy.name(), count = found.len(), "names matched");
                names = found;
                break;
            }
        }

        for email in &emails {
            let recovered = EmailMatcher::name_from_local_part(&email.value, &masked)
                .or_else(|| EmailMatcher::name_before(email, &masked));
            names.extend(name_candidates(recovered.into_iter().collect()));
        }
        let mut names: Vec<String> = dedup_values(names);

        if !emails.is_empty() && names.len() > NAMES_PER_EMAIL * emails.len() {
            debug!(
                names = names.len(),
                emails = emails.len(),
                "truncating implausible name list"
            );
            names.truncate(NAMES_PER_EMAIL * emails.len());
        }

        let emails = dedup_values(emails);
        let affiliations = dedup_values(affiliations);
        let addresses = dedup_values(addresses);
        let titles: Vec<String> = match title {
            Some(t) => vec![t],
            None => dedup_values(labeled_titles),
        };

        assemble(names, emails, affiliations, titles, addresses)
    }
}

impl Default for SensitiveFieldExtractor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

fn run_family(matchers: &[Box<dyn FieldMatcher>], text: &str) -> Vec<Candidate> {
    merge_candidates(
        matchers
            .iter()
            .flat_map(|m| m.find(text))
            .filter_map(clip_at_mask)
            .collect(),
    )
}

/// Name candidates never span a masked value or a wide gap.
fn name_candidates(found: Vec<Candidate>) -> Vec<Candidate> {
    found
        .into_iter()
        .filter_map(clip_at_mask)
        .filter(|c| !has_wide_gap(&c.value))
        .collect()
}

/// Values in order of first appearance, without duplicates.
fn dedup_values(mut candidates: Vec<Candidate>) -> Vec<String> {
    candidates.sort_by_key(|c| c.start);
    let mut values: Vec<String> = Vec::new();
    for c in candidates {
        if !values.contains(&c.value) {
            values.push(c.value);
        }
    }
    values
}

/// Zips the per-field lists into records by position.
fn assemble(
    names: Vec<String>,
    emails: Vec<String>,
    affiliations: Vec<String>,
    titles: Vec<String>,
    addresses: Vec<String>,
) -> Vec<AuthorRecord> {
    let count = [
        names.len(),
        emails.len(),
        affiliations.len(),
        titles.len(),
        addresses.len(),
    ]
    .into_iter()
    .max()
    .unwrap_or(0);

    (0..count)
        .map(|i| AuthorRecord {
            name: names.get(i).cloned(),
            email: emails.get(i).cloned(),
            affiliation: affiliations.get(i).cloned(),
            title: titles.get(i).cloned(),
            address: addresses.get(i).cloned(),
        })
        .collect()
}

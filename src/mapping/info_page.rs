//! The ENCRYPTED INFORMATION page appended to de-identified documents.
//!
//! Layout, one line each:
//!
//! ```text
//! ENCRYPTED INFORMATION
//! Name:
//! Original: John Smith
//! Algorithm: AES-256-CBC
//! Encrypted: 9f3c...:41be...
//! ```
//!
//! `Original:` is only written when plaintext embedding is on. Newlines
//! inside an original are written as `\n`. Originals and tokens longer
//! than a line continue on the following lines, and entries that do not
//! fit on one page continue on another page that repeats the heading.

use super::{Algorithm, EncryptedField};
use crate::document::{Page, PageBuilder};
use crate::domain::FieldKind;
use tracing::warn;

/// First line of an encrypted-information page.
pub const INFO_HEADING: &str = "ENCRYPTED INFORMATION";

const HEADING_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 6.0;
/// Value characters per rendered line.
const TOKEN_CHUNK: usize = 96;

const ORIGINAL: &str = "Original: ";
const ALGORITHM: &str = "Algorithm: ";
const ENCRYPTED: &str = "Encrypted: ";

/// An entry that could not be read back in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteEntry {
    pub kind: FieldKind,
    /// 1-based page number
    pub page: usize,
    pub reason: String,
}

/// One entry of an information page, in page order.
pub type ParsedEntry = Result<EncryptedField, IncompleteEntry>;

/// Renders `fields` onto as many pages of the given size as they need.
///
/// Always returns at least one page.
pub fn render(fields: &[EncryptedField], width: f32, height: f32) -> Vec<Page> {
    let fresh = || PageBuilder::new(width, height).line(INFO_HEADING, HEADING_SIZE);

    let mut pages = Vec::new();
    let mut builder = fresh();
    let mut on_page = 0;
    for field in fields {
        let lines = entry_lines(field);
        // An entry taller than a whole page is placed on its own page.
        if on_page > 0 && !builder.fits(lines.len(), BODY_SIZE) {
            pages.push(builder.build());
            builder = fresh();
            on_page = 0;
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        builder = builder.block(&refs, BODY_SIZE);
        on_page += 1;
    }
    pages.push(builder.build());
    pages
}

fn entry_lines(field: &EncryptedField) -> Vec<String> {
    let mut lines = vec![format!("{}:", field.kind.label())];
    if let Some(original) = &field.original {
        for chunk in wrap(&escape(original)) {
            lines.push(format!("{}{}", ORIGINAL, chunk));
        }
    }
    lines.push(format!("{}{}", ALGORITHM, field.algorithm));

    let chars: Vec<char> = field.encrypted.chars().collect();
    for (i, chunk) in chars.chunks(TOKEN_CHUNK).enumerate() {
        let chunk: String = chunk.iter().collect();
        if i == 0 {
            lines.push(format!("{}{}", ENCRYPTED, chunk));
        } else {
            lines.push(chunk);
        }
    }
    lines
}

/// Splits `value` into pieces of at most [`TOKEN_CHUNK`] characters.
///
/// Lines are trimmed when read back, so a cut is placed between two
/// non-blank characters where one exists.
fn wrap(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;
    while chars.len() - start > TOKEN_CHUNK {
        let limit = start + TOKEN_CHUNK;
        let cut = (start + 1..=limit)
            .rev()
            .find(|&i| !chars[i - 1].is_whitespace() && !chars[i].is_whitespace())
            .unwrap_or(limit);
        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }
    pieces.push(chars[start..].iter().collect());
    pieces
}

/// Whether `page` starts with the encrypted-information heading.
pub fn is_info_page(page: &Page) -> bool {
    page.blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .map(|l| l.text.trim())
        .find(|t| !t.is_empty())
        .is_some_and(|t| t == INFO_HEADING)
}

/// Reads the entries listed on an encrypted-information page.
///
/// A damaged entry comes back as an [`IncompleteEntry`] and does not
/// affect its neighbours. Lines ahead of the first label are skipped.
/// `page_number` is recorded on incomplete entries.
pub fn parse(page: &Page, page_number: usize) -> Vec<ParsedEntry> {
    let mut entries = Vec::new();
    let mut current: Option<Partial> = None;
    let mut in_token = false;

    let lines = page
        .blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .map(|l| l.text.trim())
        .filter(|t| !t.is_empty())
        .skip_while(|t| *t != INFO_HEADING)
        .skip(1);

    for line in lines {
        if let Some(kind) = field_label(line) {
            if let Some(done) = current.take() {
                entries.push(done.finish(page_number));
            }
            current = Some(Partial::new(kind));
            in_token = false;
            continue;
        }

        let Some(partial) = current.as_mut() else {
            warn!(page = page_number, line, "skipping line before the first entry");
            continue;
        };
        if partial.problem.is_some() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(ORIGINAL.trim_end()) {
            partial
                .original
                .get_or_insert_with(String::new)
                .push_str(rest.trim_start());
            in_token = false;
        } else if let Some(rest) = line.strip_prefix(ALGORITHM.trim_end()) {
            match rest.parse::<Algorithm>() {
                Ok(algorithm) => partial.algorithm = Some(algorithm),
                Err(reason) => partial.problem = Some(reason),
            }
            in_token = false;
        } else if let Some(rest) = line.strip_prefix(ENCRYPTED.trim_end()) {
            partial.encrypted.push_str(rest.trim());
            in_token = true;
        } else if in_token && line.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            partial.encrypted.push_str(line);
        } else {
            partial.problem = Some(format!("unrecognised line: '{}'", line));
        }
    }

    if let Some(done) = current.take() {
        entries.push(done.finish(page_number));
    }
    entries
}

/// `Name:` and similar, alone on a line.
fn field_label(line: &str) -> Option<FieldKind> {
    let label = line.strip_suffix(':')?;
    FieldKind::ALL.into_iter().find(|k| k.label() == label)
}

struct Partial {
    kind: FieldKind,
    /// Still escaped, possibly joined from several lines
    original: Option<String>,
    algorithm: Option<Algorithm>,
    encrypted: String,
    problem: Option<String>,
}

impl Partial {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            original: None,
            algorithm: None,
            encrypted: String::new(),
            problem: None,
        }
    }

    fn finish(self, page: usize) -> ParsedEntry {
        let incomplete = |reason: String| IncompleteEntry {
            kind: self.kind,
            page,
            reason,
        };
        if let Some(problem) = self.problem.clone() {
            return Err(incomplete(problem));
        }
        let Some(algorithm) = self.algorithm else {
            return Err(incomplete(format!("{} entry has no algorithm", self.kind)));
        };
        if self.encrypted.is_empty() {
            return Err(incomplete(format!("{} entry has no encrypted value", self.kind)));
        }
        Ok(EncryptedField {
            kind: self.kind,
            original: self.original.as_deref().map(unescape),
            encrypted: self.encrypted,
            algorithm,
        })
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LETTER_HEIGHT, LETTER_WIDTH};

    fn field(kind: FieldKind, original: Option<&str>, encrypted: &str) -> EncryptedField {
        EncryptedField {
            kind,
            original: original.map(String::from),
            encrypted: encrypted.to_string(),
            algorithm: Algorithm::Aes256Cbc,
        }
    }

    fn parsed_fields(pages: &[Page]) -> Vec<EncryptedField> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(i, p)| parse(p, i + 2))
            .map(|entry| entry.unwrap())
            .collect()
    }

    #[test]
    fn test_render_then_parse() {
        let long_token = format!("{}:{}", "a1".repeat(16), "b2".repeat(80));
        let fields = vec![
            field(FieldKind::Name, Some("John Smith"), "00ff:abcd"),
            field(FieldKind::Title, Some("A Study\nof Things"), &long_token),
            EncryptedField {
                kind: FieldKind::Address,
                original: None,
                encrypted: "c0ffee".into(),
                algorithm: Algorithm::Sha256,
            },
        ];
        let pages = render(&fields, LETTER_WIDTH, LETTER_HEIGHT);
        assert_eq!(pages.len(), 1);
        assert!(is_info_page(&pages[0]));
        assert!(pages[0].has_line("Name:"));
        assert!(pages[0].has_line("Algorithm: SHA-256"));

        assert_eq!(parsed_fields(&pages), fields);
    }

    #[test]
    fn test_many_fields_continue_on_new_pages() {
        let fields: Vec<EncryptedField> = (0..24)
            .map(|i| {
                field(
                    FieldKind::Name,
                    Some(&format!("Author Number{}", i)),
                    &format!("{:032x}:{}", i, "ab".repeat(60)),
                )
            })
            .collect();
        let pages = render(&fields, LETTER_WIDTH, LETTER_HEIGHT);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(is_info_page(page));
            for line in page.blocks.iter().flat_map(|b| b.lines.iter()) {
                assert!(line.rect.y1 <= LETTER_HEIGHT, "line '{}' below the page", line.text);
            }
        }
        assert_eq!(parsed_fields(&pages), fields);
    }

    #[test]
    fn test_long_original_wraps_within_page_width() {
        let title = "Towards a Unified Theory of Extremely Long Paper Titles That Keep Going \
                     Well Past the Right Margin of Any Reasonable Page Layout, Volume II";
        let fields = vec![field(FieldKind::Title, Some(title), "00ff:abcd")];
        let pages = render(&fields, LETTER_WIDTH, LETTER_HEIGHT);
        for line in pages[0].blocks.iter().flat_map(|b| b.lines.iter()) {
            assert!(line.rect.x1 <= LETTER_WIDTH, "line '{}' past the page edge", line.text);
        }
        let originals = pages[0]
            .blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .filter(|l| l.text.starts_with(ORIGINAL))
            .count();
        assert!(originals > 1);
        assert_eq!(parsed_fields(&pages), fields);
    }

    #[test]
    fn test_wrap_never_cuts_next_to_blank() {
        let value = format!("{} {}", "x".repeat(95), "y".repeat(20));
        let pieces = wrap(&value);
        assert_eq!(pieces.concat(), value);
        for piece in &pieces {
            assert_eq!(piece.trim(), piece);
            assert!(piece.chars().count() <= TOKEN_CHUNK);
        }
    }

    #[test]
    fn test_ordinary_page_is_not_info_page() {
        let page = PageBuilder::new(LETTER_WIDTH, LETTER_HEIGHT)
            .line("A Paper", 12.0)
            .line(INFO_HEADING, 10.0)
            .build();
        assert!(!is_info_page(&page));
    }

    #[test]
    fn test_incomplete_entry_does_not_spoil_neighbours() {
        let page = PageBuilder::new(LETTER_WIDTH, LETTER_HEIGHT)
            .line(INFO_HEADING, 10.0)
            .block(&["Name:", "Algorithm: AES-256-CBC", "Encrypted: 00ff:abcd"], 6.0)
            .block(&["Email:", "Encrypted: 00:11"], 6.0)
            .block(&["Title:", "Algorithm: ROT13", "Encrypted: 00:11"], 6.0)
            .block(&["Address:", "Algorithm: SHA-256", "Encrypted: c0ffee"], 6.0)
            .build();
        let entries = parse(&page, 3);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], Ok(field(FieldKind::Name, None, "00ff:abcd")));

        let missing = entries[1].clone().unwrap_err();
        assert_eq!(missing.kind, FieldKind::Email);
        assert_eq!(missing.page, 3);
        assert!(missing.reason.contains("no algorithm"));

        assert_eq!(entries[2].clone().unwrap_err().kind, FieldKind::Title);
        assert!(entries[3].is_ok());
    }

    #[test]
    fn test_escape_round_trip() {
        let value = "line one\nback\\slash";
        assert_eq!(unescape(&escape(value)), value);
    }
}

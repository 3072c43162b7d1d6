//! In-memory page model: positioned text blocks on pages.
//!
//! The pipeline never touches PDF bytes directly. A [`crate::pdf`] store
//! turns a file into a [`Document`] and back, and every transform in
//! between takes a document by reference and returns a new one.
//!
//! Coordinates are in points with the origin at the top-left corner of
//! the page and `y` growing downwards.

pub mod extract;

pub use extract::{ExtractedText, TextExtractor};

use std::ops::Range;
use std::path::PathBuf;

/// US Letter width in points.
pub const LETTER_WIDTH: f32 = 612.0;
/// US Letter height in points.
pub const LETTER_HEIGHT: f32 = 792.0;

/// Axis-aligned rectangle, `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when both the horizontal and the vertical projections
    /// intersect. Rectangles that merely touch do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Grows the rectangle by `pad` on every side.
    pub fn padded(&self, pad: f32) -> Rect {
        Rect::new(self.x0 - pad, self.y0 - pad, self.x1 + pad, self.y1 + pad)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Finite coordinates with non-negative extent.
    pub fn is_well_formed(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }
}

/// One rendered line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub rect: Rect,
    pub text: String,
    pub font_size: f32,
    /// Horizontal extent of each character, when the source reports it.
    /// Empty for synthetic lines.
    pub glyphs: Vec<(f32, f32)>,
}

impl TextLine {
    pub fn new(rect: Rect, text: impl Into<String>, font_size: f32) -> Self {
        Self {
            rect,
            text: text.into(),
            font_size,
            glyphs: Vec::new(),
        }
    }

    pub fn with_glyphs(mut self, glyphs: Vec<(f32, f32)>) -> Self {
        self.glyphs = glyphs;
        self
    }

    fn has_glyphs(&self) -> bool {
        !self.glyphs.is_empty() && self.glyphs.len() == self.text.chars().count()
    }

    /// Bounding box of the byte range `range` of this line's text.
    ///
    /// Uses the per-character extents when known; otherwise the
    /// horizontal extent is interpolated from character indices.
    pub fn span_rect(&self, range: &Range<usize>) -> Rect {
        let start = self.text[..range.start].chars().count();
        let end = self.text[..range.end].chars().count();
        if self.has_glyphs() {
            let x0 = self.glyphs.get(start).map_or(self.rect.x1, |g| g.0);
            let x1 = if end > start { self.glyphs[end - 1].1 } else { x0 };
            return Rect::new(x0, self.rect.y0, x1.max(x0), self.rect.y1);
        }

        let total = self.text.chars().count().max(1) as f32;
        let advance = self.rect.width() / total;
        Rect::new(
            self.rect.x0 + start as f32 * advance,
            self.rect.y0,
            self.rect.x0 + end as f32 * advance,
            self.rect.y1,
        )
    }

    /// Replaces a byte range of the text. Known character extents are
    /// kept in step: the replacement is spread evenly over the space the
    /// replaced characters took.
    pub fn replace(&mut self, range: Range<usize>, replacement: &str) {
        if self.has_glyphs() {
            let start = self.text[..range.start].chars().count();
            let end = self.text[..range.end].chars().count();
            let span = self.span_rect(&range);
            let count = replacement.chars().count();
            let advance = span.width() / count.max(1) as f32;
            let spread: Vec<(f32, f32)> = (0..count)
                .map(|i| {
                    (
                        span.x0 + i as f32 * advance,
                        span.x0 + (i + 1) as f32 * advance,
                    )
                })
                .collect();
            self.glyphs.splice(start..end, spread);
        }
        self.text.replace_range(range, replacement);
    }
}

/// A block of lines as enumerated by the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBlock {
    pub rect: Rect,
    pub lines: Vec<TextLine>,
}

impl PageBlock {
    /// Builds a block whose rectangle encloses all of `lines`.
    pub fn from_lines(lines: Vec<TextLine>) -> Self {
        let rect = lines
            .iter()
            .map(|l| l.rect)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self { rect, lines }
    }

    /// Block text with lines joined by `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Average line height, used as a proxy for font size.
    pub fn line_height(&self) -> f32 {
        if self.lines.is_empty() {
            return 0.0;
        }
        self.lines.iter().map(|l| l.rect.height()).sum::<f32>() / self.lines.len() as f32
    }
}

/// Text to paint over the rendering of a source page.
///
/// `area` is blanked out for good when the document is written back over
/// its source file, then `text` is drawn where `span` starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Blanked area, padding included
    pub area: Rect,
    /// Box of the replaced characters
    pub span: Rect,
    pub font_size: f32,
    pub text: String,
}

/// A single page.
///
/// Pages compare by size and text blocks only; the source page index and
/// pending overlays are write-back bookkeeping.
#[derive(Debug, Clone)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<PageBlock>,
    /// 0-based index of this page in the file it was read from
    pub source_index: Option<usize>,
    pub overlays: Vec<Overlay>,
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.blocks == other.blocks
    }
}

impl Page {
    pub fn new(width: f32, height: f32, blocks: Vec<PageBlock>) -> Self {
        Self {
            width,
            height,
            blocks,
            source_index: None,
            overlays: Vec::new(),
        }
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    pub fn builder(width: f32, height: f32) -> PageBuilder {
        PageBuilder::new(width, height)
    }

    /// Full page text, blocks joined by `\n`.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every occurrence of `needle` on lines inside `region`.
    ///
    /// Matches are searched line by line, so a value wrapped across two
    /// lines is not found.
    pub fn find(&self, needle: &str, region: &HeaderRegion) -> Vec<Occurrence> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for (b, block) in self.blocks.iter().enumerate() {
            for (l, line) in block.lines.iter().enumerate() {
                if !region.contains(&line.rect) {
                    continue;
                }
                for (start, matched) in line.text.match_indices(needle) {
                    let range = start..start + matched.len();
                    hits.push(Occurrence {
                        block: b,
                        line: l,
                        rect: line.span_rect(&range),
                        range,
                    });
                }
            }
        }
        hits
    }

    /// Applies text edits. Edits must not overlap one another.
    pub fn apply_edits(&mut self, mut edits: Vec<TextEdit>) {
        // Right-to-left within a line so earlier byte offsets stay valid.
        edits.sort_by(|a, b| {
            (a.block, a.line, b.range.start).cmp(&(b.block, b.line, a.range.start))
        });
        for edit in edits {
            if let Some(line) = self
                .blocks
                .get_mut(edit.block)
                .and_then(|b| b.lines.get_mut(edit.line))
            {
                line.replace(edit.range, &edit.replacement);
            }
        }
    }

    /// Records that `occurrence` is to be painted over with `text`,
    /// blanking its box grown by `pad`. Earlier overlays on the same
    /// characters are dropped.
    pub fn overlay(&mut self, occurrence: &Occurrence, text: impl Into<String>, pad: f32) {
        let font_size = self
            .blocks
            .get(occurrence.block)
            .and_then(|b| b.lines.get(occurrence.line))
            .map_or(occurrence.rect.height(), |l| l.font_size);
        self.overlays.retain(|o| !o.span.overlaps(&occurrence.rect));
        self.overlays.push(Overlay {
            area: occurrence.rect.padded(pad),
            span: occurrence.rect,
            font_size,
            text: text.into(),
        });
    }

    /// Whether any line on the page reads exactly `text` once trimmed.
    pub fn has_line(&self, text: &str) -> bool {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .any(|l| l.text.trim() == text)
    }
}

/// Location of a search hit on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub block: usize,
    pub line: usize,
    pub range: Range<usize>,
    pub rect: Rect,
}

impl Occurrence {
    pub fn into_edit(self, replacement: impl Into<String>) -> TextEdit {
        TextEdit {
            block: self.block,
            line: self.line,
            range: self.range,
            replacement: replacement.into(),
        }
    }
}

/// Replacement of a byte range on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub block: usize,
    pub line: usize,
    pub range: Range<usize>,
    pub replacement: String,
}

/// The upper part of a page where author metadata is expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderRegion {
    limit: f32,
}

impl HeaderRegion {
    pub fn new(page: &Page, fraction: f32) -> Self {
        Self {
            limit: page.height * fraction.clamp(0.0, 1.0),
        }
    }

    /// The whole page.
    pub fn full(page: &Page) -> Self {
        Self::new(page, 1.0)
    }

    /// A rectangle is inside when its bottom edge is above the limit.
    pub fn contains(&self, rect: &Rect) -> bool {
        rect.y1 <= self.limit
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }
}

/// An ordered collection of pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub title: Option<String>,
    pub pages: Vec<Page>,
    /// File the pages were read from, if any
    pub source: Option<PathBuf>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            title: None,
            pages,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn first_page(&self) -> Option<&Page> {
        self.pages.first()
    }

    /// Full text of every page, pages separated by a form feed.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n\x0c")
    }
}

/// Lays out lines top-down for synthetic pages.
///
/// Line width is estimated at half an em per character, which is close
/// enough for Helvetica-like fonts.
#[derive(Debug, Clone)]
pub struct PageBuilder {
    width: f32,
    height: f32,
    margin: f32,
    cursor: f32,
    blocks: Vec<PageBlock>,
}

impl PageBuilder {
    const LEADING: f32 = 1.2;
    const BLOCK_GAP: f32 = 4.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin: 72.0,
            cursor: 72.0,
            blocks: Vec::new(),
        }
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self.cursor = margin;
        self
    }

    /// Adds a single-line block.
    pub fn line(self, text: &str, font_size: f32) -> Self {
        self.block(&[text], font_size)
    }

    /// Adds one block holding `lines`.
    pub fn block(mut self, lines: &[&str], font_size: f32) -> Self {
        let line_height = font_size * Self::LEADING;
        let mut laid_out = Vec::with_capacity(lines.len());
        for text in lines {
            let width = text.chars().count() as f32 * font_size * 0.5;
            let rect = Rect::new(
                self.margin,
                self.cursor,
                self.margin + width,
                self.cursor + line_height,
            );
            laid_out.push(TextLine::new(rect, *text, font_size));
            self.cursor += line_height;
        }
        if !laid_out.is_empty() {
            self.blocks.push(PageBlock::from_lines(laid_out));
            self.cursor += Self::BLOCK_GAP;
        }
        self
    }

    /// Whether a block of `lines` lines at `font_size` ends above the
    /// bottom margin.
    pub fn fits(&self, lines: usize, font_size: f32) -> bool {
        self.cursor + lines as f32 * font_size * Self::LEADING <= self.height - self.margin
    }

    /// Moves the cursor down by `points`.
    pub fn skip(mut self, points: f32) -> Self {
        self.cursor += points;
        self
    }

    pub fn build(self) -> Page {
        Page::new(self.width, self.height, self.blocks)
    }
}

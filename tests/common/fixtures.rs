//! Test fixtures and paper builders.
//!
//! Provides builders for creating test papers with a header of author
//! metadata, following the Builder pattern for clean test setup.

use anonymizer::document::{Document, Page, LETTER_HEIGHT, LETTER_WIDTH};
use anyhow::Result;
use printpdf::*;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// The single-line header used throughout the scenarios.
pub const SMITH_HEADER: &str = "John Smith jsmith@example.edu Dept. of Computer Science";

/// Values [`SMITH_HEADER`] is expected to yield.
pub const SMITH_VALUES: [&str; 3] = [
    "John Smith",
    "jsmith@example.edu",
    "Dept. of Computer Science",
];

/// Filled rectangle drawn by [`PaperPdfBuilder::with_figure`], as the
/// `re` operands `x y width height` in PDF user space.
pub const FIGURE_RECT: [f32; 4] = [72.0, 144.0, 144.0, 72.0];

/// Builder for creating test paper PDFs.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// let pdf = PaperPdfBuilder::new()
///     .with_header_line("John Smith jsmith@example.edu")
///     .with_body("Abstract")
///     .build(Path::new("/tmp/paper.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PaperPdfBuilder {
    title: Option<String>,
    header_lines: Vec<String>,
    body_lines: Vec<String>,
    extra_pages: Vec<Vec<String>>,
    figure: bool,
}

impl PaperPdfBuilder {
    pub fn new() -> Self {
        Self {
            title: None,
            header_lines: Vec::new(),
            body_lines: Vec::new(),
            extra_pages: Vec::new(),
            figure: false,
        }
    }

    /// Sets a large-type title at the top of page one.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Adds a line to the header, below the title.
    pub fn with_header_line(mut self, line: &str) -> Self {
        self.header_lines.push(line.to_string());
        self
    }

    /// Adds a line to the lower half of page one.
    pub fn with_body(mut self, line: &str) -> Self {
        self.body_lines.push(line.to_string());
        self
    }

    /// Adds a page of plain lines.
    pub fn with_page(mut self, lines: &[&str]) -> Self {
        self.extra_pages
            .push(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Draws a filled rectangle at [`FIGURE_RECT`] on the last page.
    pub fn with_figure(mut self) -> Self {
        self.figure = true;
        self
    }

    /// Builds the PDF and writes it to the specified path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let (doc, page1, layer1) =
            PdfDocument::new("Test Paper", Mm(215.9), Mm(279.4), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let layer = doc.get_page(page1).get_layer(layer1);

        let mut y = 255.0;
        if let Some(title) = &self.title {
            layer.use_text(title.as_str(), 20.0, Mm(25.4), Mm(y), &font);
            y -= 12.0;
        }
        for line in &self.header_lines {
            layer.use_text(line.as_str(), 10.0, Mm(25.4), Mm(y), &font);
            y -= 6.0;
        }
        let mut y = 100.0;
        for line in &self.body_lines {
            layer.use_text(line.as_str(), 10.0, Mm(25.4), Mm(y), &font);
            y -= 6.0;
        }

        for lines in &self.extra_pages {
            let (page, layer) = doc.add_page(Mm(215.9), Mm(279.4), "Layer 1");
            let layer = doc.get_page(page).get_layer(layer);
            let mut y = 255.0;
            for line in lines {
                layer.use_text(line.as_str(), 10.0, Mm(25.4), Mm(y), &font);
                y -= 6.0;
            }
        }

        doc.save(&mut BufWriter::new(fs::File::create(output_path)?))?;

        if self.figure {
            let mut pdf = lopdf::Document::load(output_path)?;
            let last = *pdf
                .get_pages()
                .values()
                .last()
                .ok_or_else(|| anyhow::anyhow!("fixture has no pages"))?;
            let [x, y, w, h] = FIGURE_RECT;
            let ops = format!("q 0 0 1 rg {} {} {} {} re f Q", x, y, w, h);
            pdf.add_page_contents(last, ops.into_bytes())?;
            pdf.save(output_path)?;
        }
        Ok(output_path.to_path_buf())
    }
}

impl Default for PaperPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory paper with `header` lines at the top and `body` lines below
/// the header region.
pub fn paper(header: &[&str], body: &[&str]) -> Document {
    let mut builder = Page::builder(LETTER_WIDTH, LETTER_HEIGHT);
    for line in header {
        builder = builder.line(line, 10.0);
    }
    builder = builder.skip(400.0);
    for line in body {
        builder = builder.line(line, 10.0);
    }
    Document::new(vec![builder.build()])
}

/// The John Smith paper, in memory.
pub fn smith_paper() -> Document {
    paper(&[SMITH_HEADER], &["1 Introduction"])
}

/// The John Smith paper as a PDF.
pub fn create_smith_pdf(path: &Path) -> Result<PathBuf> {
    PaperPdfBuilder::new()
        .with_header_line(SMITH_HEADER)
        .with_body("Introduction")
        .build(path)
}

//! [`Document`] → PDF via printpdf.
//!
//! Pages are re-rendered from the text model in a builtin Helvetica face.
//! Only text survives: images, vector art and original fonts are not
//! carried over. Used for documents that were not read from a PDF, or
//! whose pages no longer line up with their source file.

use crate::document::{Document, Page};
use crate::error::{AnonymizerError, AnonymizerResult};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Millimetres per PostScript point.
const MM_PER_PT: f32 = 25.4 / 72.0;

const DEFAULT_TITLE: &str = "Document";
const LAYER: &str = "Layer 1";

fn mm(points: f32) -> Mm {
    Mm(points * MM_PER_PT)
}

fn backend(message: String, err: printpdf::Error) -> AnonymizerError {
    AnonymizerError::BackendError {
        backend: "printpdf".to_string(),
        message,
        source: Some(Box::new(err)),
    }
}

/// Writes `document` to `path`.
pub fn write_document(document: &Document, path: &Path) -> AnonymizerResult<()> {
    let Some(first) = document.first_page() else {
        return Err(AnonymizerError::invalid_input(
            "document",
            "cannot write a document with no pages",
        ));
    };

    let title = document.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let (doc, page1, layer1) =
        PdfDocument::new(title, mm(first.width), mm(first.height), LAYER);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| backend("Failed to load builtin font".to_string(), e))?;

    draw_page(&doc.get_page(page1).get_layer(layer1), first, &font);
    for page in document.pages.iter().skip(1) {
        let (idx, layer) = doc.add_page(mm(page.width), mm(page.height), LAYER);
        draw_page(&doc.get_page(idx).get_layer(layer), page, &font);
    }

    let file = File::create(path).map_err(|e| AnonymizerError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| backend(format!("Failed to save {}", path.display()), e))
}

fn draw_page(layer: &PdfLayerReference, page: &Page, font: &IndirectFontRef) {
    for line in page.blocks.iter().flat_map(|b| b.lines.iter()) {
        if line.text.is_empty() {
            continue;
        }
        // Model y grows downwards from the top; PDF y grows upwards from
        // the bottom, measured at the baseline.
        let baseline = line.rect.y0 + line.font_size;
        layer.use_text(
            line.text.as_str(),
            line.font_size,
            mm(line.rect.x0),
            mm(page.height - baseline),
            font,
        );
    }
}

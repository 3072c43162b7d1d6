//! [`Document`] → PDF by patching the file it was read from.
//!
//! Overlay areas are burned into the source with MuPDF redaction
//! annotations, which remove the covered glyphs and image pixels for
//! good. The overlay text is then stamped over each area with lopdf.
//! Everything else on the page (figures, embedded fonts, vector art) is
//! carried over untouched. Source pages missing from the document are
//! deleted, and pages without a source are appended in Helvetica.

use crate::document::{Document, Page};
use crate::error::{AnonymizerError, AnonymizerResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use mupdf::pdf::{PdfAnnotationType, PdfDocument, PdfPage};
use mupdf::Rect as MuRect;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resource name of the overlay font.
const FONT_NAME: &str = "FAnon";

fn lopdf_error(message: String) -> impl FnOnce(lopdf::Error) -> AnonymizerError {
    move |e| AnonymizerError::BackendError {
        backend: "lopdf".to_string(),
        message,
        source: Some(Box::new(e)),
    }
}

fn path_str(path: &Path) -> AnonymizerResult<&str> {
    path.to_str()
        .ok_or_else(|| AnonymizerError::invalid_input("path", "Path contains invalid UTF-8"))
}

/// Whether `document` can be written over its source file.
///
/// Requires an existing source, source pages in their original relative
/// order, and every new page after the last source page.
pub fn can_patch(document: &Document) -> bool {
    let Some(source) = &document.source else {
        return false;
    };
    if !source.is_file() {
        return false;
    }
    let mut last: Option<usize> = None;
    let mut appended = false;
    for page in &document.pages {
        match page.source_index {
            Some(index) => {
                if appended || last.is_some_and(|l| index <= l) {
                    return false;
                }
                last = Some(index);
            }
            None => appended = true,
        }
    }
    last.is_some()
}

/// Writes `document` to `output` by patching its source file.
///
/// Callers check [`can_patch`] first.
pub fn patch_document(document: &Document, output: &Path) -> AnonymizerResult<()> {
    let source = document.source.as_deref().ok_or_else(|| {
        AnonymizerError::invalid_input("document", "document was not read from a file")
    })?;

    let scratch = scratch_path(output);
    let burned = burn_overlays(document, source, &scratch)?;
    let base = if burned { scratch.as_path() } else { source };
    let mut pdf = lopdf::Document::load(base)
        .map_err(lopdf_error(format!("Failed to load {}", base.display())))?;
    if burned {
        if let Err(e) = std::fs::remove_file(&scratch) {
            debug!(path = %scratch.display(), error = %e, "could not remove scratch file");
        }
    }

    stamp(&mut pdf, document)?;
    pdf.save(output)
        .map_err(|e| AnonymizerError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;
    debug!(output = %output.display(), pages = document.page_count(), "patched source PDF");
    Ok(())
}

/// Sibling of `output` used between the MuPDF and lopdf passes.
fn scratch_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".burn");
    output.with_file_name(name)
}

/// Applies a redaction annotation over every overlay area and saves the
/// result to `scratch`. Returns false, writing nothing, when no page has
/// overlays.
fn burn_overlays(document: &Document, source: &Path, scratch: &Path) -> AnonymizerResult<bool> {
    let pending: Vec<(usize, &Page)> = document
        .pages
        .iter()
        .filter(|p| !p.overlays.is_empty())
        .filter_map(|p| p.source_index.map(|i| (i, p)))
        .collect();
    if pending.is_empty() {
        return Ok(false);
    }

    let pdf_doc =
        PdfDocument::open(path_str(source)?).map_err(|e| AnonymizerError::PdfProcessing {
            message: "Failed to open PDF with MuPDF".to_string(),
            page: None,
            source: Some(Box::new(e)),
        })?;

    for (index, page) in pending {
        let page_number = index + 1;
        let mu_page =
            pdf_doc
                .load_page(index as i32)
                .map_err(|e| AnonymizerError::PdfProcessing {
                    message: format!("Failed to load page {}", page_number),
                    page: Some(page_number),
                    source: Some(Box::new(e)),
                })?;
        let bounds = mu_page.bounds().map_err(|e| AnonymizerError::BackendError {
            backend: "MuPDF".to_string(),
            message: format!("Failed to get bounds for page {}", page_number),
            source: Some(Box::new(e)),
        })?;
        let mut pdf_page = PdfPage::try_from(mu_page).map_err(|_| AnonymizerError::PdfProcessing {
            message: format!("Page {} is not a PDF page", page_number),
            page: Some(page_number),
            source: None,
        })?;

        for overlay in &page.overlays {
            let annot = pdf_page
                .create_annotation(PdfAnnotationType::Redact)
                .map_err(|e| AnonymizerError::PdfProcessing {
                    message: "Failed to create redaction annotation".to_string(),
                    page: Some(page_number),
                    source: Some(Box::new(e)),
                })?;
            let rect = MuRect {
                x0: overlay.area.x0 + bounds.x0,
                y0: overlay.area.y0 + bounds.y0,
                x1: overlay.area.x1 + bounds.x0,
                y1: overlay.area.y1 + bounds.y0,
            };
            unsafe {
                ffi::set_annotation_rect(&annot, rect);
            }
        }

        pdf_page.redact().map_err(|e| AnonymizerError::PdfProcessing {
            message: format!("Failed to apply redactions on page {}", page_number),
            page: Some(page_number),
            source: Some(Box::new(e)),
        })?;
        debug!(page = page_number, areas = page.overlays.len(), "burned overlay areas");
    }

    pdf_doc
        .save(path_str(scratch)?)
        .map_err(|e| AnonymizerError::PdfProcessing {
            message: "Failed to save redacted PDF".to_string(),
            page: None,
            source: Some(Box::new(e)),
        })?;
    Ok(true)
}

/// Stamps overlay text, drops pages missing from `document` and appends
/// pages that have no source.
fn stamp(pdf: &mut lopdf::Document, document: &Document) -> AnonymizerResult<()> {
    let source_pages = pdf.get_pages();
    let needs_font = document
        .pages
        .iter()
        .any(|p| p.source_index.is_none() || !p.overlays.is_empty());
    let font_id = needs_font.then(|| pdf.add_object(helvetica()));
    let kept: BTreeSet<u32> = document
        .pages
        .iter()
        .filter_map(|p| p.source_index)
        .map(|i| i as u32 + 1)
        .collect();

    for page in &document.pages {
        let (Some(index), Some(font_id)) = (page.source_index, font_id) else {
            continue;
        };
        if page.overlays.is_empty() {
            continue;
        }
        let number = index as u32 + 1;
        let page_id = *source_pages.get(&number).ok_or_else(|| {
            AnonymizerError::not_found(format!("page {} of the source PDF", number))
        })?;
        add_font_resource(pdf, page_id, font_id)
            .map_err(lopdf_error(format!("Failed to add font to page {}", number)))?;
        let content = overlay_content(page)
            .map_err(lopdf_error(format!("Failed to encode overlays for page {}", number)))?;
        wrap_contents(pdf, page_id, content)
            .map_err(lopdf_error(format!("Failed to update page {}", number)))?;
    }

    let dropped: Vec<u32> = source_pages
        .keys()
        .copied()
        .filter(|n| !kept.contains(n))
        .collect();
    if !dropped.is_empty() {
        debug!(pages = ?dropped, "deleting pages");
        pdf.delete_pages(&dropped);
        pdf.prune_objects();
    }

    if let Some(font_id) = font_id {
        for page in document.pages.iter().filter(|p| p.source_index.is_none()) {
            append_page(pdf, page, font_id)
                .map_err(lopdf_error("Failed to append page".to_string()))?;
        }
    }
    Ok(())
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Latin-1 text as WinAnsi bytes; anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn text_ops(ops: &mut Vec<Operation>, text: &str, font_size: f32, x: f32, y: f32) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(FONT_NAME.as_bytes().to_vec()), font_size.into()],
    ));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// White-out of each overlay area, then its text in black.
fn overlay_content(page: &Page) -> lopdf::Result<Vec<u8>> {
    let mut ops = Vec::new();
    for overlay in &page.overlays {
        let area = overlay.area;
        ops.push(Operation::new("g", vec![Object::Integer(1)]));
        ops.push(Operation::new(
            "re",
            vec![
                area.x0.into(),
                (page.height - area.y1).into(),
                area.width().into(),
                area.height().into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("g", vec![Object::Integer(0)]));
        if !overlay.text.is_empty() {
            // Same baseline rule as the re-rendering writer
            let baseline = overlay.span.y0 + overlay.font_size;
            text_ops(
                &mut ops,
                &overlay.text,
                overlay.font_size,
                overlay.span.x0,
                page.height - baseline,
            );
        }
    }
    Content { operations: ops }.encode()
}

/// Brackets the page's existing content in `q`/`Q` so its graphics state
/// cannot leak into `content`, which is drawn last.
fn wrap_contents(pdf: &mut lopdf::Document, page_id: ObjectId, content: Vec<u8>) -> lopdf::Result<()> {
    let existing: Vec<Object> = match pdf.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let open = pdf.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut body = b"Q\n".to_vec();
    body.extend(content);
    let close = pdf.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = vec![Object::Reference(open)];
    contents.extend(existing);
    contents.push(Object::Reference(close));
    pdf.get_dictionary_mut(page_id)?.set("Contents", contents);
    Ok(())
}

/// Nearest `Resources` entry on the page or its ancestors.
fn inherited_resources(pdf: &lopdf::Document, page_id: ObjectId) -> Option<Object> {
    let mut node = pdf.get_dictionary(page_id).ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            return Some(resources.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = pdf.get_dictionary(parent).ok()?;
    }
}

/// Registers the overlay font on a page, keeping any inherited resources.
fn add_font_resource(pdf: &mut lopdf::Document, page_id: ObjectId, font_id: ObjectId) -> lopdf::Result<()> {
    let inherited = inherited_resources(pdf, page_id);
    let page = pdf.get_dictionary_mut(page_id)?;
    if !page.has(b"Resources") {
        page.set(
            "Resources",
            inherited.unwrap_or_else(|| Object::Dictionary(Dictionary::new())),
        );
    }

    let fonts_ref = {
        let resources = pdf.get_or_create_resources(page_id).and_then(Object::as_dict_mut)?;
        if !resources.has(b"Font") {
            resources.set("Font", Dictionary::new());
        }
        resources.get(b"Font").and_then(Object::as_reference).ok()
    };
    let fonts = match fonts_ref {
        Some(id) => pdf.get_dictionary_mut(id)?,
        None => pdf
            .get_or_create_resources(page_id)
            .and_then(Object::as_dict_mut)?
            .get_mut(b"Font")
            .and_then(Object::as_dict_mut)?,
    };
    fonts.set(FONT_NAME, Object::Reference(font_id));
    Ok(())
}

/// Adds `page` as a new last page, drawn line by line.
fn append_page(pdf: &mut lopdf::Document, page: &Page, font_id: ObjectId) -> lopdf::Result<()> {
    let pages_id = pdf.catalog()?.get(b"Pages").and_then(Object::as_reference)?;

    let mut ops = Vec::new();
    for line in page.blocks.iter().flat_map(|b| b.lines.iter()) {
        if line.text.is_empty() {
            continue;
        }
        let baseline = line.rect.y0 + line.font_size;
        text_ops(&mut ops, &line.text, line.font_size, line.rect.x0, page.height - baseline);
    }
    let content = Content { operations: ops }.encode()?;
    let content_id = pdf.add_object(Stream::new(Dictionary::new(), content));

    let page_id = pdf.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page.width),
            Object::Real(page.height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { FONT_NAME => font_id },
        },
    });

    let pages = pdf.get_dictionary_mut(pages_id)?;
    pages
        .get_mut(b"Kids")
        .and_then(Object::as_array_mut)?
        .push(Object::Reference(page_id));
    let count = pages.get(b"Count").and_then(Object::as_i64)?;
    pages.set("Count", count + 1);
    Ok(())
}

/// FFI helpers for MuPDF annotation operations.
mod ffi {
    use mupdf::pdf::PdfAnnotation;
    use mupdf::Rect;

    /// Sets the rectangle of a PDF annotation.
    ///
    /// # Safety
    /// Calls into MuPDF's C API with the annotation's raw pointer. The
    /// annotation must still belong to a live page.
    pub unsafe fn set_annotation_rect(annot: &PdfAnnotation, rect: Rect) {
        #[repr(C)]
        struct PdfAnnotRaw {
            inner: *mut mupdf_sys::pdf_annot,
        }

        let annot_raw = std::mem::transmute::<&PdfAnnotation, &PdfAnnotRaw>(annot);
        let ctx = mupdf_sys::mupdf_new_base_context();
        if ctx.is_null() {
            return;
        }
        let fz_rect = mupdf_sys::fz_rect {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
        };
        mupdf_sys::pdf_set_annot_rect(ctx, annot_raw.inner, fz_rect);
        mupdf_sys::mupdf_drop_base_context(ctx);
    }
}

//! Overlap-safe, in-place text redaction.

use super::plan::{RedactionPlan, RedactionReport};
use crate::document::{HeaderRegion, Page, Rect, TextEdit, TextExtractor};
use crate::error::AnonymizerResult;
use tracing::debug;

/// Replaces plan values on a page with their markers.
///
/// Longer values are handled first. An occurrence whose rectangle
/// overlaps one already redacted is skipped, so `Smith` is not redacted a
/// second time inside an already covered `John Smith`. Edits are
/// collected and applied together to a copy of the page; the input page
/// is never modified. Each redaction also leaves an [`Overlay`] on the
/// copy, so the covered area is blanked when the page is written back
/// over its source PDF.
///
/// [`Overlay`]: crate::document::Overlay
#[derive(Debug, Clone)]
pub struct RedactionEngine {
    /// Padding in points blanked around each redacted rectangle
    pad: f32,
}

impl Default for RedactionEngine {
    fn default() -> Self {
        Self { pad: 1.0 }
    }
}

impl RedactionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the padding applied around each redaction.
    pub fn with_pad(mut self, pad: f32) -> Self {
        self.pad = pad;
        self
    }

    /// Redacts every occurrence of each plan value inside `region`.
    ///
    /// Fails, without producing a page, when the page geometry cannot be
    /// read.
    pub fn redact(
        &self,
        page: &Page,
        plan: &RedactionPlan,
        region: &HeaderRegion,
    ) -> AnonymizerResult<(Page, RedactionReport)> {
        // Validates geometry before any edit is planned
        TextExtractor::extract(page, 1)?;

        let mut report = RedactionReport::default();
        let mut covered: Vec<Rect> = Vec::new();
        let mut edits: Vec<TextEdit> = Vec::new();
        let mut redacted = page.clone();

        for entry in plan.ordered() {
            for occurrence in page.find(&entry.original, region) {
                if covered.iter().any(|c| c.overlaps(&occurrence.rect)) {
                    report.skipped_overlaps += 1;
                    continue;
                }
                covered.push(occurrence.rect);
                report.regions.push(occurrence.rect.padded(self.pad));
                report.instances_redacted += 1;
                redacted.overlay(&occurrence, entry.marker.clone(), self.pad);
                edits.push(occurrence.into_edit(entry.marker.clone()));
            }
        }

        debug!(
            redacted = report.instances_redacted,
            skipped = report.skipped_overlaps,
            "redaction pass complete"
        );

        redacted.apply_edits(edits);
        Ok((redacted, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LETTER_HEIGHT, LETTER_WIDTH};
    use crate::error::AnonymizerError;
    use crate::redaction::MarkerStyle;

    fn plan(values: &[&str]) -> RedactionPlan {
        let mut plan = RedactionPlan::new();
        for v in values {
            plan.add_value(v, MarkerStyle::LengthPreserving);
        }
        plan
    }

    #[test]
    fn test_redacts_all_values() {
        let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("John Smith jsmith@example.edu Dept. of Computer Science", 10.0)
            .build();
        let region = HeaderRegion::new(&page, 0.5);
        let (out, report) = RedactionEngine::new()
            .redact(
                &page,
                &plan(&["John Smith", "jsmith@example.edu", "Dept. of Computer Science"]),
                &region,
            )
            .unwrap();

        assert_eq!(report.instances_redacted, 3);
        let text = out.text();
        assert!(!text.contains("John Smith"));
        assert!(!text.contains("jsmith@example.edu"));
        assert!(!text.contains("Computer Science"));
        assert_eq!(text.chars().count(), page.text().chars().count());
    }

    #[test]
    fn test_substring_inside_longer_value_skipped() {
        let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("John Smith", 10.0)
            .line("Smith", 10.0)
            .build();
        let region = HeaderRegion::full(&page);
        let (out, report) = RedactionEngine::new()
            .redact(&page, &plan(&["Smith", "John Smith"]), &region)
            .unwrap();

        // Standalone "Smith" on line two is still redacted
        assert_eq!(report.instances_redacted, 2);
        assert_eq!(report.skipped_overlaps, 1);
        assert_eq!(out.text(), "**********\n*****");
    }

    #[test]
    fn test_outside_region_untouched() {
        let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("Ada Lovelace", 10.0)
            .skip(500.0)
            .line("Ada Lovelace", 10.0)
            .build();
        let region = HeaderRegion::new(&page, 0.5);
        let (out, report) = RedactionEngine::new()
            .redact(&page, &plan(&["Ada Lovelace"]), &region)
            .unwrap();
        assert_eq!(report.instances_redacted, 1);
        assert_eq!(out.text(), "************\nAda Lovelace");
    }

    #[test]
    fn test_regions_are_padded() {
        let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("Ada Lovelace", 10.0)
            .build();
        let region = HeaderRegion::full(&page);
        let (_, report) = RedactionEngine::new()
            .with_pad(2.0)
            .redact(&page, &plan(&["Ada Lovelace"]), &region)
            .unwrap();
        let line = page.blocks[0].lines[0].rect;
        assert_eq!(report.regions.len(), 1);
        assert_eq!(report.regions[0].x0, line.x0 - 2.0);
        assert_eq!(report.regions[0].y0, line.y0 - 2.0);
        assert_eq!(report.regions[0].y1, line.y1 + 2.0);
    }

    #[test]
    fn test_padded_overlays_left_for_write_back() {
        let page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("Ada Lovelace ada@engine.org", 10.0)
            .build();
        let region = HeaderRegion::full(&page);
        let (out, report) = RedactionEngine::new()
            .with_pad(3.0)
            .redact(&page, &plan(&["Ada Lovelace", "ada@engine.org"]), &region)
            .unwrap();

        assert!(page.overlays.is_empty());
        assert_eq!(out.overlays.len(), 2);
        let areas: Vec<Rect> = out.overlays.iter().map(|o| o.area).collect();
        assert_eq!(areas, report.regions);
        for overlay in &out.overlays {
            assert_eq!(overlay.area, overlay.span.padded(3.0));
            assert_eq!(overlay.text.chars().count(), overlay.text.matches('*').count());
        }
    }

    #[test]
    fn test_malformed_page_aborts_without_output() {
        let mut page = Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("Ada Lovelace", 10.0)
            .build();
        page.blocks[0].rect = Rect::new(0.0, 10.0, 5.0, f32::NAN);
        let region = HeaderRegion::full(&page);
        let err = RedactionEngine::new()
            .redact(&page, &plan(&["Ada Lovelace"]), &region)
            .unwrap_err();
        assert!(matches!(err, AnonymizerError::Extraction { .. }));
    }
}

//! Flat text plus positioned blocks for one page.

use super::{Page, PageBlock};
use crate::error::{AnonymizerError, AnonymizerResult};

/// Output of [`TextExtractor::extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub full_text: String,
    /// Blocks in the order the source enumerated them, which is not
    /// necessarily top-to-bottom.
    pub blocks: Vec<PageBlock>,
}

/// Reads a page as a string and as a block list.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl TextExtractor {
    /// Extracts the text of `page`.
    ///
    /// `page_number` is only used for error context. Fails when any block
    /// or line carries degenerate geometry.
    pub fn extract(page: &Page, page_number: usize) -> AnonymizerResult<ExtractedText> {
        if !(page.width.is_finite() && page.height.is_finite())
            || page.width <= 0.0
            || page.height <= 0.0
        {
            return Err(AnonymizerError::Extraction {
                page: Some(page_number),
                reason: format!("invalid page size {}x{}", page.width, page.height),
            });
        }

        for (idx, block) in page.blocks.iter().enumerate() {
            let bad_line = block.lines.iter().any(|l| !l.rect.is_well_formed());
            if !block.rect.is_well_formed() || bad_line {
                return Err(AnonymizerError::Extraction {
                    page: Some(page_number),
                    reason: format!("block {} has malformed geometry", idx),
                });
            }
        }

        Ok(ExtractedText {
            full_text: page.text(),
            blocks: page.blocks.clone(),
        })
    }
}

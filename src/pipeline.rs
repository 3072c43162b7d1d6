//! De-identification and re-identification over in-memory documents.
//!
//! ```text
//! Document ─▶ extract ─▶ encrypt ─▶ redact ─▶ (Document', Mapping)
//! (Document', Mapping) ─▶ decrypt ─▶ restore ─▶ Document
//! ```
//!
//! Every operation takes its inputs by reference and returns new values;
//! nothing here touches the filesystem.

use crate::config::{AnonymizerConfig, EncryptionKey};
use crate::crypto::FieldCodec;
use crate::document::{Document, HeaderRegion};
use crate::domain::{AuthorRecord, FieldKind, SensitiveFieldExtractor};
use crate::error::{AnonymizerError, AnonymizerResult};
use crate::mapping::{info_page, EncryptedField, FieldFlags, Mapping};
use crate::redaction::{RedactionEngine, RedactionPlan, RedactionReport};
use crate::reversal::{FailureReason, FieldFailure, ReidentifyOutcome, ReversalEngine};
use tracing::{debug, info, warn};

/// Result of [`Anonymizer::deidentify`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeidentifyOutcome {
    pub document: Document,
    pub mapping: Mapping,
    pub report: RedactionReport,
}

impl DeidentifyOutcome {
    /// Errors with [`AnonymizerError::NoSensitiveData`] when nothing was
    /// redacted. The document is still returned unchanged in that case;
    /// this lets callers surface it.
    pub fn ensure_found(&self) -> AnonymizerResult<()> {
        if self.mapping.is_empty() {
            return Err(AnonymizerError::NoSensitiveData);
        }
        Ok(())
    }
}

/// The de-identification / re-identification pipeline.
#[derive(Debug)]
pub struct Anonymizer {
    config: AnonymizerConfig,
    codec: FieldCodec,
    extractor: SensitiveFieldExtractor,
    engine: RedactionEngine,
}

impl Anonymizer {
    /// Builds a pipeline from a validated config and an explicit key.
    pub fn new(config: AnonymizerConfig, key: EncryptionKey) -> AnonymizerResult<Self> {
        config.validate()?;
        Ok(Self {
            extractor: SensitiveFieldExtractor::new(config.header_fraction),
            engine: RedactionEngine::new().with_pad(config.redaction_pad),
            codec: FieldCodec::new(key),
            config,
        })
    }

    /// Replaces the default extractor, for custom matcher strategies.
    pub fn with_extractor(mut self, extractor: SensitiveFieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AnonymizerConfig {
        &self.config
    }

    /// Author records detected on page one, without modifying anything.
    pub fn scan(&self, document: &Document) -> AnonymizerResult<Vec<AuthorRecord>> {
        let page = document
            .first_page()
            .ok_or_else(|| AnonymizerError::not_found("page 1"))?;
        self.extractor.extract(page)
    }

    /// Detects, encrypts and redacts the enabled field kinds.
    ///
    /// When nothing enabled is found the document comes back unchanged
    /// with an empty mapping; see [`DeidentifyOutcome::ensure_found`].
    pub fn deidentify(
        &self,
        document: &Document,
        options: FieldFlags,
    ) -> AnonymizerResult<DeidentifyOutcome> {
        let records = self.scan(document)?;
        debug!(records = records.len(), "extracted author records");

        let mut found = FieldFlags::none();
        let mut fields: Vec<EncryptedField> = Vec::new();
        let mut plan = RedactionPlan::new();
        for record in &records {
            for kind in options.enabled() {
                let Some(value) = record.get(kind) else {
                    continue;
                };
                found.set(kind, true);
                fields.push(self.seal(kind, value));
                plan.add_value(value, self.config.marker);
            }
        }

        if plan.is_empty() {
            info!("no sensitive data found; document left unchanged");
            return Ok(DeidentifyOutcome {
                document: document.clone(),
                mapping: Mapping::empty(options),
                report: RedactionReport::default(),
            });
        }

        let mut redacted = document.clone();
        let page = &document.pages[0];
        let region = HeaderRegion::new(page, self.config.header_fraction);
        let (page, report) = self.engine.redact(page, &plan, &region)?;
        redacted.pages[0] = page;

        if self.config.append_info_page {
            let first = &redacted.pages[0];
            let info = info_page::render(&fields, first.width, first.height);
            debug!(pages = info.len(), "appending encrypted information");
            redacted.pages.extend(info);
        }

        info!(
            fields = fields.len(),
            redacted = report.instances_redacted,
            "document de-identified"
        );
        Ok(DeidentifyOutcome {
            document: redacted,
            mapping: Mapping::build(fields, options, found),
            report,
        })
    }

    /// Restores a document from its mapping.
    pub fn reidentify(
        &self,
        document: &Document,
        mapping: &Mapping,
    ) -> AnonymizerResult<ReidentifyOutcome> {
        let outcome = self.reversal().reverse(document, mapping)?;
        info!(
            applied = outcome.applied,
            failed = outcome.failures.len(),
            "document re-identified"
        );
        Ok(outcome)
    }

    /// Restores a document from its own ENCRYPTED INFORMATION pages, which
    /// are removed from the result.
    ///
    /// Entries that cannot be read are reported as
    /// [`FailureReason::Incomplete`]; the readable ones are still restored.
    /// Failure indices count entries across all information pages.
    pub fn reidentify_embedded(&self, document: &Document) -> AnonymizerResult<ReidentifyOutcome> {
        let mut entries = Vec::new();
        let mut kept = Vec::with_capacity(document.page_count());
        for (idx, page) in document.pages.iter().enumerate() {
            if idx > 0 && info_page::is_info_page(page) {
                entries.extend(info_page::parse(page, idx + 1));
            } else {
                kept.push(page.clone());
            }
        }
        if kept.len() == document.page_count() {
            return Err(AnonymizerError::not_found("ENCRYPTED INFORMATION page"));
        }

        let mut fields = Vec::new();
        let mut positions = Vec::new();
        let mut incomplete = Vec::new();
        for (position, entry) in entries.into_iter().enumerate() {
            match entry {
                Ok(field) => {
                    positions.push(position);
                    fields.push(field);
                }
                Err(entry) => {
                    warn!(
                        page = entry.page,
                        kind = %entry.kind,
                        reason = %entry.reason,
                        "skipping incomplete information entry"
                    );
                    incomplete.push(FieldFailure {
                        index: position,
                        kind: entry.kind,
                        reason: FailureReason::Incomplete(entry.reason),
                    });
                }
            }
        }

        let mut found = FieldFlags::none();
        for field in &fields {
            found.set(field.kind, true);
        }
        let mapping = Mapping::build(fields, found, found);

        let stripped = Document {
            title: document.title.clone(),
            pages: kept,
            source: document.source.clone(),
        };
        let mut outcome = self.reidentify(&stripped, &mapping)?;
        for failure in &mut outcome.failures {
            failure.index = positions[failure.index];
        }
        outcome.failures.extend(incomplete);
        outcome.failures.sort_by_key(|f| f.index);
        Ok(outcome)
    }

    /// Recovers the value behind `hash`.
    ///
    /// `hash` is either a SHA-256 digest from the mapping, the SHA-256 of a
    /// reversible field's value, or a reversible field's token itself.
    pub fn reidentify_by_token(&self, hash: &str, mapping: &Mapping) -> AnonymizerResult<String> {
        let hash = hash.trim();
        for field in &mapping.encrypted_data {
            if field.algorithm.is_reversible() {
                let Ok(value) = self.codec.decrypt_reversible(&field.encrypted) else {
                    continue;
                };
                if field.encrypted == hash || FieldCodec::hash_one_way(&value) == hash {
                    return Ok(value);
                }
            } else if field.encrypted.eq_ignore_ascii_case(hash) {
                if let Some(original) = &field.original {
                    return Ok(original.clone());
                }
            }
        }
        Err(AnonymizerError::not_found(format!("value for token '{}'", hash)))
    }

    fn seal(&self, kind: FieldKind, value: &str) -> EncryptedField {
        EncryptedField::seal(
            &self.codec,
            kind,
            value,
            self.config.is_one_way(kind),
            self.config.embed_plaintext,
        )
    }

    fn reversal(&self) -> ReversalEngine {
        ReversalEngine::new(
            self.codec.clone(),
            self.config.marker,
            self.config.header_fraction,
        )
        .with_pad(self.config.redaction_pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Page, PageBlock, TextLine, LETTER_HEIGHT, LETTER_WIDTH};
    use crate::redaction::MarkerStyle;

    fn anonymizer(config: AnonymizerConfig) -> Anonymizer {
        Anonymizer::new(config, EncryptionKey::from_passphrase("pipeline-test")).unwrap()
    }

    fn header_doc() -> Document {
        Document::new(vec![Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("John Smith jsmith@example.edu Dept. of Computer Science", 10.0)
            .skip(40.0)
            .line("Abstract", 10.0)
            .build()])
    }

    #[test]
    fn test_deidentify_then_reidentify() {
        let anon = anonymizer(AnonymizerConfig::default());
        let doc = header_doc();
        let out = anon.deidentify(&doc, FieldFlags::default()).unwrap();

        let text = out.document.text();
        for value in ["John Smith", "jsmith@example.edu", "Dept. of Computer Science"] {
            assert!(!text.contains(value), "{} still present", value);
        }
        assert_eq!(
            out.mapping.sensitive_data_found,
            FieldFlags::from_kinds(&[FieldKind::Name, FieldKind::Email, FieldKind::Affiliation])
        );

        let back = anon.reidentify(&out.document, &out.mapping).unwrap();
        assert!(back.is_complete());
        assert_eq!(back.document, doc);
    }

    #[test]
    fn test_disabled_kinds_are_left_alone() {
        let anon = anonymizer(AnonymizerConfig::default());
        let options = FieldFlags::from_kinds(&[FieldKind::Email]);
        let out = anon.deidentify(&header_doc(), options).unwrap();
        let text = out.document.text();
        assert!(text.contains("John Smith"));
        assert!(!text.contains("jsmith@example.edu"));
        assert!(!out.mapping.sensitive_data_found.name);
    }

    #[test]
    fn test_nothing_found_returns_unchanged() {
        let anon = anonymizer(AnonymizerConfig::default());
        let doc = Document::new(vec![Page::builder(LETTER_WIDTH, LETTER_HEIGHT)
            .line("an untitled note about nothing in particular", 10.0)
            .build()]);
        let out = anon.deidentify(&doc, FieldFlags::all()).unwrap();
        assert_eq!(out.document, doc);
        assert_eq!(out.mapping.sensitive_data_found, FieldFlags::none());
        assert!(matches!(
            out.ensure_found(),
            Err(AnonymizerError::NoSensitiveData)
        ));
    }

    #[test]
    fn test_embedded_info_page_round_trip() {
        let config = AnonymizerConfig {
            append_info_page: true,
            ..Default::default()
        };
        let anon = anonymizer(config);
        let doc = header_doc();
        let out = anon.deidentify(&doc, FieldFlags::default()).unwrap();
        assert_eq!(out.document.page_count(), 2);

        let back = anon.reidentify_embedded(&out.document).unwrap();
        assert!(back.is_complete());
        assert_eq!(back.document, doc);
    }

    #[test]
    fn test_embedded_damaged_entry_reported_per_field() {
        let config = AnonymizerConfig {
            append_info_page: true,
            ..Default::default()
        };
        let anon = anonymizer(config);
        let doc = header_doc();
        let mut out = anon.deidentify(&doc, FieldFlags::default()).unwrap();
        let info = out.document.pages.last_mut().unwrap();
        let rect = info.blocks[0].rect;
        info.blocks.insert(
            1,
            PageBlock::from_lines(vec![
                TextLine::new(rect, "Title:", 6.0),
                TextLine::new(rect, "Encrypted: 00:11", 6.0),
            ]),
        );

        let back = anon.reidentify_embedded(&out.document).unwrap();
        assert_eq!(back.applied, 3);
        assert_eq!(back.document.text(), doc.text());
        assert_eq!(back.failures.len(), 1);
        assert_eq!(back.failures[0].index, 0);
        assert_eq!(back.failures[0].kind, FieldKind::Title);
        assert!(matches!(back.failures[0].reason, FailureReason::Incomplete(_)));
    }

    #[test]
    fn test_embedded_without_info_page_is_not_found() {
        let anon = anonymizer(AnonymizerConfig::default());
        let err = anon.reidentify_embedded(&header_doc()).unwrap_err();
        assert!(matches!(err, AnonymizerError::NotFound { .. }));
    }

    #[test]
    fn test_lookup_by_hash() {
        let config = AnonymizerConfig {
            one_way_fields: vec![FieldKind::Email],
            ..Default::default()
        };
        let anon = anonymizer(config);
        let out = anon.deidentify(&header_doc(), FieldFlags::default()).unwrap();

        let email_hash = FieldCodec::hash_one_way("jsmith@example.edu");
        assert_eq!(
            anon.reidentify_by_token(&email_hash, &out.mapping).unwrap(),
            "jsmith@example.edu"
        );
        let name_hash = FieldCodec::hash_one_way("John Smith");
        assert_eq!(
            anon.reidentify_by_token(&name_hash, &out.mapping).unwrap(),
            "John Smith"
        );
        assert!(anon.reidentify_by_token("deadbeef", &out.mapping).is_err());
    }

    #[test]
    fn test_hash_markers_round_trip() {
        let config = AnonymizerConfig {
            marker: MarkerStyle::Hash,
            ..Default::default()
        };
        let anon = anonymizer(config);
        let doc = header_doc();
        let out = anon.deidentify(&doc, FieldFlags::default()).unwrap();
        let back = anon.reidentify(&out.document, &out.mapping).unwrap();
        assert_eq!(back.document, doc);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The extractor: one pass over the pages collects text spans, links and image
// previews; the font-size profile built along the way then drives heading
// classification and title resolution.

use std::collections::BTreeSet;
use std::path::Path;

use outlineiq_core::error::{OutlineError, Result};
use outlineiq_core::{DocumentMetadata, ExtractOptions, ExtractionResult, ImagePreview};
use tracing::{debug, error, info, instrument, warn};

use crate::image::{ImageProcessor, decode_image, page_images};
use crate::outline::{FontSizeProfile, TitleResolver, assemble_headings};
use crate::pdf::links::page_links;
use crate::pdf::text::survey_page;
use crate::pdf::{PdfReader, TextSpan};

/// Turns PDF bytes into an [`ExtractionResult`].
///
/// Only an unopenable document is an error. Anything that goes wrong with a
/// single page element (text layer, link annotation, image) is logged and the
/// element is left out.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract from an in-memory PDF.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn extract(&self, data: &[u8]) -> Result<ExtractionResult> {
        let reader = PdfReader::from_bytes(data)?;
        Ok(self.extract_from(&reader))
    }

    /// Extract from a PDF on disk.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<ExtractionResult> {
        let reader = PdfReader::open(path)?;
        Ok(self.extract_from(&reader))
    }

    fn extract_from(&self, reader: &PdfReader) -> ExtractionResult {
        let doc = reader.document();
        let mut profile = FontSizeProfile::new(self.options.size_precision);
        let mut spans: Vec<TextSpan> = Vec::new();
        let mut pages_with_images = BTreeSet::new();
        let mut metadata = DocumentMetadata::default();

        for (page, page_id) in reader.pages() {
            match survey_page(reader, page, page_id) {
                Ok(found) => {
                    for span in &found {
                        profile.record(span.font_size);
                    }
                    spans.extend(found);
                }
                Err(err) => log_skipped(page, "text layer", &err),
            }

            match page_links(doc, page, page_id) {
                Ok(links) => metadata.links.extend(links),
                Err(err) => log_skipped(page, "links", &err),
            }

            let images = page_images(doc, reader.page_resources(page_id));
            if !images.is_empty() {
                pages_with_images.insert(page);
            }
            let limit = if self.options.first_image_only { 1 } else { images.len() };
            for image in images.iter().take(limit) {
                let preview = decode_image(doc, image.stream).and_then(|decoded| {
                    ImageProcessor::from_dynamic(decoded)
                        .thumbnail(self.options.preview_max_dimension)
                        .to_data_uri()
                });
                match preview {
                    Ok(preview) => metadata.image_previews.push(ImagePreview { page, preview }),
                    Err(err) => {
                        let element = format!("image {}", String::from_utf8_lossy(image.name));
                        log_skipped(page, &element, &err);
                    }
                }
            }
        }

        if profile.is_empty() {
            debug!("No text layer found; the outline will be empty");
        }
        debug!(
            spans = spans.len(),
            distinct_sizes = profile.distinct(),
            ranked = ?profile.ranked(),
            "Font-size profile complete"
        );

        let headings = assemble_headings(spans, &profile, self.options.dedupe_headings);
        let resolver = TitleResolver::new(reader.title(), self.options.untitled_placeholder.as_str());
        let (title, source) = resolver.resolve(&headings);
        metadata.pages_with_images = pages_with_images.into_iter().collect();

        info!(
            source = reader.source_path().unwrap_or("<memory>"),
            pages = reader.page_count(),
            headings = headings.len(),
            links = metadata.links.len(),
            previews = metadata.image_previews.len(),
            title_source = ?source,
            "Extraction complete"
        );

        ExtractionResult {
            title,
            headings,
            metadata,
        }
    }
}

/// Per-element failures are expected and only warned about; any other error
/// kind reaching this point is reported at error level.
fn log_skipped(page: u32, element: &str, err: &OutlineError) {
    if err.is_element_skip() {
        warn!(page, element, error = %err, "Skipping element");
    } else {
        error!(page, element, error = %err, "Skipping element after unexpected failure");
    }
}

/// Extract with default options.
pub fn extract(data: &[u8]) -> Result<ExtractionResult> {
    Extractor::default().extract(data)
}

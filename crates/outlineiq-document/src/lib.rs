// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// outlineiq-document: PDF outline extraction for OutlineIQ.
//
// Reads a PDF with `lopdf`, surveys the text layer to rank font sizes into
// H1/H2/H3 headings, collects URI link annotations, and encodes embedded
// images as PNG thumbnail data URIs.

pub mod extract;
pub mod image;
pub mod outline;
pub mod pdf;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary entry points so callers can use `outlineiq_document::Extractor` etc.
pub use extract::{Extractor, extract};
pub use image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: the JSON shape produced by every extraction.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outline rank derived from relative font size. H1 is the largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Number of distinct levels an outline can use.
    pub const COUNT: usize = 3;

    /// Map a zero-based size rank (0 = largest) to a level.
    pub fn from_rank(rank: usize) -> Option<Self> {
        match rank {
            0 => Some(Self::H1),
            1 => Some(Self::H2),
            2 => Some(Self::H3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
        }
    }
}

impl std::fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
    /// 1-based page number.
    pub page: u32,
    /// Rounded effective font size in points.
    pub font_size: f32,
}

/// A hyperlink annotation with a URI target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub page: u32,
    pub uri: String,
}

/// A thumbnail of one embedded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePreview {
    pub page: u32,
    /// `data:image/png;base64,...`
    pub preview: String,
}

/// Page-level facts gathered alongside the outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Ascending, no duplicates.
    pub pages_with_images: Vec<u32>,
    pub links: Vec<Link>,
    pub image_previews: Vec<ImagePreview>,
}

/// Root output of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub headings: Vec<Heading>,
    pub metadata: DocumentMetadata,
}

impl ExtractionResult {
    /// A minimally populated result (no pages, or no text layer).
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            headings: Vec::new(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// Pretty-printed JSON, as written by the batch job and offered for download.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Headings at the given level, in document order.
    pub fn headings_at(&self, level: HeadingLevel) -> impl Iterator<Item = &Heading> {
        self.headings.iter().filter(move |h| h.level == level)
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Title resolution: metadata, then the first H1, then a placeholder.

use outlineiq_core::{Heading, HeadingLevel};

/// Which link of the chain produced the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Metadata,
    FirstHeading,
    Placeholder,
}

/// Ordered title fallback chain. Built before the heading pass, resolved after
/// it, so an absent `/Title` never blocks extraction.
#[derive(Debug, Clone)]
pub struct TitleResolver {
    metadata: Option<String>,
    placeholder: String,
}

impl TitleResolver {
    pub fn new(metadata: Option<String>, placeholder: impl Into<String>) -> Self {
        Self {
            metadata,
            placeholder: placeholder.into(),
        }
    }

    /// Walk the chain; later links are only evaluated if earlier ones are blank.
    pub fn resolve(self, headings: &[Heading]) -> (String, TitleSource) {
        let placeholder = self.placeholder;
        self.metadata
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .map(|title| (title, TitleSource::Metadata))
            .or_else(|| {
                headings
                    .iter()
                    .find(|h| h.level == HeadingLevel::H1)
                    .map(|h| (h.text.clone(), TitleSource::FirstHeading))
            })
            .unwrap_or((placeholder, TitleSource::Placeholder))
    }
}

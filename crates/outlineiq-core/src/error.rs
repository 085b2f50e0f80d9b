// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for OutlineIQ.

use thiserror::Error;

/// Top-level error type for all OutlineIQ operations.
#[derive(Debug, Error)]
pub enum OutlineError {
    // -- Fatal to a single extraction call --
    #[error("unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("PDF is encrypted and cannot be opened without a password")]
    Encrypted,

    // -- Per-element failures (skipped inside the extractor) --
    #[error("image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("link annotation could not be resolved: {0}")]
    LinkResolution(String),

    #[error("text layer could not be read: {0}")]
    TextLayer(String),

    // -- Collaborators --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("batch input error: {0}")]
    BatchInput(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutlineError {
    /// True for the errors that abort an extraction call outright.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::UnreadablePdf(_) | Self::Encrypted)
    }

    /// True for per-element failures that the extractor logs and skips.
    pub fn is_element_skip(&self) -> bool {
        matches!(
            self,
            Self::ImageDecode(_) | Self::LinkResolution(_) | Self::TextLayer(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OutlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_counts_as_unreadable() {
        assert!(OutlineError::Encrypted.is_unreadable());
        assert!(OutlineError::UnreadablePdf("bad header".into()).is_unreadable());
        assert!(!OutlineError::ImageDecode("x".into()).is_unreadable());
    }

    #[test]
    fn element_failures_are_skippable() {
        assert!(OutlineError::ImageDecode("jpx".into()).is_element_skip());
        assert!(OutlineError::LinkResolution("no uri".into()).is_element_skip());
        assert!(!OutlineError::Config("zero".into()).is_element_skip());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err: OutlineError = io.into();
        assert!(matches!(err, OutlineError::Io(_)));
        assert!(err.to_string().contains("missing.pdf"));
    }
}

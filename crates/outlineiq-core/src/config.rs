// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction and batch configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};

/// Knobs for a single extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Longest edge of an image preview, in pixels.
    pub preview_max_dimension: u32,
    /// Preview only the first image found on each page.
    pub first_image_only: bool,
    /// Drop repeated headings (same level, case-folded text, and page).
    pub dedupe_headings: bool,
    /// Decimal places font sizes are rounded to before ranking.
    pub size_precision: u32,
    /// Title used when neither metadata nor an H1 provides one.
    pub untitled_placeholder: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preview_max_dimension: 160,
            first_image_only: false,
            dedupe_headings: true,
            size_precision: 1,
            untitled_placeholder: "Untitled".to_string(),
        }
    }
}

impl ExtractOptions {
    /// Reject settings the extractor cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.preview_max_dimension == 0 {
            return Err(OutlineError::Config(
                "preview_max_dimension must be at least 1 pixel".into(),
            ));
        }
        // 10^6 already exceeds any meaningful font-size resolution.
        if self.size_precision > 6 {
            return Err(OutlineError::Config(format!(
                "size_precision {} is out of range (0..=6)",
                self.size_precision
            )));
        }
        Ok(())
    }
}

/// Settings for unattended directory-to-directory processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory scanned for `*.pdf` files.
    pub input_dir: PathBuf,
    /// Directory receiving one `<stem>.json` per input.
    pub output_dir: PathBuf,
    /// Replace existing output files.
    pub overwrite: bool,
    /// Process files concurrently.
    pub parallel: bool,
    /// Options forwarded to every extraction.
    pub extract: ExtractOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            overwrite: true,
            parallel: false,
            extract: ExtractOptions::default(),
        }
    }
}

impl BatchConfig {
    /// Load a batch configuration from a JSON file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            OutlineError::Config(format!("{}: {}", path.display(), err))
        })?;
        config.extract.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ExtractOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.preview_max_dimension, 160);
        assert!(!options.first_image_only);
    }

    #[test]
    fn zero_preview_size_is_rejected() {
        let options = ExtractOptions {
            preview_max_dimension: 0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(OutlineError::Config(_))));
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"{ "input_dir": "pdfs", "extract": { "preview_max_dimension": 64 } }"#,
        )
        .unwrap();

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("pdfs"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert!(config.overwrite);
        assert_eq!(config.extract.preview_max_dimension, 64);
        assert!(config.extract.dedupe_headings);
    }

    #[test]
    fn malformed_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            BatchConfig::load(&path),
            Err(OutlineError::Config(_))
        ));
    }
}

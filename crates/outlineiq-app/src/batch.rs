// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch job: every `*.pdf` in the input directory becomes `<stem>.json` in
// the output directory. One bad file is logged and counted, never fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use outlineiq_core::{BatchConfig, OutlineError, Result};
use outlineiq_document::Extractor;
use rayon::prelude::*;
use tracing::{error, info, instrument, warn};

/// Outcome counts for one batch run.
#[derive(Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

enum FileOutcome {
    Written,
    Skipped,
    Failed(String),
}

/// Process the configured input directory.
///
/// Errors only when the directories themselves are unusable; per-file failures
/// land in [`BatchSummary::failed`].
#[instrument(skip_all, fields(input = %config.input_dir.display(), output = %config.output_dir.display()))]
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary> {
    let started = Instant::now();
    let extractor = Extractor::new(config.extract.clone())?;
    let inputs = list_pdfs(&config.input_dir)?;
    if inputs.is_empty() {
        warn!("No PDF files found in input directory");
        return Ok(BatchSummary::default());
    }
    std::fs::create_dir_all(&config.output_dir)?;
    let (inputs, collisions) = claim_outputs(inputs, &config.output_dir);
    info!(
        files = inputs.len(),
        parallel = config.parallel,
        preview_max_dimension = extractor.options().preview_max_dimension,
        "Starting batch"
    );

    let process = |input: &PathBuf| (input.clone(), process_file(&extractor, input, config));
    let outcomes: Vec<(PathBuf, FileOutcome)> = if config.parallel {
        inputs.par_iter().map(process).collect()
    } else {
        inputs.iter().map(process).collect()
    };

    let mut summary = BatchSummary::default();
    for (input, outcome) in outcomes {
        match outcome {
            FileOutcome::Written => summary.succeeded += 1,
            FileOutcome::Skipped => summary.skipped += 1,
            FileOutcome::Failed(reason) => summary.failed.push((input, reason)),
        }
    }
    summary.failed.extend(collisions);

    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch finished"
    );
    Ok(summary)
}

/// `*.pdf` files (any extension case) directly inside `dir`, sorted by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OutlineError::BatchInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Keep the first input (in sorted order) for each output path. Later inputs
/// that would overwrite it, such as `a.PDF` next to `a.pdf`, are returned as
/// failures instead.
fn claim_outputs(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut kept = Vec::with_capacity(inputs.len());
    let mut collisions = Vec::new();
    for input in inputs {
        let target = output_path(&input, output_dir);
        if let Some(owner) = claimed.get(&target) {
            let reason = format!(
                "output {} is already produced from {}",
                target.display(),
                owner.display()
            );
            error!(file = %input.display(), "{reason}");
            collisions.push((input, reason));
        } else {
            claimed.insert(target, input.clone());
            kept.push(input);
        }
    }
    (kept, collisions)
}

fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".json");
    output_dir.join(name)
}

fn process_file(extractor: &Extractor, input: &Path, config: &BatchConfig) -> FileOutcome {
    let target = output_path(input, &config.output_dir);
    if !config.overwrite && target.exists() {
        warn!(file = %input.display(), "Output exists, skipping");
        return FileOutcome::Skipped;
    }

    let written = extractor
        .extract_file(input)
        .and_then(|result| result.to_json_pretty())
        .and_then(|json| Ok(std::fs::write(&target, json)?));
    match written {
        Ok(()) => {
            info!(file = %input.display(), output = %target.display(), "Wrote outline");
            FileOutcome::Written
        }
        Err(err) => {
            error!(file = %input.display(), error = %err, "Failed to process PDF");
            FileOutcome::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outlineiq_core::ExtractionResult;
    use outlineiq_document::fixtures::{FixturePage, PdfFixture};

    fn sample_pdf(heading: &str) -> Vec<u8> {
        PdfFixture::new()
            .page(FixturePage::new().text(heading, 20.0, 72.0, 700.0))
            .build()
    }

    fn config_for(input: &Path, output: &Path) -> BatchConfig {
        BatchConfig {
            input_dir: input.to_path_buf(),
            output_dir: output.join("out"),
            ..BatchConfig::default()
        }
    }

    #[test]
    fn writes_one_json_per_pdf_and_survives_bad_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("alpha.pdf"), sample_pdf("Alpha")).unwrap();
        std::fs::write(input.path().join("BETA.PDF"), sample_pdf("Beta")).unwrap();
        std::fs::write(input.path().join("broken.pdf"), b"not a pdf").unwrap();
        std::fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

        let config = config_for(input.path(), output.path());
        let summary = run_batch(&config).unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("broken.pdf"));

        let raw = std::fs::read_to_string(config.output_dir.join("alpha.json")).unwrap();
        let result = ExtractionResult::from_json(&raw).unwrap();
        assert_eq!(result.title, "Alpha");
        assert!(config.output_dir.join("BETA.json").exists());
        assert!(!config.output_dir.join("broken.json").exists());
    }

    #[test]
    fn existing_outputs_are_kept_without_overwrite() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("alpha.pdf"), sample_pdf("Alpha")).unwrap();

        let mut config = config_for(input.path(), output.path());
        config.overwrite = false;
        std::fs::create_dir_all(&config.output_dir).unwrap();
        std::fs::write(config.output_dir.join("alpha.json"), "{}").unwrap();

        let summary = run_batch(&config).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(
            std::fs::read_to_string(config.output_dir.join("alpha.json")).unwrap(),
            "{}"
        );
    }

    #[test]
    fn parallel_run_matches_sequential_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c", "d"] {
            std::fs::write(input.path().join(format!("{name}.pdf")), sample_pdf(name)).unwrap();
        }

        let sequential = config_for(input.path(), output.path());
        run_batch(&sequential).unwrap();
        let parallel = BatchConfig {
            output_dir: output.path().join("par"),
            parallel: true,
            ..sequential.clone()
        };
        let summary = run_batch(&parallel).unwrap();
        assert_eq!(summary.succeeded, 4);

        for name in ["a", "b", "c", "d"] {
            let file = format!("{name}.json");
            assert_eq!(
                std::fs::read_to_string(sequential.output_dir.join(&file)).unwrap(),
                std::fs::read_to_string(parallel.output_dir.join(&file)).unwrap()
            );
        }
    }

    #[test]
    fn inputs_sharing_a_stem_do_not_share_an_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.PDF"), sample_pdf("Upper")).unwrap();
        std::fs::write(input.path().join("a.pdf"), sample_pdf("Lower")).unwrap();

        let config = BatchConfig {
            parallel: true,
            ..config_for(input.path(), output.path())
        };
        let summary = run_batch(&config).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].0.ends_with("a.pdf"));
        assert!(summary.failed[0].1.contains("a.PDF"));

        let raw = std::fs::read_to_string(config.output_dir.join("a.json")).unwrap();
        assert_eq!(ExtractionResult::from_json(&raw).unwrap().title, "Upper");
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let config = config_for(&output.path().join("missing"), output.path());
        assert!(matches!(run_batch(&config), Err(OutlineError::BatchInput(_))));
    }

    #[test]
    fn empty_input_directory_is_not_an_error() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let summary = run_batch(&config_for(input.path(), output.path())).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn output_name_uses_the_file_stem() {
        assert_eq!(
            output_path(Path::new("/in/report.v2.pdf"), Path::new("/out")),
            PathBuf::from("/out/report.v2.json")
        );
    }
}

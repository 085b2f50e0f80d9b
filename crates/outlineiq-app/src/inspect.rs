// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-file inspector: extract one PDF, print a readable summary, and save
// the JSON next to the working directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use outlineiq_core::{ExtractOptions, ExtractionResult, HeadingLevel, Result};
use outlineiq_document::Extractor;
use tracing::{info, instrument};

/// Extract `file`, print the summary to stdout, and write the JSON to `save`
/// (or `<stem>_outline.json`). Returns where the JSON went.
#[instrument(skip_all, fields(file = %file.display()))]
pub fn run_inspect(file: &Path, save: Option<&Path>, options: &ExtractOptions) -> Result<PathBuf> {
    let result = Extractor::new(options.clone())?.extract_file(file)?;
    print!("{}", render(&result));

    let target = save.map_or_else(|| default_save_path(file), Path::to_path_buf);
    std::fs::write(&target, result.to_json_pretty()?)?;
    println!("\nSaved JSON to {}", target.display());
    info!(output = %target.display(), "Outline saved");
    Ok(target)
}

fn default_save_path(file: &Path) -> PathBuf {
    let mut name = file.file_stem().unwrap_or(file.as_os_str()).to_os_string();
    name.push("_outline.json");
    PathBuf::from(name)
}

/// Terminal rendering of a result: title, outline table, links, and a
/// per-page count of image previews.
pub fn render(result: &ExtractionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title: {}", result.title);

    let per_level: Vec<String> = [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3]
        .into_iter()
        .map(|level| format!("{} {level}", result.headings_at(level).count()))
        .collect();
    let _ = writeln!(
        out,
        "\nOutline ({} headings: {})",
        result.headings.len(),
        per_level.join(", ")
    );
    if result.headings.is_empty() {
        let _ = writeln!(out, "  (no headings detected)");
    }
    for heading in &result.headings {
        let indent = match heading.level {
            HeadingLevel::H1 => "",
            HeadingLevel::H2 => "  ",
            HeadingLevel::H3 => "    ",
        };
        let _ = writeln!(
            out,
            "  {:<3} {:>4}  {indent}{} ({}pt)",
            heading.level.as_str(),
            format!("p{}", heading.page),
            heading.text,
            heading.font_size
        );
    }

    let _ = writeln!(out, "\nLinks ({})", result.metadata.links.len());
    for link in &result.metadata.links {
        let _ = writeln!(out, "  p{:<4} {}", link.page, link.uri);
    }

    let mut previews: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for preview in &result.metadata.image_previews {
        let entry = previews.entry(preview.page).or_default();
        entry.0 += 1;
        entry.1 += preview.preview.len();
    }
    let _ = writeln!(
        out,
        "\nImages (on pages {:?})",
        result.metadata.pages_with_images
    );
    for page in &result.metadata.pages_with_images {
        let (count, bytes) = previews.get(page).copied().unwrap_or_default();
        let _ = writeln!(
            out,
            "  p{:<4} {count} preview(s), {:.1} KiB inline",
            page,
            bytes as f64 / 1024.0
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use outlineiq_document::fixtures::{FixtureImage, FixturePage, PdfFixture};

    fn sample_file(dir: &Path) -> PathBuf {
        let path = dir.join("guide.pdf");
        let bytes = PdfFixture::new()
            .page(
                FixturePage::new()
                    .text("Getting Started", 20.0, 72.0, 700.0)
                    .text("Install", 14.0, 72.0, 660.0)
                    .image(FixtureImage::Rgb { width: 10, height: 10 }),
            )
            .page(FixturePage::new().link("https://example.com/docs"))
            .build();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn saves_json_to_the_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_file(dir.path());
        let save = dir.path().join("result.json");

        let written = run_inspect(&input, Some(&save), &ExtractOptions::default()).unwrap();
        assert_eq!(written, save);
        let result =
            ExtractionResult::from_json(&std::fs::read_to_string(&save).unwrap()).unwrap();
        assert_eq!(result.title, "Getting Started");
        assert_eq!(result.headings.len(), 2);
    }

    #[test]
    fn render_lists_outline_links_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let input = sample_file(dir.path());
        let result = Extractor::default().extract_file(&input).unwrap();

        let text = render(&result);
        assert!(text.contains("Title: Getting Started"));
        assert!(text.contains("Outline (2 headings: 1 H1, 1 H2, 0 H3)"));
        assert!(text.contains("H2"));
        assert!(text.contains("Install"));
        assert!(text.contains("https://example.com/docs"));
        assert!(text.contains("1 preview(s)"));
    }

    #[test]
    fn unreadable_file_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("junk.pdf");
        std::fs::write(&input, b"junk").unwrap();
        let save = dir.path().join("junk.json");

        let err = run_inspect(&input, Some(&save), &ExtractOptions::default()).unwrap_err();
        assert!(err.is_unreadable());
        assert!(!save.exists());
    }

    #[test]
    fn default_save_path_uses_the_stem() {
        assert_eq!(
            default_save_path(Path::new("/docs/report.pdf")),
            PathBuf::from("report_outline.json")
        );
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outline assembly: turns surveyed text spans into headings in reading order.

use std::cmp::Ordering;
use std::collections::HashSet;

use outlineiq_core::{Heading, HeadingLevel};
use tracing::debug;

use super::profile::{FontSizeProfile, SizeKey};
use crate::pdf::TextSpan;

/// Baselines closer than this (in points) belong to the same line.
const LINE_TOLERANCE: f32 = 2.0;

/// A run of same-size text on one line: the unit that becomes a heading.
#[derive(Debug)]
struct Candidate {
    page: u32,
    size: f32,
    key: SizeKey,
    parts: Vec<String>,
}

/// Build the outline from all spans in the document.
///
/// Spans are placed in reading order (page ascending, then top to bottom, then
/// left to right), grouped into lines, and adjacent spans of the same size on a
/// line are joined. Each joined run whose size ranks in the profile's top three
/// becomes a heading. With `dedupe`, later repeats of the same level, text
/// (case-insensitive), and page are dropped.
pub fn assemble_headings(
    mut spans: Vec<TextSpan>,
    profile: &FontSizeProfile,
    dedupe: bool,
) -> Vec<Heading> {
    spans.sort_by(reading_order);

    let mut headings = Vec::new();
    for line in lines(spans) {
        for candidate in candidates(line, profile) {
            let Some(level) = profile.level_of(candidate.size) else {
                continue;
            };
            let text = normalize_whitespace(&candidate.parts.join(" "));
            if text.is_empty() {
                continue;
            }
            headings.push(Heading {
                level,
                text,
                page: candidate.page,
                font_size: profile.rounded(candidate.size),
            });
        }
    }

    if dedupe {
        let before = headings.len();
        headings = dedupe_headings(headings);
        if headings.len() != before {
            debug!(dropped = before - headings.len(), "Duplicate headings removed");
        }
    }
    headings
}

fn reading_order(a: &TextSpan, b: &TextSpan) -> Ordering {
    a.page
        .cmp(&b.page)
        .then_with(|| b.y.total_cmp(&a.y))
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.seq.cmp(&b.seq))
}

/// Split sorted spans into lines; each line comes back ordered left to right.
fn lines(spans: Vec<TextSpan>) -> Vec<Vec<TextSpan>> {
    let mut lines: Vec<Vec<TextSpan>> = Vec::new();
    for span in spans {
        match lines.last_mut() {
            Some(line)
                if line[0].page == span.page && (line[0].y - span.y).abs() <= LINE_TOLERANCE =>
            {
                line.push(span)
            }
            _ => lines.push(vec![span]),
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.seq.cmp(&b.seq)));
    }
    lines
}

/// Merge adjacent same-size spans of one line.
fn candidates(line: Vec<TextSpan>, profile: &FontSizeProfile) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    for span in line {
        let key = profile.key(span.font_size);
        match out.last_mut() {
            Some(current) if current.key == key => current.parts.push(span.text),
            _ => out.push(Candidate {
                page: span.page,
                size: span.font_size,
                key,
                parts: vec![span.text],
            }),
        }
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedupe_headings(headings: Vec<Heading>) -> Vec<Heading> {
    let mut seen: HashSet<(HeadingLevel, String, u32)> = HashSet::new();
    headings
        .into_iter()
        .filter(|h| seen.insert((h.level, h.text.to_lowercase(), h.page)))
        .collect()
}

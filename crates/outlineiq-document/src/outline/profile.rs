// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font-size survey: the distribution of effective text sizes in a document
// and the rank-based mapping from size to heading level.

use std::collections::BTreeMap;

use outlineiq_core::HeadingLevel;

/// A font size rounded to the profile's precision, as an integer count of
/// `10^-precision` points so that ordering and equality are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeKey(i64);

/// Multiset of the distinct rounded font sizes seen across a document.
///
/// The three largest distinct sizes map to H1, H2, and H3. Anything smaller is
/// body text. Weight, family, and style play no part.
#[derive(Debug, Clone)]
pub struct FontSizeProfile {
    scale: f32,
    counts: BTreeMap<SizeKey, usize>,
}

impl FontSizeProfile {
    /// An empty profile rounding to `precision` decimal places.
    pub fn new(precision: u32) -> Self {
        Self {
            scale: 10f32.powi(precision as i32),
            counts: BTreeMap::new(),
        }
    }

    pub fn key(&self, size: f32) -> SizeKey {
        SizeKey((size * self.scale).round() as i64)
    }

    /// `size` rounded to the profile's precision.
    pub fn rounded(&self, size: f32) -> f32 {
        self.key(size).0 as f32 / self.scale
    }

    /// Record one span of the given size.
    pub fn record(&mut self, size: f32) {
        *self.counts.entry(self.key(size)).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct rounded sizes.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Distinct rounded sizes, largest first.
    pub fn ranked(&self) -> Vec<f32> {
        self.counts
            .keys()
            .rev()
            .map(|key| key.0 as f32 / self.scale)
            .collect()
    }

    /// Heading level for a span of this size, if it ranks in the top three.
    pub fn level_of(&self, size: f32) -> Option<HeadingLevel> {
        let key = self.key(size);
        self.counts
            .keys()
            .rev()
            .take(HeadingLevel::COUNT)
            .position(|ranked| *ranked == key)
            .and_then(HeadingLevel::from_rank)
    }
}

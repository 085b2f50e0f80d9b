// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outline module: font-size ranking, heading assembly, and title resolution.

pub mod assemble;
pub mod profile;
pub mod title;

pub use assemble::assemble_headings;
pub use profile::FontSizeProfile;
pub use title::{TitleResolver, TitleSource};

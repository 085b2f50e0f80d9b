// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: the document handle and the per-page passes over it.

pub mod links;
pub mod reader;
pub mod text;

pub use reader::PdfReader;
pub use text::TextSpan;

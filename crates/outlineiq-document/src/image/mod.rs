// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: embedded image discovery/decoding and thumbnail encoding.

pub mod processor;
pub mod xobject;

pub use processor::ImageProcessor;
pub use xobject::{PageImage, decode_image, page_images};

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: thumbnailing and inline encoding of decoded images using
// the `image` and `base64` crates.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use outlineiq_core::error::{OutlineError, Result};
use tracing::{debug, instrument};

/// Thumbnail pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor`, enabling
/// method chaining.
///
/// ```ignore
/// let preview = ImageProcessor::from_dynamic(decoded)
///     .thumbnail(160)
///     .to_data_uri()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| OutlineError::ImageDecode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Shrink the image so neither side exceeds `max_dimension`, preserving
    /// aspect ratio, and flatten it to 8-bit RGB. Images already within bounds
    /// are never upscaled. Uses Lanczos3 filtering.
    #[instrument(skip(self))]
    pub fn thumbnail(self, max_dimension: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        let image = if w > max_dimension || h > max_dimension {
            self.image.resize(
                max_dimension,
                max_dimension,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            self.image
        };
        debug!(
            from_w = w,
            from_h = h,
            new_w = image.width(),
            new_h = image.height(),
            "Thumbnail ready"
        );
        Self {
            image: DynamicImage::ImageRgb8(image.to_rgb8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as a `data:image/png;base64,...` URI.
    pub fn to_data_uri(&self) -> Result<String> {
        let png = self.to_png_bytes()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| OutlineError::ImageDecode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

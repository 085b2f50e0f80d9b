// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObjects: discovery in page resources and decoding of their sample
// data into `DynamicImage`s.

use std::collections::HashSet;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use outlineiq_core::error::{OutlineError, Result};
use tracing::trace;

use super::processor::ImageProcessor;
use crate::pdf::reader::{number, resolve, resolve_key};

/// Nested Form XObjects deeper than this are not searched for images.
const MAX_FORM_DEPTH: usize = 8;

/// Refuse to allocate rasters larger than this many pixels.
const MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

/// An Image XObject reachable from a page's resources.
#[derive(Debug, Clone, Copy)]
pub struct PageImage<'a> {
    pub id: ObjectId,
    /// Resource name the image is registered under (e.g. `Im0`).
    pub name: &'a [u8],
    pub stream: &'a Stream,
}

/// Every Image XObject registered in `resources`, including those inside
/// nested Form XObjects, in resource order and without duplicates.
pub fn page_images<'a>(doc: &'a Document, resources: Option<&'a Dictionary>) -> Vec<PageImage<'a>> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    if let Some(resources) = resources {
        collect(doc, resources, 0, &mut seen, &mut found);
    }
    found
}

fn collect<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    found: &mut Vec<PageImage<'a>>,
) {
    let Some(Ok(xobjects)) = resolve_key(doc, resources, b"XObject").map(Object::as_dict) else {
        return;
    };
    for (name, object) in xobjects.iter() {
        // XObjects are always indirect; a direct value here is malformed.
        let Object::Reference(id) = object else {
            continue;
        };
        if !seen.insert(*id) {
            continue;
        }
        let Ok(stream) = doc.get_object(*id).and_then(Object::as_stream) else {
            trace!(?id, "XObject is not a stream");
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => found.push(PageImage {
                id: *id,
                name: name.as_slice(),
                stream,
            }),
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(Ok(inner)) = resolve_key(doc, &stream.dict, b"Resources").map(Object::as_dict) {
                    collect(doc, inner, depth + 1, seen, found);
                }
            }
            _ => {}
        }
    }
}

/// Decode an Image XObject into a raster.
///
/// JPEG payloads go straight to the `image` crate; raw and Flate/LZW sample
/// data is unpacked according to `/Width`, `/Height`, `/BitsPerComponent`
/// and `/ColorSpace`.
pub fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let filters = filter_names(doc, dict);

    if let Some((codec, leading)) = filters.split_last() {
        match codec.as_slice() {
            b"DCTDecode" | b"DCT" => {
                let jpeg = undo_filters(stream, leading)?;
                return ImageProcessor::from_bytes(&jpeg).map(ImageProcessor::into_dynamic);
            }
            name @ (b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode" | b"CCF") => {
                return Err(OutlineError::ImageDecode(format!(
                    "unsupported image filter {}",
                    String::from_utf8_lossy(name)
                )));
            }
            _ => {}
        }
    }

    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return Err(OutlineError::ImageDecode(format!(
            "image of {width}x{height} exceeds the pixel limit"
        )));
    }

    let is_mask = matches!(resolve_key(doc, dict, b"ImageMask"), Some(Object::Boolean(true)));
    let bits = if is_mask {
        1
    } else {
        resolve_key(doc, dict, b"BitsPerComponent")
            .and_then(number)
            .map_or(8, |bits| bits as u32)
    };
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(OutlineError::ImageDecode(format!("{bits} bits per component")));
    }

    let space = if is_mask {
        ColorSpace::Gray
    } else {
        match resolve_key(doc, dict, b"ColorSpace") {
            Some(object) => ColorSpace::parse(doc, object)?,
            None => ColorSpace::Gray,
        }
    };

    let data = undo_filters(stream, &filters)?;

    let samples = unpack(&data, width, height, space.components(), bits)?;
    let invert = is_decode_inverted(doc, dict);
    space.to_image(width, height, &samples, bits, invert)
}

/// Apply the decoding filters that precede the image codec, or the whole
/// chain for raw samples.
fn undo_filters(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    let mut dict = stream.dict.clone();
    let chain: Vec<Object> = filters.iter().cloned().map(Object::Name).collect();
    dict.set("Filter", chain);
    Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|err| OutlineError::ImageDecode(format!("filter chain: {err}")))
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match resolve_key(doc, dict, b"Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| resolve(doc, item)?.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    match resolve_key(doc, dict, key).and_then(number) {
        Some(value) if value >= 1.0 => Ok(value as u32),
        _ => Err(OutlineError::ImageDecode(format!(
            "missing or invalid /{}",
            String::from_utf8_lossy(key)
        ))),
    }
}

/// `/Decode [1 0]` on a single-component image flips black and white.
fn is_decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    let Some(Ok(decode)) = resolve_key(doc, dict, b"Decode").map(Object::as_array) else {
        return false;
    };
    matches!(
        (decode.first().and_then(number), decode.get(1).and_then(number)),
        (Some(lo), Some(hi)) if lo > hi
    )
}

/// Unpack `height` rows of `width * components` samples, each row padded to
/// a byte boundary. 16-bit samples keep their high byte.
fn unpack(data: &[u8], width: u32, height: u32, components: usize, bits: u32) -> Result<Vec<u8>> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * bits as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(OutlineError::ImageDecode(format!(
            "truncated sample data: {} of {needed} bytes",
            data.len()
        )));
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data.chunks_exact(row_bytes).take(height as usize) {
        match bits {
            8 => samples.extend_from_slice(&row[..per_row]),
            16 => samples.extend(row.chunks_exact(2).take(per_row).map(|pair| pair[0])),
            _ => {
                let mask = (1u8 << bits) - 1;
                let per_byte = 8 / bits as usize;
                for index in 0..per_row {
                    let byte = row[index / per_byte];
                    let shift = 8 - bits as usize * (index % per_byte + 1);
                    samples.push((byte >> shift) & mask);
                }
            }
        }
    }
    Ok(samples)
}

/// Scale an unpacked sample to the 0..=255 range.
fn scale(sample: u8, bits: u32) -> u8 {
    match bits {
        8 | 16 => sample,
        _ => {
            let max = (1u16 << bits) - 1;
            (u16::from(sample) * 255 / max) as u8
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette of `base`-space colours, already expanded to RGB triples.
    Indexed { palette: Vec<[u8; 3]> },
}

impl ColorSpace {
    fn parse(doc: &Document, object: &Object) -> Result<Self> {
        match object {
            Object::Name(name) => Self::from_name(name),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|item| resolve(doc, item))
                    .and_then(|item| item.as_name().ok())
                    .unwrap_or_default();
                match family {
                    b"ICCBased" => {
                        let components = items
                            .get(1)
                            .and_then(|item| resolve(doc, item))
                            .and_then(|item| item.as_stream().ok())
                            .and_then(|stream| resolve_key(doc, &stream.dict, b"N"))
                            .and_then(number)
                            .map_or(3, |n| n as usize);
                        Self::from_components(components)
                    }
                    b"Indexed" | b"I" => Self::indexed(doc, items),
                    b"CalGray" | b"Separation" => Ok(Self::Gray),
                    b"CalRGB" | b"Lab" => Ok(Self::Rgb),
                    other => Self::from_name(other),
                }
            }
            _ => Err(OutlineError::ImageDecode("malformed /ColorSpace".into())),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(Self::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(Self::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(Self::Cmyk),
            other => Err(OutlineError::ImageDecode(format!(
                "unsupported colour space {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn from_components(components: usize) -> Result<Self> {
        match components {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Cmyk),
            n => Err(OutlineError::ImageDecode(format!("{n}-component colour space"))),
        }
    }

    /// `[/Indexed base hival lookup]`.
    fn indexed(doc: &Document, items: &[Object]) -> Result<Self> {
        let malformed = || OutlineError::ImageDecode("malformed /Indexed colour space".into());
        let base = items
            .get(1)
            .and_then(|item| resolve(doc, item))
            .ok_or_else(malformed)
            .and_then(|base| Self::parse(doc, base))?;
        if matches!(base, Self::Indexed { .. }) {
            return Err(malformed());
        }
        let hival = items
            .get(2)
            .and_then(|item| resolve(doc, item))
            .and_then(number)
            .ok_or_else(malformed)? as usize;
        let lookup = match items.get(3).and_then(|item| resolve(doc, item)) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(stream)) => stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            _ => return Err(malformed()),
        };

        let width = base.components();
        let palette = lookup
            .chunks_exact(width)
            .take(hival + 1)
            .map(|entry| match base {
                Self::Gray => [entry[0]; 3],
                Self::Cmyk => cmyk_to_rgb(entry),
                _ => [entry[0], entry[1], entry[2]],
            })
            .collect();
        Ok(Self::Indexed { palette })
    }

    fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn to_image(
        &self,
        width: u32,
        height: u32,
        samples: &[u8],
        bits: u32,
        invert: bool,
    ) -> Result<DynamicImage> {
        let too_short = || OutlineError::ImageDecode("sample count does not match dimensions".into());
        match self {
            Self::Gray => {
                let pixels = samples
                    .iter()
                    .map(|&s| {
                        let value = scale(s, bits);
                        if invert { 255 - value } else { value }
                    })
                    .collect();
                GrayImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageLuma8)
                    .ok_or_else(too_short)
            }
            Self::Rgb => {
                let pixels = samples.iter().map(|&s| scale(s, bits)).collect();
                RgbImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(too_short)
            }
            Self::Cmyk => {
                let scaled: Vec<u8> = samples.iter().map(|&s| scale(s, bits)).collect();
                let pixels = scaled.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
                RgbImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(too_short)
            }
            Self::Indexed { palette } => {
                let fallback = [0, 0, 0];
                let pixels = samples
                    .iter()
                    .flat_map(|&index| *palette.get(index as usize).unwrap_or(&fallback))
                    .collect();
                RgbImage::from_raw(width, height, pixels)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(too_short)
            }
        }
    }
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(cmyk[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn raw_image(dict: Dictionary, data: Vec<u8>) -> Stream {
        Stream::new(dict, data)
    }

    #[test]
    fn decodes_raw_rgb_samples() {
        let stream = raw_image(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "BitsPerComponent" => 8,
                "ColorSpace" => "DeviceRGB",
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let image = decode_image(&Document::with_version("1.5"), &stream).unwrap();
        let rgb = image.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn unpacks_one_bit_rows_with_padding() {
        // 3 pixels per row pad to one byte: 101xxxxx, 010xxxxx.
        let stream = raw_image(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 2,
                "BitsPerComponent" => 1,
                "ColorSpace" => "DeviceGray",
            },
            vec![0b1010_0000, 0b0100_0000],
        );
        let gray = decode_image(&Document::with_version("1.5"), &stream)
            .unwrap()
            .to_luma8();
        let row0: Vec<u8> = (0..3).map(|x| gray.get_pixel(x, 0).0[0]).collect();
        let row1: Vec<u8> = (0..3).map(|x| gray.get_pixel(x, 1).0[0]).collect();
        assert_eq!(row0, [255, 0, 255]);
        assert_eq!(row1, [0, 255, 0]);
    }

    #[test]
    fn cmyk_black_becomes_rgb_black() {
        let stream = raw_image(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceCMYK",
            },
            vec![0, 0, 0, 255],
        );
        let rgb = decode_image(&Document::with_version("1.5"), &stream)
            .unwrap()
            .to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn indexed_palette_is_expanded() {
        let stream = raw_image(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "BitsPerComponent" => 8,
                "ColorSpace" => vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(1),
                    Object::string_literal(vec![10u8, 20, 30, 200, 210, 220]),
                ],
            },
            vec![1, 0],
        );
        let rgb = decode_image(&Document::with_version("1.5"), &stream)
            .unwrap()
            .to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 210, 220]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn truncated_samples_are_rejected() {
        let stream = raw_image(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 10,
                "ColorSpace" => "DeviceRGB",
            },
            vec![0; 12],
        );
        let err = decode_image(&Document::with_version("1.5"), &stream).unwrap_err();
        assert!(matches!(err, OutlineError::ImageDecode(msg) if msg.contains("truncated")));
    }

    #[test]
    fn unsupported_filters_are_reported() {
        let stream = raw_image(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "Filter" => "JBIG2Decode",
            },
            vec![0; 8],
        );
        let err = decode_image(&Document::with_version("1.5"), &stream).unwrap_err();
        assert!(matches!(err, OutlineError::ImageDecode(msg) if msg.contains("JBIG2Decode")));
    }

    #[test]
    fn deflated_jpeg_is_inflated_before_decoding() {
        use crate::fixtures::{FixtureImage, FixturePage, PdfFixture};
        use crate::pdf::PdfReader;

        let bytes = PdfFixture::new()
            .page(FixturePage::new().image(FixtureImage::DeflatedJpeg { width: 24, height: 12 }))
            .build();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let (_, page_id) = reader.pages()[0];
        let images = page_images(reader.document(), reader.page_resources(page_id));
        let decoded = decode_image(reader.document(), images[0].stream).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 12));
    }

    #[test]
    fn discovers_every_image_on_the_page() {
        use crate::fixtures::{FixtureImage, FixturePage, PdfFixture};
        use crate::pdf::PdfReader;

        let bytes = PdfFixture::new()
            .page(
                FixturePage::new()
                    .image(FixtureImage::Rgb { width: 4, height: 4 })
                    .image(FixtureImage::Jpeg { width: 8, height: 6 }),
            )
            .build();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let (_, page_id) = reader.pages()[0];
        let images = page_images(reader.document(), reader.page_resources(page_id));
        assert_eq!(images.len(), 2);

        let decoded: Vec<_> = images
            .iter()
            .map(|image| decode_image(reader.document(), image.stream).unwrap())
            .collect();
        assert_eq!((decoded[1].width(), decoded[1].height()), (8, 6));
    }
}

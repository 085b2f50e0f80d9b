// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF builders used by unit tests, the app crate's tests, and the
// benchmarks. Documents are assembled object by object with `lopdf` so each
// test states exactly which text, links, and images a page carries.

use std::io::Cursor;

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions,
    Stream, StringFormat, dictionary,
};

/// US Letter, in points.
const MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Builder for a whole document.
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    title: Option<String>,
    pages: Vec<FixturePage>,
    /// (owner, user) passwords for RC4-128 encryption.
    passwords: Option<(String, String)>,
}

/// Builder for one page.
#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    texts: Vec<FixtureText>,
    links: Vec<FixtureLink>,
    images: Vec<FixtureImage>,
}

#[derive(Debug, Clone)]
struct FixtureText {
    text: String,
    /// Font resource name: `F1` Helvetica, `F2` Helvetica-Bold.
    font: &'static str,
    size: f32,
    x: f32,
    y: f32,
    in_form: bool,
}

#[derive(Debug, Clone)]
enum FixtureLink {
    Uri(String),
    GoTo,
}

/// An embedded image to place on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureImage {
    /// Uncompressed 8-bit DeviceRGB samples.
    Rgb { width: u32, height: u32 },
    /// A real baseline JPEG under `/DCTDecode`.
    Jpeg { width: u32, height: u32 },
    /// A JPEG additionally deflated: `/Filter [/FlateDecode /DCTDecode]`.
    DeflatedJpeg { width: u32, height: u32 },
    /// `/DCTDecode` whose payload is not a JPEG.
    Corrupt,
    /// DeviceRGB declaring more samples than the stream holds.
    Truncated,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `/Title` in the document information dictionary.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn page(mut self, page: FixturePage) -> Self {
        self.pages.push(page);
        self
    }

    /// Encrypt the saved file. An empty `user` password gives an owner-only
    /// (permissions-restricted) document that opens without a password.
    pub fn encrypted(mut self, owner: impl Into<String>, user: impl Into<String>) -> Self {
        self.passwords = Some((owner.into(), user.into()));
        self
    }

    /// Serialize the document to PDF bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        let kids: Vec<Object> = self
            .pages
            .iter()
            .map(|page| page.write(&mut doc, pages_id, (font_id, bold_id)).into())
            .collect();
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
            });
            doc.trailer.set("Info", info_id);
        }
        if let Some((owner, user)) = &self.passwords {
            encrypt(&mut doc, owner, user);
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("fixture PDF serializes");
        out
    }
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `text` at (`x`, `y`) in Helvetica at `size` points.
    pub fn text(mut self, text: impl Into<String>, size: f32, x: f32, y: f32) -> Self {
        self.texts.push(FixtureText {
            text: text.into(),
            font: "F1",
            size,
            x,
            y,
            in_form: false,
        });
        self
    }

    /// Like [`text`](Self::text), in Helvetica-Bold.
    pub fn bold_text(mut self, text: impl Into<String>, size: f32, x: f32, y: f32) -> Self {
        self.texts.push(FixtureText {
            text: text.into(),
            font: "F2",
            size,
            x,
            y,
            in_form: false,
        });
        self
    }

    /// Like [`text`](Self::text), but drawn from inside a Form XObject.
    pub fn form_text(mut self, text: impl Into<String>, size: f32, x: f32, y: f32) -> Self {
        self.texts.push(FixtureText {
            text: text.into(),
            font: "F1",
            size,
            x,
            y,
            in_form: true,
        });
        self
    }

    /// Add a `/Link` annotation with a URI action.
    pub fn link(mut self, uri: impl Into<String>) -> Self {
        self.links.push(FixtureLink::Uri(uri.into()));
        self
    }

    /// Add a `/Link` annotation that jumps inside the document.
    pub fn goto_link(mut self) -> Self {
        self.links.push(FixtureLink::GoTo);
        self
    }

    pub fn image(mut self, image: FixtureImage) -> Self {
        self.images.push(image);
        self
    }

    fn write(
        &self,
        doc: &mut Document,
        parent: ObjectId,
        (regular_id, bold_id): (ObjectId, ObjectId),
    ) -> ObjectId {
        let fonts = dictionary! { "F1" => regular_id, "F2" => bold_id };
        let mut xobjects = Dictionary::new();
        let mut operations = Vec::new();

        for (index, text) in self.texts.iter().enumerate() {
            let ops = text_operations(text);
            if text.in_form {
                let name = format!("Fm{index}");
                let form = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
                        "Resources" => dictionary! { "Font" => fonts.clone() },
                    },
                    encode(ops),
                );
                xobjects.set(name.as_bytes(), doc.add_object(form));
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                operations.push(Operation::new("Q", vec![]));
            } else {
                operations.extend(ops);
            }
        }

        for (index, image) in self.images.iter().enumerate() {
            let name = format!("Im{index}");
            xobjects.set(name.as_bytes(), doc.add_object(image.stream()));
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 72.into()],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        let content_id = doc.add_object(Stream::new(Dictionary::new(), encode(operations)));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts,
                "XObject" => xobjects,
            },
        };

        if !self.links.is_empty() {
            let annots: Vec<Object> = self
                .links
                .iter()
                .map(|link| doc.add_object(link.annotation()).into())
                .collect();
            page.set("Annots", annots);
        }
        doc.add_object(page)
    }
}

impl FixtureLink {
    fn annotation(&self) -> Dictionary {
        let action = match self {
            Self::Uri(uri) => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(uri.as_str()),
            },
            Self::GoTo => dictionary! {
                "S" => "GoTo",
                "D" => Object::string_literal("section-1"),
            },
        };
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![72.into(), 72.into(), 272.into(), 92.into()],
            "A" => action,
        }
    }
}

impl FixtureImage {
    fn stream(self) -> Stream {
        match self {
            Self::Rgb { width, height } => raw_rgb(width, height, gradient(width, height).into_raw()),
            Self::Jpeg { width, height } => {
                let mut dict = image_dict(width, height);
                dict.set("Filter", "DCTDecode");
                Stream::new(dict, jpeg(width, height)).with_compression(false)
            }
            Self::DeflatedJpeg { width, height } => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(&jpeg(width, height))
                    .expect("fixture JPEG deflates");
                let deflated = encoder.finish().expect("fixture JPEG deflates");
                let mut dict = image_dict(width, height);
                dict.set(
                    "Filter",
                    vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
                );
                Stream::new(dict, deflated).with_compression(false)
            }
            Self::Corrupt => {
                let mut dict = image_dict(16, 16);
                dict.set("Filter", "DCTDecode");
                Stream::new(dict, b"this is not a jpeg".to_vec()).with_compression(false)
            }
            Self::Truncated => raw_rgb(32, 32, vec![0; 12]),
        }
    }
}

fn text_operations(text: &FixtureText) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![text.font.into(), text.size.into()]),
        Operation::new("Td", vec![text.x.into(), text.y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text.text.as_str())]),
        Operation::new("ET", vec![]),
    ]
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .expect("fixture JPEG encodes");
    jpeg
}

/// RC4-128 with all permissions; the trailer `/ID` feeds the key derivation.
fn encrypt(doc: &mut Document, owner: &str, user: &str) {
    let id = Object::String(b"outlineiq-fixture".to_vec(), StringFormat::Literal);
    doc.trailer.set("ID", vec![id.clone(), id]);
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &*doc,
        owner_password: owner,
        user_password: user,
        key_length: 128,
        permissions: Permissions::all(),
    })
    .expect("fixture encryption state");
    doc.encrypt(&state).expect("fixture encrypts");
}

fn encode(operations: Vec<Operation>) -> Vec<u8> {
    Content { operations }
        .encode()
        .expect("fixture content stream encodes")
}

fn image_dict(width: u32, height: u32) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "BitsPerComponent" => 8,
        "ColorSpace" => "DeviceRGB",
    }
}

fn raw_rgb(width: u32, height: u32, samples: Vec<u8>) -> Stream {
    Stream::new(image_dict(width, height), samples).with_compression(false)
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    })
}

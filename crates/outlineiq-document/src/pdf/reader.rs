// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: the scoped document handle every extraction works through,
// plus the small object-model helpers (reference resolution, string decoding,
// resource inheritance) shared by the text, link, and image passes.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use outlineiq_core::error::{OutlineError, Result};
use tracing::{debug, info, instrument, warn};

/// Guards against reference chains that loop back on themselves.
const MAX_REFERENCE_HOPS: usize = 32;

/// Read-only handle on one opened PDF.
///
/// The handle owns the parsed `lopdf::Document`; dropping it releases the
/// document, so holding a `PdfReader` in a local scope guarantees release on
/// every exit path, including early `?` returns and unwinding.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let data = std::fs::read(path_ref)?;
        let mut reader = Self::from_bytes(&data)?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(OutlineError::UnreadablePdf("input is empty".into()));
        }

        let document = Document::load_mem(data).map_err(|err| classify_load_error(data, &err))?;

        // lopdf decrypts with the empty user password on load; owner-only
        // (permissions-restricted) files end up with an encryption state.
        if document.is_encrypted() {
            if document.encryption_state.is_none() {
                warn!("PDF requires a user password");
                return Err(OutlineError::Encrypted);
            }
            debug!("Encrypted PDF opened with the empty user password");
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Borrow the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Pages as (1-based page number, object id), ascending.
    pub fn pages(&self) -> Vec<(u32, ObjectId)> {
        // lopdf keys pages by 1-indexed page number in a BTreeMap.
        self.document.get_pages().into_iter().collect()
    }

    /// The `/Title` entry of the document information dictionary, trimmed.
    /// Blank titles are reported as absent.
    pub fn title(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let info = resolve(&self.document, info)?.as_dict().ok()?;
        let raw = info.get(b"Title").ok()?;
        let title = match resolve(&self.document, raw)? {
            Object::String(bytes, _) => decode_pdf_string(bytes),
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            _ => return None,
        };
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    /// The page's `/Resources`, inherited from ancestors in the page tree when
    /// the page itself does not carry one.
    pub fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut current = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_REFERENCE_HOPS {
            if let Ok(resources) = current.get(b"Resources") {
                return resolve(&self.document, resources)?.as_dict().ok();
            }
            let parent = current.get(b"Parent").ok()?;
            current = resolve(&self.document, parent)?.as_dict().ok()?;
        }
        None
    }

    /// Concatenated, decompressed content streams of a page.
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        self.document
            .get_page_content(page_id)
            .map_err(|err| OutlineError::TextLayer(format!("page content unavailable: {err}")))
    }
}

/// Map a lopdf load failure onto the fatal error taxonomy.
fn classify_load_error(data: &[u8], err: &lopdf::Error) -> OutlineError {
    let head = &data[..data.len().min(1024)];
    if !contains(head, b"%PDF") {
        return OutlineError::UnreadablePdf("missing %PDF header".into());
    }
    if contains(data, b"/Encrypt") {
        return OutlineError::Encrypted;
    }
    OutlineError::UnreadablePdf(err.to_string())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

// -- Object-model helpers -----------------------------------------------------

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_REFERENCE_HOPS {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Look up `key` in `dict` and resolve it.
pub(crate) fn resolve_key<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

/// Numeric operand or dictionary value as `f32`.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, then UTF-8, then Latin-1.
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

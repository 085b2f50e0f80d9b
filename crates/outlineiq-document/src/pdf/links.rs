// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hyperlink collection from a page's `/Annots` array.

use lopdf::{Dictionary, Document, Object, ObjectId};
use outlineiq_core::Link;
use outlineiq_core::error::{OutlineError, Result};
use tracing::trace;

use super::reader::{decode_pdf_string, resolve, resolve_key};

/// Collect URI link annotations on one page, in annotation order.
///
/// Annotations that are not links, or links whose action is not a URI (internal
/// GoTo jumps, JavaScript, launch actions), are skipped without error. Only a
/// structurally broken `/Annots` entry is reported.
pub fn page_links(doc: &Document, page: u32, page_id: ObjectId) -> Result<Vec<Link>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|err| OutlineError::LinkResolution(format!("page {page}: {err}")))?;

    let Some(annots) = resolve_key(doc, page_dict, b"Annots") else {
        return Ok(Vec::new());
    };
    let annots = annots.as_array().map_err(|_| {
        OutlineError::LinkResolution(format!("page {page}: /Annots is not an array"))
    })?;

    let links = annots
        .iter()
        .filter_map(|entry| resolve(doc, entry)?.as_dict().ok())
        .filter_map(|annot| link_uri(doc, annot))
        .map(|uri| Link { page, uri })
        .collect::<Vec<_>>();

    trace!(page, links = links.len(), "Links collected");
    Ok(links)
}

/// URI target of a `/Subtype /Link` annotation, if it has one.
fn link_uri(doc: &Document, annot: &Dictionary) -> Option<String> {
    match annot.get(b"Subtype") {
        Ok(Object::Name(subtype)) if subtype == b"Link" => {}
        _ => return None,
    }

    let action = resolve_key(doc, annot, b"A")?.as_dict().ok()?;
    match action.get(b"S") {
        Ok(Object::Name(kind)) if kind == b"URI" => {}
        _ => return None,
    }

    let uri = match resolve_key(doc, action, b"URI")? {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => return None,
    };
    let uri = uri.trim();
    (!uri.is_empty()).then(|| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixturePage, PdfFixture};
    use crate::pdf::PdfReader;

    fn links_of(page: FixturePage) -> Vec<Link> {
        let bytes = PdfFixture::new().page(page).build();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let (number, page_id) = reader.pages()[0];
        page_links(reader.document(), number, page_id).unwrap()
    }

    #[test]
    fn uri_links_are_collected_in_order() {
        let links = links_of(
            FixturePage::new()
                .link("https://example.com")
                .link("mailto:team@example.org"),
        );
        let uris: Vec<&str> = links.iter().map(|l| l.uri.as_str()).collect();
        assert_eq!(uris, vec!["https://example.com", "mailto:team@example.org"]);
        assert!(links.iter().all(|l| l.page == 1));
    }

    #[test]
    fn internal_jumps_are_not_hyperlinks() {
        let links = links_of(FixturePage::new().goto_link().link("https://example.com"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].uri, "https://example.com");
    }

    #[test]
    fn duplicate_uris_are_kept() {
        let links = links_of(
            FixturePage::new()
                .link("https://example.com")
                .link("https://example.com"),
        );
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn page_without_annotations_has_no_links() {
        assert!(links_of(FixturePage::new()).is_empty());
    }
}

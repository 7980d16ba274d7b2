//! Page reordering
//!
//! A reorder rebuilds into a fresh document rather than shuffling Kids in
//! place: each source page is deep-copied in the requested order, so the
//! output is exactly `order.len()` independent pages and the source is left
//! untouched. Validation is strict; see `pages::validate_reorder`.

use crate::embed::copy_page;
use crate::error::PageForgeError;
use crate::pages::validate_reorder;
use crate::{load_document, save_document};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Rebuild the document with pages in the given order.
///
/// `order` is 0-indexed: output page N is a content-identical copy of source
/// page `order[N]`. Every source page must appear exactly once or the call
/// fails with `ValidationError`.
pub fn reorder_pages(bytes: &[u8], order: &[usize]) -> Result<Vec<u8>, PageForgeError> {
    let source = load_document(bytes)?;
    let pages = source.get_pages();
    let page_count = pages.len();

    validate_reorder(order, page_count)?;

    let page_ids: Vec<ObjectId> = pages.values().copied().collect();

    tracing::debug!(pages = page_count, "reordering pages");

    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut cache = HashMap::new();

    let mut kids = Vec::with_capacity(order.len());
    for &index in order {
        let new_page_id = copy_page(&mut output, &source, page_ids[index], pages_id, &mut cache)?;
        kids.push(Object::Reference(new_page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    output
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", Object::Reference(catalog_id));

    save_document(&mut output)
}

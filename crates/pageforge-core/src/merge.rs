//! Document merging
//!
//! Concatenates the page lists of several documents into one. Source
//! objects are imported with offset IDs to avoid collisions, appended
//! pages are re-parented onto the destination page tree, and attributes
//! they inherited from their old tree are materialized first so nothing
//! is lost in the move.

use crate::error::PageForgeError;
use crate::{load_document, pagetree, save_document};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge two or more documents, pages in input order.
pub fn merge_documents(inputs: &[Vec<u8>]) -> Result<Vec<u8>, PageForgeError> {
    if inputs.len() < 2 {
        return Err(PageForgeError::ValidationError(format!(
            "Merge requires at least two documents, got {}",
            inputs.len()
        )));
    }

    let mut loaded = Vec::with_capacity(inputs.len());
    for (i, bytes) in inputs.iter().enumerate() {
        let doc = load_document(bytes).map_err(|e| match e {
            PageForgeError::ParseError(msg) => {
                PageForgeError::ParseError(format!("Document {}: {}", i + 1, msg))
            }
            other => other,
        })?;
        loaded.push(doc);
    }

    let mut dest = loaded.remove(0);
    let mut max_id = dest.max_id;
    let root_pages_id = root_pages(&dest)?;
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();

    for source in loaded {
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
        let offset = max_id;

        let mut remapped = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            remapped.insert((old_id.0 + offset, old_id.1), shift_references(object, offset));
        }
        for (id, object) in remapped {
            dest.objects.insert(id, object);
        }

        for old_id in source_pages {
            let new_id = (old_id.0 + offset, old_id.1);
            adopt_page(&mut dest, new_id, root_pages_id)?;
            page_refs.push(new_id);
        }
        max_id += source.max_id;
    }

    let pages_dict = dest
        .get_object_mut(root_pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PageForgeError::OperationError(format!("Invalid page tree root: {}", e)))?;
    pages_dict.set(
        "Kids",
        Object::Array(page_refs.iter().map(|&id| Object::Reference(id)).collect()),
    );
    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));

    dest.max_id = max_id;
    tracing::debug!(
        documents = inputs.len(),
        pages = page_refs.len(),
        "merged documents"
    );

    // Source catalogs and page tree nodes are now unreachable
    dest.prune_objects();
    dest.compress();
    save_document(&mut dest)
}

/// The destination's page tree root, where appended pages get attached.
fn root_pages(doc: &Document) -> Result<ObjectId, PageForgeError> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| PageForgeError::OperationError(format!("No page tree root: {}", e)))
}

/// Recursively shift every object reference by an ID offset.
fn shift_references(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| shift_references(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Re-parent an imported page onto the destination tree, materializing
/// the attributes it inherited from the tree it came from.
fn adopt_page(
    doc: &mut Document,
    page_id: ObjectId,
    root_pages_id: ObjectId,
) -> Result<(), PageForgeError> {
    let (media_box, resources, rotation) = {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PageForgeError::OperationError(format!("Imported page: {}", e)))?;
        (
            pagetree::media_box(doc, page_dict)?,
            pagetree::effective_resources(doc, page_dict),
            pagetree::page_rotation(doc, page_dict),
        )
    };

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PageForgeError::OperationError(format!("Imported page: {}", e)))?;
    page_dict.set(
        "MediaBox",
        Object::Array(media_box.iter().map(|&v| Object::Real(v as f32)).collect()),
    );
    if !resources.is_empty() {
        page_dict.set("Resources", Object::Dictionary(resources));
    }
    if rotation != 0 {
        page_dict.set("Rotate", Object::Integer(rotation as i64));
    }
    page_dict.set("Parent", Object::Reference(root_pages_id));
    Ok(())
}

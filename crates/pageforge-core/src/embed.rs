//! Cross-document object embedding
//!
//! Reorder and resize both rebuild into a fresh document, so they need to
//! carry object graphs across: whole pages (reorder) or a page recast as a
//! drawable Form XObject (resize). All copies go through one cache keyed by
//! source object id, so a resource shared by ten pages lands in the output
//! once and a source page embedded as an XObject twice yields one stream.

use crate::error::PageForgeError;
use crate::pagetree;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Deep copy an object from source to output, following references.
///
/// The cache maps source ids to output ids. New ids are reserved before
/// recursing so reference cycles (annotation/popup pairs, /P back-links)
/// terminate. Dangling references become Null.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object, PageForgeError> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = match source.get_object(*id) {
                Ok(referenced) => referenced,
                Err(_) => return Ok(Object::Null),
            };

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::new();
            for item in arr {
                new_arr.push(copy_object_deep(output, source, item, cache)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        // Primitive types are cloned as-is
        _ => Ok(obj.clone()),
    }
}

/// Copy a page into the output document as an independent page.
///
/// Inheritable attributes (MediaBox, Resources, Rotate) are materialized onto
/// the copy since the new parent carries none of them.
pub(crate) fn copy_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId, PageForgeError> {
    let page_dict = source
        .get_dictionary(page_id)
        .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;

    // Reserve the id up front so back-references to this page resolve
    let new_page_id = output.new_object_id();
    cache.insert(page_id, new_page_id);

    let mut new_dict = Dictionary::new();
    for (key, value) in page_dict.iter() {
        // The new parent is the output page tree, not a copy of the old one
        if key == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    new_dict.set("Parent", Object::Reference(parent_id));

    if !new_dict.has(b"MediaBox") {
        let media_box = pagetree::media_box(source, page_dict)?;
        new_dict.set("MediaBox", boxed(media_box));
    }
    if !new_dict.has(b"Resources") {
        let resources = pagetree::effective_resources(source, page_dict);
        new_dict.set(
            "Resources",
            copy_object_deep(output, source, &Object::Dictionary(resources), cache)?,
        );
    }
    if !new_dict.has(b"Rotate") {
        let rotation = pagetree::page_rotation(source, page_dict);
        if rotation != 0 {
            new_dict.set("Rotate", Object::Integer(rotation as i64));
        }
    }

    output
        .objects
        .insert(new_page_id, Object::Dictionary(new_dict));

    Ok(new_page_id)
}

/// Embed a source page in the output document as a Form XObject.
///
/// The XObject carries the page's merged content stream, its MediaBox as
/// BBox, and a deep copy of its effective resources. Callers draw it with a
/// `cm` transform and a `Do`, and may reference it from any number of pages.
pub(crate) fn page_to_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId, PageForgeError> {
    let page_dict = source
        .get_dictionary(page_id)
        .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;

    let media_box = pagetree::media_box(source, page_dict)?;
    let content_data = pagetree::page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("BBox", boxed(media_box));
    xobject_dict.set("FormType", Object::Integer(1));

    let resources = pagetree::effective_resources(source, page_dict);
    xobject_dict.set(
        "Resources",
        copy_object_deep(output, source, &Object::Dictionary(resources), cache)?,
    );

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

fn boxed(media_box: [f64; 4]) -> Object {
    Object::Array(media_box.iter().map(|&v| Object::Real(v as f32)).collect())
}

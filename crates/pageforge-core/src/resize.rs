//! Page resizing
//!
//! Rebuilds every page at the target size with the original page drawn inside
//! as a Form XObject: contain-fit scale (never crop, never stretch), centered
//! within the new bounds. Embedding goes through a per-source cache, so a
//! source page referenced by several output pages serializes once.

use crate::embed::page_to_xobject;
use crate::error::PageForgeError;
use crate::pagetree;
use crate::{load_document, save_document};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Common target page sizes, in points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PageSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl PageSize {
    /// Width and height in points (portrait)
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }
}

/// Uniform contain-fit of a source rectangle into a target rectangle.
///
/// Returns `(scale, offset_x, offset_y)`: the scale is the same on both axes
/// so aspect ratio is preserved, and the offsets center the scaled source.
pub(crate) fn contain_fit(
    src_width: f64,
    src_height: f64,
    target_width: f64,
    target_height: f64,
) -> (f64, f64, f64) {
    let scale = (target_width / src_width).min(target_height / src_height);
    let offset_x = (target_width - src_width * scale) / 2.0;
    let offset_y = (target_height - src_height * scale) / 2.0;
    (scale, offset_x, offset_y)
}

/// Rescale every page to the given size in points.
pub fn resize_pages(
    bytes: &[u8],
    target_width: f64,
    target_height: f64,
) -> Result<Vec<u8>, PageForgeError> {
    if target_width <= 0.0 || target_height <= 0.0 {
        return Err(PageForgeError::ValidationError(format!(
            "Target size must be positive, got {}x{}",
            target_width, target_height
        )));
    }

    let source = load_document(bytes)?;
    let pages = source.get_pages();
    let page_ids: Vec<ObjectId> = pages.values().copied().collect();

    tracing::debug!(
        pages = page_ids.len(),
        width = target_width,
        height = target_height,
        "resizing pages"
    );

    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut cache = HashMap::new();
    let mut embedded: HashMap<ObjectId, ObjectId> = HashMap::new();

    let mut kids = Vec::with_capacity(page_ids.len());
    for (i, &source_page_id) in page_ids.iter().enumerate() {
        let page_dict = source
            .get_dictionary(source_page_id)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        let media_box = pagetree::media_box(&source, page_dict)?;
        let (src_width, src_height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);
        if src_width <= 0.0 || src_height <= 0.0 {
            return Err(PageForgeError::OperationError(format!(
                "Page {} has a degenerate MediaBox",
                i + 1
            )));
        }

        // One embedded copy per source page, however many pages draw it
        let xobject_id = match embedded.get(&source_page_id) {
            Some(&id) => id,
            None => {
                let id = page_to_xobject(&mut output, &source, source_page_id, &mut cache)?;
                embedded.insert(source_page_id, id);
                id
            }
        };

        let (scale, offset_x, offset_y) =
            contain_fit(src_width, src_height, target_width, target_height);

        // Shift by the source box origin so offset MediaBoxes land correctly
        let tx = offset_x - media_box[0] * scale;
        let ty = offset_y - media_box[1] * scale;

        let xobject_name = format!("P{}", i);
        let content = format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            scale, scale, tx, ty, xobject_name
        );
        let content_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(xobject_name.as_bytes(), Object::Reference(xobject_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(target_width as f32),
                Object::Real(target_height as f32),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        let page_id = output.add_object(page_dict);
        kids.push(Object::Reference(page_id));
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

/// Rescale every page to a named size.
pub fn resize_pages_to(bytes: &[u8], size: PageSize) -> Result<Vec<u8>, PageForgeError> {
    let (width, height) = size.dimensions();
    resize_pages(bytes, width, height)
}

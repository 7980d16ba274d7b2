//! Form flattening
//!
//! Replaces interactive form fields with their visual appearance: each widget
//! annotation's normal appearance stream is drawn into the page content at
//! the widget rectangle, then the widgets and the document AcroForm are
//! removed. The result has no interactive fields and cannot be un-flattened.
//! Annotations that are not form widgets are left alone.

use crate::error::PageForgeError;
use crate::overlay::wrap_page_content;
use crate::pagetree::{self, parse_box_array};
use crate::{load_document, save_document};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Annotation flag bit 2: hidden
const FLAG_HIDDEN: i64 = 1 << 1;

/// Map an appearance BBox through the form's Matrix and take the bounds.
fn transform_bbox(bbox: [f64; 4], m: [f64; 6]) -> [f64; 4] {
    let corners = [
        (bbox[0], bbox[1]),
        (bbox[2], bbox[1]),
        (bbox[0], bbox[3]),
        (bbox[2], bbox[3]),
    ];
    let mut out = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
    for (x, y) in corners {
        let tx = m[0] * x + m[2] * y + m[4];
        let ty = m[1] * x + m[3] * y + m[5];
        out[0] = out[0].min(tx);
        out[1] = out[1].min(ty);
        out[2] = out[2].max(tx);
        out[3] = out[3].max(ty);
    }
    out
}

/// Resolve a widget's normal appearance stream.
///
/// `/AP /N` is either a direct stream reference or, for stateful widgets
/// like checkboxes, a dictionary of streams keyed by state; the active one
/// is named by the widget's `/AS` entry.
fn normal_appearance(doc: &Document, annot: &Dictionary) -> Option<ObjectId> {
    let ap = annot.get(b"AP").ok()?;
    let ap_dict = pagetree::resolve(doc, ap).as_dict().ok()?;
    let n = ap_dict.get(b"N").ok()?;

    if let Ok(id) = n.as_reference() {
        if let Ok(obj) = doc.get_object(id) {
            if obj.as_stream().is_ok() {
                return Some(id);
            }
            // State dictionary behind a reference
            if let Ok(states) = obj.as_dict() {
                return state_appearance(annot, states);
            }
        }
        return None;
    }
    if let Ok(states) = n.as_dict() {
        return state_appearance(annot, states);
    }
    None
}

fn state_appearance(annot: &Dictionary, states: &Dictionary) -> Option<ObjectId> {
    let state = annot.get(b"AS").ok()?.as_name().ok()?;
    states.get(state).ok()?.as_reference().ok()
}

/// Burn every form field's appearance into static page content and remove
/// the interactive layer.
pub fn flatten_forms(bytes: &[u8]) -> Result<Vec<u8>, PageForgeError> {
    let mut doc = load_document(bytes)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut flattened = 0usize;

    for &page_id in &page_ids {
        let annots: Vec<Object> = {
            let page_dict = doc.get_dictionary(page_id).map_err(|e| {
                PageForgeError::OperationError(format!("Page lookup failed: {}", e))
            })?;
            match page_dict.get(b"Annots") {
                Ok(obj) => match pagetree::resolve(&doc, obj).as_array() {
                    Ok(arr) => arr.clone(),
                    Err(_) => Vec::new(),
                },
                Err(_) => continue,
            }
        };
        if annots.is_empty() {
            continue;
        }

        let mut kept = Vec::new();
        let mut draws: Vec<(String, ObjectId)> = Vec::new();
        let mut ops = String::from("Q\n");

        for annot_obj in annots {
            let annot = match pagetree::resolve(&doc, &annot_obj).as_dict() {
                Ok(dict) => dict,
                Err(_) => {
                    kept.push(annot_obj);
                    continue;
                }
            };
            let is_widget = annot
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Widget")
                .unwrap_or(false);
            if !is_widget {
                kept.push(annot_obj);
                continue;
            }

            let hidden = annot
                .get(b"F")
                .and_then(Object::as_i64)
                .map(|flags| flags & FLAG_HIDDEN != 0)
                .unwrap_or(false);
            if hidden {
                continue;
            }

            let appearance_id = match normal_appearance(&doc, annot) {
                Some(id) => id,
                None => continue,
            };
            let rect = match annot.get(b"Rect") {
                Ok(obj) => match pagetree::resolve(&doc, obj).as_array() {
                    Ok(arr) => parse_box_array(arr)?,
                    Err(_) => continue,
                },
                Err(_) => continue,
            };

            let stream = doc
                .get_object(appearance_id)
                .and_then(Object::as_stream)
                .map_err(|e| {
                    PageForgeError::OperationError(format!("Bad appearance stream: {}", e))
                })?;
            let bbox = match stream.dict.get(b"BBox").and_then(Object::as_array) {
                Ok(arr) => parse_box_array(arr)?,
                Err(_) => continue,
            };
            let matrix = match stream.dict.get(b"Matrix").and_then(Object::as_array) {
                Ok(arr) if arr.len() == 6 => {
                    let mut m = [0.0; 6];
                    for (i, obj) in arr.iter().enumerate() {
                        m[i] = match obj {
                            Object::Integer(n) => *n as f64,
                            Object::Real(n) => *n as f64,
                            _ => return Err(PageForgeError::OperationError(
                                "Appearance Matrix element is not a number".to_string(),
                            )),
                        };
                    }
                    m
                }
                _ => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            };

            // Fit the (transformed) appearance box onto the widget rectangle
            let fitted = transform_bbox(bbox, matrix);
            let (box_w, box_h) = (fitted[2] - fitted[0], fitted[3] - fitted[1]);
            if box_w <= 0.0 || box_h <= 0.0 {
                continue;
            }
            let sx = (rect[2] - rect[0]) / box_w;
            let sy = (rect[3] - rect[1]) / box_h;
            let tx = rect[0] - fitted[0] * sx;
            let ty = rect[1] - fitted[1] * sy;

            let name = format!("Fz{}", draws.len());
            ops.push_str(&format!(
                "q\n{sx} 0 0 {sy} {tx} {ty} cm\n/{name} Do\nQ\n",
                sx = sx,
                sy = sy,
                tx = tx,
                ty = ty,
                name = name,
            ));
            draws.push((name, appearance_id));
            flattened += 1;
        }

        if !draws.is_empty() {
            let mut resources = {
                let page_dict = doc.get_dictionary(page_id).map_err(|e| {
                    PageForgeError::OperationError(format!("Page lookup failed: {}", e))
                })?;
                pagetree::effective_resources(&doc, page_dict)
            };
            let mut xobjects = match resources.get(b"XObject") {
                Ok(obj) => pagetree::resolve(&doc, obj)
                    .as_dict()
                    .cloned()
                    .unwrap_or_default(),
                Err(_) => Dictionary::new(),
            };
            for (name, id) in &draws {
                xobjects.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));

            let suffix_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
            wrap_page_content(&mut doc, page_id, prefix_id, suffix_id)?;

            let page_dict = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| {
                    PageForgeError::OperationError(format!("Page lookup failed: {}", e))
                })?;
            page_dict.set("Resources", Object::Dictionary(resources));
        }

        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        if kept.is_empty() {
            page_dict.remove(b"Annots");
        } else {
            page_dict.set("Annots", Object::Array(kept));
        }
    }

    if let Ok(catalog) = doc.catalog_mut() {
        catalog.remove(b"AcroForm");
    }

    tracing::debug!(fields = flattened, "flattened form fields");

    doc.prune_objects();
    save_document(&mut doc)
}

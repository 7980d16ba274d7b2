//! Shared helpers for reading page dictionaries
//!
//! Page attributes like MediaBox, Rotate and Resources are inheritable: a
//! page missing the key takes it from its parent Pages node. These helpers
//! resolve that (one level, which covers the flat page trees this engine
//! writes and the vast majority of real files) and normalize the values.

use crate::error::PageForgeError;
use lopdf::{Dictionary, Document, Object};

/// US Letter, the fallback when a page tree carries no MediaBox at all.
pub(crate) const LETTER_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Follow reference objects to the target object.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    while let Object::Reference(id) = obj {
        match doc.get_object(*id) {
            Ok(target) => obj = target,
            Err(_) => break,
        }
    }
    obj
}

/// Get MediaBox from a page, inheriting from the parent if necessary.
///
/// Returns `[llx, lly, urx, ury]`; callers compute width/height as
/// `box[2] - box[0]` / `box[3] - box[1]`.
pub(crate) fn media_box(doc: &Document, page_dict: &Dictionary) -> Result<[f64; 4], PageForgeError> {
    if let Ok(media_box) = page_dict.get(b"MediaBox") {
        if let Ok(array) = resolve(doc, media_box).as_array() {
            return parse_box_array(array);
        }
    }

    // Try to inherit from parent
    if let Ok(parent_ref) = page_dict.get(b"Parent") {
        if let Ok(parent_id) = parent_ref.as_reference() {
            if let Some(parent_obj) = doc.objects.get(&parent_id) {
                if let Ok(parent_dict) = parent_obj.as_dict() {
                    if let Ok(media_box) = parent_dict.get(b"MediaBox") {
                        if let Ok(array) = resolve(doc, media_box).as_array() {
                            return parse_box_array(array);
                        }
                    }
                }
            }
        }
    }

    Ok(LETTER_BOX)
}

/// Parse a box array [llx, lly, urx, ury]
pub(crate) fn parse_box_array(array: &[Object]) -> Result<[f64; 4], PageForgeError> {
    if array.len() != 4 {
        return Err(PageForgeError::OperationError(
            "MediaBox must have 4 elements".to_string(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(PageForgeError::OperationError(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

/// Get rotation from a page, inheriting from the parent if necessary.
pub(crate) fn page_rotation(doc: &Document, page_dict: &Dictionary) -> i32 {
    if let Ok(rotate) = page_dict.get(b"Rotate") {
        if let Ok(angle) = rotate.as_i64() {
            return normalize_rotation(angle as i32);
        }
    }

    if let Ok(parent_ref) = page_dict.get(b"Parent") {
        if let Ok(parent_id) = parent_ref.as_reference() {
            if let Some(parent_obj) = doc.objects.get(&parent_id) {
                if let Ok(parent_dict) = parent_obj.as_dict() {
                    if let Ok(rotate) = parent_dict.get(b"Rotate") {
                        if let Ok(angle) = rotate.as_i64() {
                            return normalize_rotation(angle as i32);
                        }
                    }
                }
            }
        }
    }

    0
}

/// Normalize a rotation to 0, 90, 180, or 270
pub(crate) fn normalize_rotation(angle: i32) -> i32 {
    let normalized = angle % 360;
    if normalized < 0 {
        normalized + 360
    } else {
        normalized
    }
}

/// Get the concatenated content stream data from a page.
///
/// `/Contents` may be a single stream reference or an array of them; the
/// streams are decompressed where possible and joined with newlines.
pub(crate) fn page_content(
    doc: &Document,
    page_dict: &Dictionary,
) -> Result<Vec<u8>, PageForgeError> {
    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => {
            let obj = doc
                .get_object(*id)
                .map_err(|e| PageForgeError::OperationError(format!("Bad content ref: {}", e)))?;
            if let Ok(stream) = obj.as_stream() {
                // Fall back to raw content if the stream is not compressed
                match stream.decompressed_content() {
                    Ok(content) => Ok(content),
                    Err(_) => Ok(stream.content.clone()),
                }
            } else {
                Ok(Vec::new())
            }
        }
        // Streams must be indirect in a conformant file, but in-memory
        // documents can hold one inline
        Object::Stream(stream) => match stream.decompressed_content() {
            Ok(content) => Ok(content),
            Err(_) => Ok(stream.content.clone()),
        },
        Object::Array(arr) => {
            let mut result = Vec::new();
            for obj in arr {
                if let Object::Reference(id) = obj {
                    if let Ok(stream) = doc
                        .get_object(*id)
                        .map_err(|e| {
                            PageForgeError::OperationError(format!("Bad content ref: {}", e))
                        })?
                        .as_stream()
                    {
                        let content = match stream.decompressed_content() {
                            Ok(c) => c,
                            Err(_) => stream.content.clone(),
                        };
                        result.extend_from_slice(&content);
                        result.push(b'\n');
                    }
                }
            }
            Ok(result)
        }
        _ => Ok(Vec::new()),
    }
}

/// Get a page's effective Resources dictionary (own or inherited), cloned.
pub(crate) fn effective_resources(doc: &Document, page_dict: &Dictionary) -> Dictionary {
    if let Ok(res) = page_dict.get(b"Resources") {
        if let Ok(dict) = resolve(doc, res).as_dict() {
            return dict.clone();
        }
    }

    if let Ok(parent_ref) = page_dict.get(b"Parent") {
        if let Ok(parent_id) = parent_ref.as_reference() {
            if let Some(parent_obj) = doc.objects.get(&parent_id) {
                if let Ok(parent_dict) = parent_obj.as_dict() {
                    if let Ok(res) = parent_dict.get(b"Resources") {
                        if let Ok(dict) = resolve(doc, res).as_dict() {
                            return dict.clone();
                        }
                    }
                }
            }
        }
    }

    Dictionary::new()
}

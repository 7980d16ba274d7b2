//! Page rotation
//!
//! Sets the viewer rotation of selected pages by writing the page's /Rotate
//! entry. The angle is absolute, not cumulative: rotating a page to 90 twice
//! leaves it at 90.

use crate::error::PageForgeError;
use crate::pages::parse_page_spec;
use crate::pagetree::normalize_rotation;
use crate::{load_document, save_document};
use lopdf::Object;

/// Set the rotation of the selected pages (all pages when `spec` is `None`).
///
/// `degrees` must be a multiple of 90; negative angles are normalized, so
/// -90 becomes 270.
pub fn rotate_pages(
    bytes: &[u8],
    spec: Option<&str>,
    degrees: i32,
) -> Result<Vec<u8>, PageForgeError> {
    if degrees % 90 != 0 {
        return Err(PageForgeError::ValidationError(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            degrees
        )));
    }
    let angle = normalize_rotation(degrees);

    let mut doc = load_document(bytes)?;
    let pages = doc.get_pages();
    let page_count = pages.len();

    let selection: Vec<usize> = match spec {
        Some(spec) => {
            let parsed = parse_page_spec(spec, page_count);
            if parsed.is_empty() {
                return Err(PageForgeError::InvalidSelection(format!(
                    "No valid pages in selection \"{}\" for a {}-page document",
                    spec, page_count
                )));
            }
            parsed
        }
        None => (0..page_count).collect(),
    };

    tracing::debug!(pages = selection.len(), angle, "rotating pages");

    let page_ids: Vec<_> = pages.values().copied().collect();
    for &index in &selection {
        let page_id = page_ids[index];
        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        page_dict.set("Rotate", Object::Integer(angle as i64));
    }

    save_document(&mut doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::page_details;
    use lopdf::{dictionary, Dictionary, Document, Stream};

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("BT /F1 12 Tf 72 72 Td (Page {}) Tj ET", i + 1).into_bytes(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => num_pages as i64,
                "Kids" => kids,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_rotate_all_pages() {
        let pdf = create_test_pdf(3);
        let result = rotate_pages(&pdf, None, 90).unwrap();

        let details = page_details(&result).unwrap();
        for page in details {
            assert_eq!(page.rotation, 90);
        }
    }

    #[test]
    fn test_rotate_selected_pages_only() {
        let pdf = create_test_pdf(3);
        let result = rotate_pages(&pdf, Some("2"), 180).unwrap();

        let details = page_details(&result).unwrap();
        assert_eq!(details[0].rotation, 0);
        assert_eq!(details[1].rotation, 180);
        assert_eq!(details[2].rotation, 0);
    }

    #[test]
    fn test_rotate_is_absolute_not_cumulative() {
        let pdf = create_test_pdf(1);
        let once = rotate_pages(&pdf, None, 90).unwrap();
        let twice = rotate_pages(&once, None, 90).unwrap();

        let details = page_details(&twice).unwrap();
        assert_eq!(details[0].rotation, 90);
    }

    #[test]
    fn test_negative_angle_normalizes() {
        let pdf = create_test_pdf(1);
        let result = rotate_pages(&pdf, None, -90).unwrap();

        let details = page_details(&result).unwrap();
        assert_eq!(details[0].rotation, 270);
    }

    #[test]
    fn test_rejects_non_right_angle() {
        let pdf = create_test_pdf(1);
        assert!(matches!(
            rotate_pages(&pdf, None, 45),
            Err(PageForgeError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_empty_selection() {
        let pdf = create_test_pdf(2);
        assert!(matches!(
            rotate_pages(&pdf, Some("9-12"), 90),
            Err(PageForgeError::InvalidSelection(_))
        ));
    }
}

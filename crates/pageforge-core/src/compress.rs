//! Structural compression
//!
//! Shrinks a document without touching its rendered appearance: prunes
//! objects unreachable from the catalog, renumbers the survivors into a
//! dense ID range, and flate-compresses content streams that carry no
//! filter yet. Raster images are never re-encoded or downsampled.

use crate::error::PageForgeError;
use crate::{load_document, save_document};

/// Re-encode the document structure as small as it goes.
pub fn compress_document(bytes: &[u8]) -> Result<Vec<u8>, PageForgeError> {
    let mut doc = load_document(bytes)?;

    let before = doc.objects.len();
    doc.prune_objects();
    doc.renumber_objects();
    doc.compress();
    let after = doc.objects.len();
    tracing::debug!(
        objects_before = before,
        objects_after = after,
        "compressed document"
    );

    save_document(&mut doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    /// Uncompressed pages with padding text that deflates well
    fn create_verbose_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let filler = "The quick brown fox jumps over the lazy dog. ".repeat(40);
            let content = format!("BT /F1 12 Tf 72 700 Td (Page {} {}) Tj ET", i + 1, filler);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
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

        // An object nothing references, to exercise pruning
        doc.add_object(dictionary! {
            "Orphan" => Object::string_literal("dangling"),
        });

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_compress_shrinks_uncompressed_document() {
        let pdf = create_verbose_pdf(5);
        let compressed = compress_document(&pdf).unwrap();
        assert!(compressed.len() < pdf.len());
    }

    #[test]
    fn test_compress_preserves_pages_and_content() {
        let pdf = create_verbose_pdf(3);
        let compressed = compress_document(&pdf).unwrap();

        let doc = Document::load_mem(&compressed).unwrap();
        assert_eq!(doc.get_pages().len(), 3);

        let page_id = *doc.get_pages().get(&2).unwrap();
        let page_dict = doc.get_dictionary(page_id).unwrap();
        let content = crate::pagetree::page_content(&doc, page_dict).unwrap();
        assert!(String::from_utf8_lossy(&content).contains("(Page 2"));
    }

    #[test]
    fn test_compress_prunes_and_renumbers() {
        let pdf = create_verbose_pdf(2);
        let compressed = compress_document(&pdf).unwrap();

        let doc = Document::load_mem(&compressed).unwrap();
        let no_orphans = doc.objects.values().all(|obj| {
            obj.as_dict()
                .map(|dict| dict.get(b"Orphan").is_err())
                .unwrap_or(true)
        });
        assert!(no_orphans);

        // Renumbering leaves a dense 1..=n ID range
        let max_id = doc.objects.keys().map(|id| id.0).max().unwrap();
        assert_eq!(max_id as usize, doc.objects.len());
    }

    #[test]
    fn test_compress_twice_stays_loadable() {
        let pdf = create_verbose_pdf(2);
        let once = compress_document(&pdf).unwrap();
        let twice = compress_document(&once).unwrap();

        let doc = Document::load_mem(&twice).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}

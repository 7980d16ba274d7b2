//! Page deletion and extraction
//!
//! Both take a best-effort page spec. Delete removes the selection, extract
//! keeps it (complement delete). Removal always walks indices high-to-low so
//! deleting a page never shifts one still waiting to be deleted.

use crate::error::PageForgeError;
use crate::pages::parse_page_spec;
use crate::{load_document, save_document};
use std::collections::HashSet;

/// Delete the pages named by `spec` (1-indexed, e.g. "2,4-6").
///
/// Bad tokens are dropped per the best-effort parse; the operation fails with
/// `InvalidSelection` only when nothing valid remains or the selection would
/// remove every page.
pub fn delete_pages(bytes: &[u8], spec: &str) -> Result<Vec<u8>, PageForgeError> {
    let mut doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();

    let selection = parse_page_spec(spec, page_count);
    if selection.is_empty() {
        return Err(PageForgeError::InvalidSelection(format!(
            "Spec '{}' selects no pages",
            spec
        )));
    }
    if selection.len() == page_count {
        return Err(PageForgeError::InvalidSelection(
            "Cannot delete every page".to_string(),
        ));
    }

    tracing::debug!(pages = selection.len(), total = page_count, "deleting pages");

    // Delete in reverse order to keep earlier indices valid
    for &index in selection.iter().rev() {
        doc.delete_pages(&[(index + 1) as u32]);
    }

    doc.prune_objects();
    doc.compress();

    save_document(&mut doc)
}

/// Keep only the pages named by `spec`, dropping the rest.
pub fn extract_pages(bytes: &[u8], spec: &str) -> Result<Vec<u8>, PageForgeError> {
    let mut doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();

    let selection = parse_page_spec(spec, page_count);
    if selection.is_empty() {
        return Err(PageForgeError::InvalidSelection(format!(
            "Spec '{}' selects no pages",
            spec
        )));
    }

    let keep: HashSet<usize> = selection.into_iter().collect();
    let mut to_delete: Vec<usize> = (0..page_count).filter(|i| !keep.contains(i)).collect();
    to_delete.reverse();

    tracing::debug!(
        kept = keep.len(),
        dropped = to_delete.len(),
        "extracting pages"
    );

    for index in to_delete {
        doc.delete_pages(&[(index + 1) as u32]);
    }

    doc.prune_objects();
    doc.compress();

    save_document(&mut doc)
}

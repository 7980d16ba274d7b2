//! Metadata removal
//!
//! Strips identifying document metadata: the trailer `/Info` dictionary
//! (title, author, subject, keywords, creator, producer, dates) and the
//! catalog's XMP `/Metadata` stream. Page content is untouched.

use crate::error::PageForgeError;
use crate::{load_document, save_document};

/// Remove the Info dictionary and XMP metadata stream.
///
/// Idempotent: stripping an already-stripped document returns the same
/// bytes, since nothing is left to remove and serialization is stable.
pub fn strip_metadata(bytes: &[u8]) -> Result<Vec<u8>, PageForgeError> {
    let mut doc = load_document(bytes)?;

    let had_info = doc.trailer.remove(b"Info").is_some();
    let had_xmp = match doc.catalog_mut() {
        Ok(catalog) => catalog.remove(b"Metadata").is_some(),
        Err(_) => false,
    };
    tracing::debug!(had_info, had_xmp, "stripped document metadata");

    // Drops the now-unreferenced Info dictionary and metadata stream.
    // Renumbering keeps the id range dense, so re-stripping serializes to
    // the same bytes instead of appending a fresh xref object each pass.
    doc.prune_objects();
    doc.renumber_objects();
    save_document(&mut doc)
}

//! PDF structural editing operations
//!
//! This crate manipulates PDF documents at the object level using lopdf:
//! page-list surgery (delete, extract, reorder, merge), geometry (resize,
//! rotate), content stamping (overlay, watermark), form flattening,
//! password protection, repair, metadata stripping and compression.
//!
//! Every operation is a pure function over byte buffers: it parses its
//! input, mutates a fresh in-memory document and serializes a complete new
//! file, leaving the input untouched. Workflows chain operations by
//! feeding each step's output bytes to the next.

mod embed;
mod pagetree;
mod rc4;

pub mod compress;
pub mod coords;
pub mod delete;
pub mod encryption;
pub mod error;
pub mod flatten;
pub mod inspect;
pub mod merge;
pub mod metadata;
pub mod overlay;
pub mod pages;
pub mod permissions;
pub mod reorder;
pub mod repair;
pub mod resize;
pub mod rotate;
pub mod watermark;
pub mod workflow;

pub use compress::compress_document;
pub use delete::{delete_pages, extract_pages};
pub use encryption::{remove_password, set_encryption};
pub use error::PageForgeError;
pub use flatten::flatten_forms;
pub use inspect::{page_details, validate_pdf, DocumentInfo, PageDetails, PageOrientation};
pub use merge::merge_documents;
pub use metadata::strip_metadata;
pub use overlay::{apply_overlay, OverlayElement, TextStyle};
pub use permissions::{decode_permissions, encode_permissions, PermissionPolicy, Permissions};
pub use reorder::reorder_pages;
pub use repair::repair;
pub use resize::{resize_pages, resize_pages_to, PageSize};
pub use rotate::rotate_pages;
pub use watermark::{watermark, WatermarkOptions};
pub use workflow::{parse_plan, run_workflow, WorkflowStep};

use lopdf::Document;

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, PageForgeError> {
    let doc = load_document(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

/// Load a document for mutation, rejecting encrypted input up front so
/// operations never mangle ciphertext they cannot read.
pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PageForgeError> {
    let doc = Document::load_mem(bytes).map_err(|e| PageForgeError::ParseError(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PageForgeError::EncryptedInput(
            "Document is encrypted; remove the password first".to_string(),
        ));
    }
    Ok(doc)
}

/// Serialize a document to a fresh byte buffer.
pub(crate) fn save_document(doc: &mut Document) -> Result<Vec<u8>, PageForgeError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageForgeError::SerializationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

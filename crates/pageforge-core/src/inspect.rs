//! PDF validation and info extraction
//!
//! Read-only facts callers need before choosing an operation: page count,
//! per-page geometry, encryption flag, document metadata.

use crate::error::PageForgeError;
use crate::pagetree;
use lopdf::Document;
use serde::Serialize;

/// Document-level information extracted during validation
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
    /// Document subject from metadata (if available)
    pub subject: Option<String>,
    /// Document keywords from metadata (if available)
    pub keywords: Option<String>,
    /// Application that created the original document (if available)
    pub creator: Option<String>,
    /// Application that produced the PDF (if available)
    pub producer: Option<String>,
}

/// Geometry of a single page
#[derive(Debug, Clone, Serialize)]
pub struct PageDetails {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    /// Estimated orientation based on dimensions
    pub orientation: PageOrientation,
}

/// Page orientation
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

/// Validate a PDF buffer and extract basic info
pub fn validate_pdf(bytes: &[u8]) -> Result<DocumentInfo, PageForgeError> {
    // Check minimum size
    if bytes.len() < 8 {
        return Err(PageForgeError::ParseError(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    // Check PDF magic bytes
    if !bytes.starts_with(b"%PDF-") {
        return Err(PageForgeError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    let version = extract_version(bytes);

    let document =
        Document::load_mem(bytes).map_err(|e| PageForgeError::ParseError(e.to_string()))?;

    let encrypted = document.is_encrypted();

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PageForgeError::ParseError("PDF has no pages".to_string()));
    }

    // Metadata strings in an encrypted file are ciphertext; skip them
    let mut info = DocumentInfo {
        page_count,
        version,
        encrypted,
        size_bytes: bytes.len(),
        ..Default::default()
    };
    if !encrypted {
        info.title = info_string(&document, b"Title");
        info.author = info_string(&document, b"Author");
        info.subject = info_string(&document, b"Subject");
        info.keywords = info_string(&document, b"Keywords");
        info.creator = info_string(&document, b"Creator");
        info.producer = info_string(&document, b"Producer");
    }

    Ok(info)
}

/// Extract per-page geometry for every page in the buffer
pub fn page_details(bytes: &[u8]) -> Result<Vec<PageDetails>, PageForgeError> {
    let doc = Document::load_mem(bytes).map_err(|e| PageForgeError::ParseError(e.to_string()))?;
    let pages = doc.get_pages();

    let mut details = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PageForgeError::ParseError(format!("Page {}: {}", page_num, e)))?;

        let media_box = pagetree::media_box(&doc, page_dict)?;
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);
        let rotation = pagetree::page_rotation(&doc, page_dict);

        // Orientation accounts for rotation: a portrait page rotated 90 reads landscape
        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        details.push(PageDetails {
            page_num,
            width,
            height,
            rotation,
            orientation,
        });
    }

    Ok(details)
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        let version_bytes = &bytes[5..8];
        if let Ok(version) = std::str::from_utf8(version_bytes) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string() // Default version
}

/// Read one string field from the trailer's Info dictionary
fn info_string(document: &Document, key: &[u8]) -> Option<String> {
    let info_ref = document.trailer.get(b"Info").ok()?;
    let info_id = info_ref.as_reference().ok()?;
    let info_dict = document.objects.get(&info_id)?.as_dict().ok()?;

    let value = info_dict.get(key).ok()?;
    let bytes = value.as_str().ok()?;
    let decoded = String::from_utf8_lossy(bytes);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}

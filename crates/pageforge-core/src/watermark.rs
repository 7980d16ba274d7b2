//! Text watermarking
//!
//! Stamps semi-transparent text centered on every page, diagonal by default.
//! Opacity goes through an ExtGState (`ca`/`CA`), so the watermark blends
//! over existing content instead of covering it.

use crate::error::PageForgeError;
use crate::overlay::{escape_pdf_string, helvetica_font, wrap_page_content};
use crate::pagetree;
use crate::{load_document, save_document};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

const WATERMARK_FONT: &str = "WmF1";
const WATERMARK_GSTATE: &str = "WmGs0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatermarkOptions {
    pub font_size: f64,
    /// 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f64,
    /// Gray level, 0.0 (black) to 1.0 (white)
    pub gray: f64,
    /// Rotate the text 45 degrees across the page
    pub diagonal: bool,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            opacity: 0.3,
            gray: 0.6,
            diagonal: true,
        }
    }
}

/// Stamp `text` centered on every page.
pub fn watermark(
    bytes: &[u8],
    text: &str,
    options: &WatermarkOptions,
) -> Result<Vec<u8>, PageForgeError> {
    if text.trim().is_empty() {
        return Err(PageForgeError::ValidationError(
            "Watermark text must not be empty".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&options.opacity) {
        return Err(PageForgeError::ValidationError(format!(
            "Opacity must be between 0 and 1, got {}",
            options.opacity
        )));
    }
    if !(0.0..=1.0).contains(&options.gray) {
        return Err(PageForgeError::ValidationError(format!(
            "Gray level must be between 0 and 1, got {}",
            options.gray
        )));
    }
    if options.font_size <= 0.0 {
        return Err(PageForgeError::ValidationError(format!(
            "Font size must be positive, got {}",
            options.font_size
        )));
    }

    let mut doc = load_document(bytes)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    tracing::debug!(pages = page_ids.len(), text, "applying watermark");

    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(options.opacity as f32));
    gstate.set("CA", Object::Real(options.opacity as f32));
    let gstate_id = doc.add_object(gstate);
    let font_id = doc.add_object(helvetica_font());

    // One shared q-stream; each page gets its own draw stream
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let escaped = escape_pdf_string(text);
    // Helvetica glyphs average about half an em wide
    let text_width = 0.5 * options.font_size * escaped.chars().count() as f64;

    for &page_id in &page_ids {
        let (media_box, mut resources) = {
            let page_dict = doc.get_dictionary(page_id).map_err(|e| {
                PageForgeError::OperationError(format!("Page lookup failed: {}", e))
            })?;
            (
                pagetree::media_box(&doc, page_dict)?,
                pagetree::effective_resources(&doc, page_dict),
            )
        };
        let center_x = (media_box[0] + media_box[2]) / 2.0;
        let center_y = (media_box[1] + media_box[3]) / 2.0;

        // Text matrix: rotate about the page center, then back off half the
        // string width so the text is visually centered
        let (cos, sin, neg_sin) = if options.diagonal {
            let r = std::f64::consts::FRAC_PI_4;
            (r.cos(), r.sin(), -r.sin())
        } else {
            (1.0, 0.0, 0.0)
        };
        let ops = format!(
            "Q\nq\n/{gs} gs\n{gray} g\nBT\n/{font} {size} Tf\n{c} {s} {ns} {c} {cx} {cy} Tm\n{tx} {ty} Td\n({text}) Tj\nET\nQ\n",
            gs = WATERMARK_GSTATE,
            gray = options.gray,
            font = WATERMARK_FONT,
            size = options.font_size,
            c = cos,
            s = sin,
            ns = neg_sin,
            cx = center_x,
            cy = center_y,
            tx = -text_width / 2.0,
            ty = -options.font_size * 0.35,
            text = escaped,
        );
        let suffix_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        wrap_page_content(&mut doc, page_id, prefix_id, suffix_id)?;

        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => pagetree::resolve(&doc, obj)
                .as_dict()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        fonts.set(WATERMARK_FONT, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let mut gstates = match resources.get(b"ExtGState") {
            Ok(obj) => pagetree::resolve(&doc, obj)
                .as_dict()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        gstates.set(WATERMARK_GSTATE, Object::Reference(gstate_id));
        resources.set("ExtGState", Object::Dictionary(gstates));

        let page_dict = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    save_document(&mut doc)
}

//! Overlay stamping
//!
//! Burns positioned text runs, image stamps and date stamps into a page's
//! content stream. Element coordinates arrive in screen space (top-left
//! origin, pixels at a given render scale) and are mapped into PDF user
//! space before drawing. The original content is wrapped in a save/restore
//! pair so overlay draws always start from a clean graphics state; elements
//! draw in caller order, so later elements cover earlier ones.

use crate::coords::{image_anchor, text_anchor};
use crate::error::PageForgeError;
use crate::pagetree;
use crate::{load_document, save_document};
use base64::Engine;
use chrono::format::{Item, StrftimeItems};
use chrono::Utc;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Resource name under which the overlay font is registered on a page.
const OVERLAY_FONT: &str = "OvF1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: "#000000".to_string(),
        }
    }
}

/// A single element to stamp onto a page.
///
/// `x`/`y` are screen pixels (top-left origin) at the render scale the
/// caller displayed the page with; image `width`/`height` are the displayed
/// pixel dimensions and `data` is the PNG payload as base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum OverlayElement {
    Text {
        x: f64,
        y: f64,
        text: String,
        #[serde(default)]
        style: TextStyle,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        data: String,
    },
    DateStamp {
        x: f64,
        y: f64,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        style: TextStyle,
    },
}

/// Escape special characters for PDF string literals
pub(crate) fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(), // Replace non-ASCII with ?
        })
        .collect()
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range)
pub(crate) fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() >= 6 {
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0) as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0) as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0) as f32 / 255.0;
        (r, g, b)
    } else {
        (0.0, 0.0, 0.0) // Default to black
    }
}

/// Zlib-compress data for a FlateDecode stream.
pub(crate) fn flate_compress(data: &[u8]) -> Result<Vec<u8>, PageForgeError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PageForgeError::OperationError(format!("Compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PageForgeError::OperationError(format!("Compression failed: {}", e)))
}

/// Standard Helvetica font dictionary for overlay text.
pub(crate) fn helvetica_font() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font
}

struct DecodedPng {
    width: u32,
    height: u32,
    color_space: &'static [u8],
    pixels: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Decode a PNG into raw 8-bit samples, splitting off the alpha channel.
fn decode_png(data: &[u8]) -> Result<DecodedPng, PageForgeError> {
    let mut decoder = png::Decoder::new(data);
    // Expand palette/low-bit-depth images and fold 16-bit down to 8
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| PageForgeError::OperationError(format!("Failed to decode PNG: {}", e)))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| PageForgeError::OperationError(format!("Failed to decode PNG: {}", e)))?;
    buf.truncate(info.buffer_size());

    let (color_space, pixels, alpha) = match info.color_type {
        png::ColorType::Rgb => (b"DeviceRGB" as &'static [u8], buf, None),
        png::ColorType::Rgba => {
            let count = (info.width * info.height) as usize;
            let mut rgb = Vec::with_capacity(count * 3);
            let mut mask = Vec::with_capacity(count);
            for pixel in buf.chunks_exact(4) {
                rgb.extend_from_slice(&pixel[..3]);
                mask.push(pixel[3]);
            }
            (b"DeviceRGB" as &'static [u8], rgb, Some(mask))
        }
        png::ColorType::Grayscale => (b"DeviceGray" as &'static [u8], buf, None),
        png::ColorType::GrayscaleAlpha => {
            let count = (info.width * info.height) as usize;
            let mut gray = Vec::with_capacity(count);
            let mut mask = Vec::with_capacity(count);
            for pixel in buf.chunks_exact(2) {
                gray.push(pixel[0]);
                mask.push(pixel[1]);
            }
            (b"DeviceGray" as &'static [u8], gray, Some(mask))
        }
        other => {
            return Err(PageForgeError::OperationError(format!(
                "Unsupported PNG color type: {:?}",
                other
            )))
        }
    };

    Ok(DecodedPng {
        width: info.width,
        height: info.height,
        color_space,
        pixels,
        alpha,
    })
}

/// Embed a decoded PNG as an image XObject, with the alpha channel (if any)
/// attached as a grayscale soft mask.
fn add_image_xobject(doc: &mut Document, image: &DecodedPng) -> Result<ObjectId, PageForgeError> {
    let smask_id = match &image.alpha {
        Some(alpha) => {
            let mut mask_dict = Dictionary::new();
            mask_dict.set("Type", Object::Name(b"XObject".to_vec()));
            mask_dict.set("Subtype", Object::Name(b"Image".to_vec()));
            mask_dict.set("Width", Object::Integer(image.width as i64));
            mask_dict.set("Height", Object::Integer(image.height as i64));
            mask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            mask_dict.set("BitsPerComponent", Object::Integer(8));
            mask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            Some(doc.add_object(Stream::new(mask_dict, flate_compress(alpha)?)))
        }
        None => None,
    };

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(image.width as i64));
    image_dict.set("Height", Object::Integer(image.height as i64));
    image_dict.set("ColorSpace", Object::Name(image.color_space.to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    if let Some(id) = smask_id {
        image_dict.set("SMask", Object::Reference(id));
    }

    Ok(doc.add_object(Stream::new(image_dict, flate_compress(&image.pixels)?)))
}

fn format_date(format: Option<&str>) -> Result<String, PageForgeError> {
    let fmt = format.unwrap_or("%Y-%m-%d");
    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(PageForgeError::ValidationError(format!(
            "Invalid date format \"{}\"",
            fmt
        )));
    }
    Ok(Utc::now().format_with_items(items.iter()).to_string())
}

/// Stamp the given elements onto one page, in caller order.
///
/// `render_scale` is the pixels-per-point factor the element coordinates
/// were captured at. The draws are burned into the content stream; there is
/// no way to remove them afterwards.
pub fn apply_overlay(
    bytes: &[u8],
    page_index: usize,
    elements: &[OverlayElement],
    render_scale: f64,
) -> Result<Vec<u8>, PageForgeError> {
    if elements.is_empty() {
        // No changes, return original
        return Ok(bytes.to_vec());
    }
    if render_scale <= 0.0 {
        return Err(PageForgeError::ValidationError(format!(
            "Render scale must be positive, got {}",
            render_scale
        )));
    }

    let mut doc = load_document(bytes)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let page_id = *page_ids.get(page_index).ok_or_else(|| {
        PageForgeError::InvalidSelection(format!(
            "Page index {} out of range for {}-page document",
            page_index,
            page_ids.len()
        ))
    })?;

    tracing::debug!(page = page_index, elements = elements.len(), "applying overlay");

    let (page_height, mut resources) = {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        let media_box = pagetree::media_box(&doc, page_dict)?;
        (
            media_box[3] - media_box[1],
            pagetree::effective_resources(&doc, page_dict),
        )
    };

    // Restore the pre-content state, then draw
    let mut ops = String::from("Q\n");
    let mut images: Vec<(String, ObjectId)> = Vec::new();
    let mut needs_font = false;

    for element in elements {
        match element {
            OverlayElement::Text { x, y, text, style } => {
                let (pdf_x, pdf_y) =
                    text_anchor(*x, *y, render_scale, page_height, style.font_size);
                let (r, g, b) = parse_hex_color(&style.color);
                needs_font = true;
                ops.push_str(&format!(
                    "{r} {g} {b} rg\nBT\n/{font} {size} Tf\n{x} {y} Td\n({text}) Tj\nET\n",
                    r = r,
                    g = g,
                    b = b,
                    font = OVERLAY_FONT,
                    size = style.font_size,
                    x = pdf_x,
                    y = pdf_y,
                    text = escape_pdf_string(text),
                ));
            }
            OverlayElement::DateStamp {
                x,
                y,
                format,
                style,
            } => {
                let stamp = format_date(format.as_deref())?;
                let (pdf_x, pdf_y) =
                    text_anchor(*x, *y, render_scale, page_height, style.font_size);
                let (r, g, b) = parse_hex_color(&style.color);
                needs_font = true;
                ops.push_str(&format!(
                    "{r} {g} {b} rg\nBT\n/{font} {size} Tf\n{x} {y} Td\n({text}) Tj\nET\n",
                    r = r,
                    g = g,
                    b = b,
                    font = OVERLAY_FONT,
                    size = style.font_size,
                    x = pdf_x,
                    y = pdf_y,
                    text = escape_pdf_string(&stamp),
                ));
            }
            OverlayElement::Image {
                x,
                y,
                width,
                height,
                data,
            } => {
                let raw = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| {
                        PageForgeError::OperationError(format!("Invalid image payload: {}", e))
                    })?;
                let image = decode_png(&raw)?;
                let xobject_id = add_image_xobject(&mut doc, &image)?;
                let name = format!("OvImg{}", images.len());
                images.push((name.clone(), xobject_id));

                let (pdf_x, pdf_y) = image_anchor(*x, *y, render_scale, page_height, *height);
                let width_pts = width / render_scale;
                let height_pts = height / render_scale;
                ops.push_str(&format!(
                    "q\n{w} 0 0 {h} {x} {y} cm\n/{name} Do\nQ\n",
                    w = width_pts,
                    h = height_pts,
                    x = pdf_x,
                    y = pdf_y,
                    name = name,
                ));
            }
        }
    }

    if needs_font {
        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => pagetree::resolve(&doc, obj)
                .as_dict()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        fonts.set(OVERLAY_FONT, Object::Dictionary(helvetica_font()));
        resources.set("Font", Object::Dictionary(fonts));
    }
    if !images.is_empty() {
        let mut xobjects = match resources.get(b"XObject") {
            Ok(obj) => pagetree::resolve(&doc, obj)
                .as_dict()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Dictionary::new(),
        };
        for (name, id) in &images {
            xobjects.set(name.as_bytes(), Object::Reference(*id));
        }
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    // Wrap the original content: save state up front, restore before drawing
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let suffix_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
    wrap_page_content(&mut doc, page_id, prefix_id, suffix_id)?;

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
    page_dict.set("Resources", Object::Dictionary(resources));

    save_document(&mut doc)
}

/// Rewrite a page's /Contents as `[prefix, original streams..., suffix]`.
///
/// The prefix is a bare `q` and the suffix starts with `Q`, so whatever
/// graphics state the original content leaves behind never affects the
/// appended draws.
pub(crate) fn wrap_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    prefix_id: ObjectId,
    suffix_id: ObjectId,
) -> Result<(), PageForgeError> {
    let existing = {
        let page_dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
        page_dict.get(b"Contents").ok().cloned()
    };

    let mut contents = vec![Object::Reference(prefix_id)];
    match existing {
        Some(Object::Array(streams)) => contents.extend(streams),
        // A reference may point at an array of streams rather than a
        // stream; splice its elements, nesting an array is malformed
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(streams)) => contents.extend(streams.clone()),
            _ => contents.push(Object::Reference(id)),
        },
        _ => {}
    }
    contents.push(Object::Reference(suffix_id));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PageForgeError::OperationError(format!("Page lookup failed: {}", e)))?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

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

    fn tiny_png_base64() -> String {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, 2, 2);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&[
                    255, 0, 0, 255, 0, 255, 0, 128, 0, 0, 255, 255, 255, 255, 0, 0,
                ])
                .unwrap();
        }
        base64::engine::general_purpose::STANDARD.encode(&png_data)
    }

    fn page_content_text(bytes: &[u8]) -> String {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page_dict = doc.get_dictionary(page_id).unwrap();
        let content = crate::pagetree::page_content(&doc, page_dict).unwrap();
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn test_empty_elements_returns_original() {
        let pdf = create_test_pdf(1);
        let result = apply_overlay(&pdf, 0, &[], 1.0).unwrap();
        assert_eq!(result, pdf);
    }

    #[test]
    fn test_text_overlay_burned_into_content() {
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::Text {
            x: 100.0,
            y: 50.0,
            text: "Approved".to_string(),
            style: TextStyle::default(),
        }];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let content = page_content_text(&result);
        assert!(content.contains("(Approved) Tj"));
        assert!(content.contains("/OvF1 12 Tf"));
    }

    #[test]
    fn test_overlay_preserves_original_content() {
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::Text {
            x: 0.0,
            y: 0.0,
            text: "Stamp".to_string(),
            style: TextStyle::default(),
        }];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let content = page_content_text(&result);
        assert!(content.contains("(Page 1) Tj"));
        assert!(content.contains("(Stamp) Tj"));
    }

    #[test]
    fn test_contents_reference_to_array_is_spliced() {
        // /Contents here is a reference to an array object; the wrap must
        // splice that array rather than nest it
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let first = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 72 72 Td (Alpha) Tj ET".to_vec(),
        ));
        let second = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 72 92 Td (Beta) Tj ET".to_vec(),
        ));
        let array_id = doc.add_object(Object::Array(vec![
            Object::Reference(first),
            Object::Reference(second),
        ]));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(array_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let elements = vec![OverlayElement::Text {
            x: 10.0,
            y: 10.0,
            text: "Stamp".to_string(),
            style: TextStyle::default(),
        }];
        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();

        let doc = Document::load_mem(&result).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page_dict = doc.get_dictionary(page_id).unwrap();
        let contents = page_dict.get(b"Contents").and_then(Object::as_array).unwrap();
        assert_eq!(contents.len(), 4);
        assert!(contents
            .iter()
            .all(|obj| matches!(obj, Object::Reference(_))));

        let content = page_content_text(&result);
        assert!(content.contains("(Alpha) Tj"));
        assert!(content.contains("(Beta) Tj"));
        assert!(content.contains("(Stamp) Tj"));
    }

    #[test]
    fn test_caller_order_is_draw_order() {
        let pdf = create_test_pdf(1);
        let elements = vec![
            OverlayElement::Text {
                x: 10.0,
                y: 10.0,
                text: "First".to_string(),
                style: TextStyle::default(),
            },
            OverlayElement::Text {
                x: 10.0,
                y: 10.0,
                text: "Second".to_string(),
                style: TextStyle::default(),
            },
        ];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let content = page_content_text(&result);
        let first = content.find("(First)").unwrap();
        let second = content.find("(Second)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_image_overlay_embeds_xobject_with_soft_mask() {
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::Image {
            x: 50.0,
            y: 50.0,
            width: 100.0,
            height: 100.0,
            data: tiny_png_base64(),
        }];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page_dict = doc.get_dictionary(page_id).unwrap();

        let resources = page_dict
            .get(b"Resources")
            .and_then(Object::as_dict)
            .unwrap();
        let xobjects = resources
            .get(b"XObject")
            .and_then(Object::as_dict)
            .unwrap();
        let image_id = xobjects
            .get(b"OvImg0")
            .and_then(Object::as_reference)
            .unwrap();
        let image = doc.get_object(image_id).and_then(Object::as_stream).unwrap();
        assert_eq!(image.dict.get(b"Width").and_then(Object::as_i64).unwrap(), 2);
        assert!(image.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_date_stamp_draws_current_date() {
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::DateStamp {
            x: 10.0,
            y: 10.0,
            format: Some("%Y".to_string()),
            style: TextStyle::default(),
        }];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let content = page_content_text(&result);
        let year = Utc::now().format("%Y").to_string();
        assert!(content.contains(&format!("({}) Tj", year)));
    }

    #[test]
    fn test_text_anchor_applied() {
        // 12pt text at screen (100, 92) on a 792pt page at 1x:
        // baseline y = 792 - 92 - 0.8*12 = 690.4
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::Text {
            x: 100.0,
            y: 92.0,
            text: "T".to_string(),
            style: TextStyle::default(),
        }];

        let result = apply_overlay(&pdf, 0, &elements, 1.0).unwrap();
        let content = page_content_text(&result);
        assert!(content.contains("100 690.4"));
    }

    #[test]
    fn test_page_out_of_range() {
        let pdf = create_test_pdf(2);
        let elements = vec![OverlayElement::Text {
            x: 0.0,
            y: 0.0,
            text: "X".to_string(),
            style: TextStyle::default(),
        }];
        assert!(matches!(
            apply_overlay(&pdf, 5, &elements, 1.0),
            Err(PageForgeError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_bad_image_payload() {
        let pdf = create_test_pdf(1);
        let elements = vec![OverlayElement::Image {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            data: "!!! not base64 !!!".to_string(),
        }];
        assert!(matches!(
            apply_overlay(&pdf, 0, &elements, 1.0),
            Err(PageForgeError::OperationError(_))
        ));
    }

    #[test]
    fn test_escape_pdf_string_basic() {
        assert_eq!(escape_pdf_string("Hello"), "Hello");
        assert_eq!(escape_pdf_string("(test)"), "\\(test\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), (1.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("00FF00"), (0.0, 1.0, 0.0));
        assert_eq!(parse_hex_color("bad"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_element_json_roundtrip() {
        let element = OverlayElement::Text {
            x: 12.5,
            y: 40.0,
            text: "Hi".to_string(),
            style: TextStyle {
                font_size: 18.0,
                color: "#336699".to_string(),
            },
        };
        let json = serde_json::to_string(&element).unwrap();
        let restored: OverlayElement = serde_json::from_str(&json).unwrap();
        assert_eq!(element, restored);
    }
}

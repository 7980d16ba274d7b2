//! Coordinate transformation between screen and PDF coordinate systems
//!
//! Overlay placement happens against a rendered page image: screen space has
//! its origin at the top-left and is scaled by `render_scale` pixels per PDF
//! point. PDF user space has its origin at the bottom-left in points, so the
//! Y axis must flip. A mapping is only meaningful for the page/scale pair it
//! was computed from; callers keep those together.

/// Fraction of the font size treated as ascent when anchoring text.
///
/// Placing text at the on-screen caret position means the glyph baseline must
/// land ascent-height below the caret top, and 0.8em is close enough for the
/// built-in fonts.
pub const TEXT_ASCENT_RATIO: f64 = 0.8;

/// Convert screen coordinates (top-left origin, pixels) to PDF coordinates
/// (bottom-left origin, points).
pub fn screen_to_pdf(
    screen_x: f64,
    screen_y: f64,
    render_scale: f64,
    page_height: f64,
) -> (f64, f64) {
    let pdf_x = screen_x / render_scale;
    let pdf_y = page_height - (screen_y / render_scale);
    (pdf_x, pdf_y)
}

/// Convert PDF coordinates back to screen coordinates.
pub fn pdf_to_screen(
    pdf_x: f64,
    pdf_y: f64,
    render_scale: f64,
    page_height: f64,
) -> (f64, f64) {
    let screen_x = pdf_x * render_scale;
    let screen_y = (page_height - pdf_y) * render_scale;
    (screen_x, screen_y)
}

/// Map a screen position to the PDF baseline anchor for a text run.
///
/// The screen point is where the top of the text appeared; the returned Y is
/// the baseline, one approximate ascent below it.
pub fn text_anchor(
    screen_x: f64,
    screen_y: f64,
    render_scale: f64,
    page_height: f64,
    font_size: f64,
) -> (f64, f64) {
    let (pdf_x, pdf_y) = screen_to_pdf(screen_x, screen_y, render_scale, page_height);
    (pdf_x, pdf_y - TEXT_ASCENT_RATIO * font_size)
}

/// Map a screen position to the PDF bottom-left anchor for an image.
///
/// The screen point is the image's top-left; image XObjects draw from their
/// bottom-left, so the anchor sits one displayed-height below. `pixel_height`
/// is the on-screen height in pixels.
pub fn image_anchor(
    screen_x: f64,
    screen_y: f64,
    render_scale: f64,
    page_height: f64,
    pixel_height: f64,
) -> (f64, f64) {
    let (pdf_x, pdf_y) = screen_to_pdf(screen_x, screen_y, render_scale, page_height);
    (pdf_x, pdf_y - pixel_height / render_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_to_pdf_flips_y() {
        // Letter page rendered at 1x: screen top maps to PDF top (y = 792)
        let (x, y) = screen_to_pdf(0.0, 0.0, 1.0, 792.0);
        assert_eq!(x, 0.0);
        assert_eq!(y, 792.0);

        // Screen bottom maps to PDF bottom (y = 0)
        let (_, y) = screen_to_pdf(0.0, 792.0, 1.0, 792.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_screen_to_pdf_divides_by_scale() {
        // Rendered at 1.5x, screen (300, 396) is PDF (200, 792 - 264)
        let (x, y) = screen_to_pdf(300.0, 396.0, 1.5, 792.0);
        assert!((x - 200.0).abs() < 0.001);
        assert!((y - 528.0).abs() < 0.001);
    }

    #[test]
    fn test_round_trip() {
        let (sx, sy) = pdf_to_screen(100.0, 200.0, 1.5, 792.0);
        let (px, py) = screen_to_pdf(sx, sy, 1.5, 792.0);
        assert!((px - 100.0).abs() < 0.001);
        assert!((py - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_text_anchor_drops_to_baseline() {
        // Caret at screen top, 12pt text: baseline lands 9.6pt below page top
        let (_, y) = text_anchor(0.0, 0.0, 1.0, 792.0, 12.0);
        assert!((y - (792.0 - 9.6)).abs() < 0.001);
    }

    #[test]
    fn test_image_anchor_accounts_for_height() {
        // 100px tall image at 2x covers 50pt; top at screen y=0 anchors at 792-50
        let (_, y) = image_anchor(0.0, 0.0, 2.0, 792.0, 100.0);
        assert!((y - 742.0).abs() < 0.001);
    }
}

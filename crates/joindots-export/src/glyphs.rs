//! A 5x7 bitmap font for raster labels.
//!
//! Each glyph is seven rows of five bits, most significant bit on the
//! left. Glyphs are drawn as filled squares of `scale` pixels, with one
//! blank column between characters.

use tiny_skia::{Paint, Pixmap, Rect, Transform};

/// Glyph cell width in font units.
pub const GLYPH_WIDTH: u32 = 5;
/// Glyph cell height in font units.
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character in font units.
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Bitmap rows for `ch`, or `None` when the font lacks it.
///
/// Covers digits, `a`-`z` (uppercase maps to lowercase), space, `.`
/// and `-`.
#[must_use]
pub const fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_lowercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'b' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E],
        'c' => [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'f' => [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'j' => [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0C],
        'k' => [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'p' => [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10],
        'q' => [0x00, 0x00, 0x0D, 0x13, 0x0F, 0x01, 0x01],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        'v' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'w' => [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A],
        'x' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        'y' => [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'z' => [0x00, 0x00, 0x1F, 0x02, 0x04, 0x08, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}

/// Pixel width of `text` drawn at `scale`, without trailing spacing.
#[must_use]
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    if chars == 0 {
        return 0;
    }
    chars
        .saturating_mul(ADVANCE)
        .saturating_sub(1)
        .saturating_mul(scale)
}

/// Pixel height of a line of text drawn at `scale`.
#[must_use]
pub const fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale
}

/// Draw `text` with its top-left corner at (`x`, `y`).
///
/// Characters the font lacks are left blank but still advance.
#[allow(clippy::cast_precision_loss)]
pub fn draw_text(pixmap: &mut Pixmap, text: &str, x: f32, y: f32, scale: u32, paint: &Paint) {
    let cell = scale as f32;
    let mut pen_x = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in (0u8..).zip(rows) {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let cx = (col as f32).mul_add(cell, pen_x);
                    let cy = f32::from(row).mul_add(cell, y);
                    if let Some(rect) = Rect::from_xywh(cx, cy, cell, cell) {
                        pixmap.fill_rect(rect, paint, Transform::identity(), None);
                    }
                }
            }
        }
        pen_x = (ADVANCE as f32).mul_add(cell, pen_x);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn font_covers_labels_and_footer() {
        for ch in "0123456789abcdefghijklmnopqrstuvwxyz.- ".chars() {
            assert!(glyph(ch).is_some(), "missing {ch:?}");
        }
        assert_eq!(glyph('A'), glyph('a'));
        assert_eq!(glyph('#'), None);
    }

    #[test]
    fn glyph_rows_fit_five_columns() {
        for ch in "0123456789abcdefghijklmnopqrstuvwxyz.-".chars() {
            let rows = glyph(ch).unwrap();
            assert!(rows.iter().all(|&r| r < 0x20), "{ch:?} is too wide");
            assert!(rows.iter().any(|&r| r != 0), "{ch:?} is blank");
        }
    }

    #[test]
    fn width_and_height_scale() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("7", 2), 10);
        assert_eq!(text_width("100", 2), 34);
        assert_eq!(text_height(2), 14);
    }

    #[test]
    fn draw_text_fills_only_glyph_cells() {
        let mut pixmap = Pixmap::new(12, 14).unwrap();
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        draw_text(&mut pixmap, "-", 0.0, 0.0, 2, &paint);

        // Row 3 of '-' is solid: y 6..8, x 0..10.
        let opaque: Vec<(u32, u32)> = (0..14)
            .flat_map(|y| (0..12).map(move |x| (x, y)))
            .filter(|&(x, y)| pixmap.pixel(x, y).unwrap().alpha() == 255)
            .collect();
        assert_eq!(opaque.len(), 20);
        assert!(opaque.iter().all(|&(x, y)| x < 10 && (6..8).contains(&y)));
    }
}

//! Raster page renderer (PNG).
//!
//! Draws onto a white A4 page using `tiny-skia` for anti-aliased paths,
//! then encodes the result with the `image` crate. Layers, bottom to
//! top: optional dashed guide lines, dots, sequence numbers, footer.

use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform,
};
use tracing::debug;

use joindots_pipeline::{DotPuzzle, Point};

use crate::ExportError;
use crate::glyphs;
use crate::layout::{LabelSize, PageLayout, label_anchor};

fn solid(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    paint
}

/// Render `puzzle` as a PNG page.
///
/// A puzzle with a single dot renders one labelled dot and no lines.
///
/// # Errors
///
/// Returns [`ExportError::Canvas`] if the page surface cannot be
/// allocated, or [`ExportError::PngEncode`] if encoding fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_png(
    puzzle: &DotPuzzle,
    layout: &PageLayout,
    show_guide_lines: bool,
) -> Result<Vec<u8>, ExportError> {
    let page = layout.page_px;
    let mut pixmap = Pixmap::new(page.width, page.height).ok_or(ExportError::Canvas)?;
    pixmap.fill(Color::WHITE);

    let dots = layout.place(puzzle);

    if show_guide_lines {
        draw_guides(&mut pixmap, &dots, layout);
    }

    let black = solid([0, 0, 0]);
    let radius = layout.dot_radius_px as f32;
    for dot in &dots {
        if let Some(circle) = PathBuilder::from_circle(dot.x as f32, dot.y as f32, radius) {
            pixmap.fill_path(
                &circle,
                &black,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    let scale = layout.label_glyph_scale;
    let bounds = layout.content_bounds_px();
    let height = f64::from(glyphs::text_height(scale));
    for (i, dot) in dots.iter().enumerate() {
        let label = (i + 1).to_string();
        let size = LabelSize {
            width: f64::from(glyphs::text_width(&label, scale)),
            height,
        };
        let at = label_anchor(
            *dot,
            dots.get(i + 1).copied(),
            size,
            layout.dot_radius_px,
            layout.label_gap_px,
            bounds,
        );
        glyphs::draw_text(
            &mut pixmap,
            &label,
            at.x.round() as f32,
            at.y.round() as f32,
            scale,
            &black,
        );
    }

    if !layout.footer_text.is_empty() {
        let scale = layout.footer_glyph_scale;
        let width = glyphs::text_width(&layout.footer_text, scale);
        let x = page.width.saturating_sub(width) / 2;
        let y = page
            .height
            .saturating_sub(layout.footer_offset_px)
            .saturating_sub(glyphs::text_height(scale));
        glyphs::draw_text(
            &mut pixmap,
            &layout.footer_text,
            x as f32,
            y as f32,
            scale,
            &solid(layout.footer_rgb),
        );
    }

    let png = encode_png(&pixmap)?;
    debug!(
        page = %page,
        dots = dots.len(),
        guide_lines = show_guide_lines,
        bytes = png.len(),
        "rendered raster page"
    );
    Ok(png)
}

/// Stroke a dashed polyline through consecutive dots.
#[allow(clippy::cast_possible_truncation)]
fn draw_guides(pixmap: &mut Pixmap, dots: &[Point], layout: &PageLayout) {
    let [first, rest @ ..] = dots else {
        return;
    };
    if rest.is_empty() {
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let [dash, gap] = layout.guide_dash_px;
    let stroke = Stroke {
        width: layout.guide_width_px as f32,
        dash: StrokeDash::new(vec![dash as f32, gap as f32], 0.0),
        ..Stroke::default()
    };
    pixmap.stroke_path(
        &path,
        &solid(layout.guide_rgb),
        &stroke,
        Transform::identity(),
        None,
    );
}

/// Encode an opaque pixmap as an 8-bit RGB PNG.
fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, ExportError> {
    // The page is painted white first, so every pixel is opaque and the
    // premultiplied channels are the straight ones.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            &rgb,
            pixmap.width(),
            pixmap.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ExportError::PngEncode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use joindots_pipeline::Dimensions;

    /// A small page keeps the tests fast.
    fn small_layout() -> PageLayout {
        PageLayout {
            page_px: Dimensions::new(200, 300),
            margin_px: 10,
            footer_text: String::new(),
            ..PageLayout::default()
        }
    }

    fn puzzle(dots: Vec<Point>) -> DotPuzzle {
        DotPuzzle {
            dots,
            canvas: Dimensions::new(180, 280),
            working: Dimensions::new(180, 280),
        }
    }

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory(png).unwrap().to_rgb8()
    }

    fn dark_pixels(img: &image::RgbImage) -> usize {
        img.pixels().filter(|p| p[0] < 128).count()
    }

    #[test]
    fn page_has_fixed_dimensions() {
        let png = to_png(&puzzle(vec![]), &PageLayout::default(), false).unwrap();
        let img = decode(&png);
        assert_eq!(img.dimensions(), (2480, 3508));
    }

    #[test]
    fn dot_centre_is_black() {
        let png = to_png(&puzzle(vec![Point::new(90.0, 140.0)]), &small_layout(), false).unwrap();
        let img = decode(&png);
        // Canvas fills the content area exactly, so the offset is the margin.
        assert_eq!(img.get_pixel(100, 150).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn single_dot_draws_no_guides() {
        let layout = small_layout();
        let one = puzzle(vec![Point::new(90.0, 140.0)]);
        let with = decode(&to_png(&one, &layout, true).unwrap());
        let without = decode(&to_png(&one, &layout, false).unwrap());
        assert_eq!(with, without);
    }

    #[test]
    fn guide_lines_are_faint_and_optional() {
        let layout = small_layout();
        let two = puzzle(vec![Point::new(20.0, 140.0), Point::new(160.0, 140.0)]);
        let with = decode(&to_png(&two, &layout, true).unwrap());
        let without = decode(&to_png(&two, &layout, false).unwrap());
        assert_ne!(with, without);

        // Between the dots the line is light grey, never black, and
        // broken by gaps. Take the darkest value per column around the
        // line's row.
        let column_min: Vec<u8> = (40..160)
            .map(|x| (146..155).map(|y| with.get_pixel(x, y)[0]).min().unwrap())
            .collect();
        assert!(column_min.iter().all(|&v| v > 128), "guide is too dark");
        assert!(column_min.iter().any(|&v| v < 255), "no guide drawn");
        assert!(column_min.iter().any(|&v| v == 255), "guide is not dashed");
    }

    #[test]
    fn labels_add_ink_next_to_dots() {
        let layout = small_layout();
        let one = puzzle(vec![Point::new(90.0, 140.0)]);
        let img = decode(&to_png(&one, &layout, false).unwrap());

        // "1" sits up and to the right of the dot.
        let label_ink = (112..122)
            .flat_map(|x| (128..142).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y)[0] < 128)
            .count();
        assert!(label_ink > 0);
    }

    #[test]
    fn footer_is_drawn_near_the_bottom() {
        let layout = PageLayout {
            footer_text: PageLayout::DEFAULT_FOOTER_TEXT.to_owned(),
            ..small_layout()
        };
        let img = decode(&to_png(&puzzle(vec![]), &layout, false).unwrap());
        let footer_rows = 300 - 40 - 21..300 - 40;
        let grey = footer_rows
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0 == [0xcc, 0xcc, 0xcc])
            .count();
        assert!(grey > 0);
        assert_eq!(dark_pixels(&img), 0);
    }
}

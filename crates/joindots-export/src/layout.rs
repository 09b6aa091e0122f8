//! Print-page geometry and label placement.
//!
//! Both renderers work from the same [`PageLayout`]: an A4 page with a
//! uniform margin, the puzzle canvas centred in the remaining content
//! area. Dot positions are first mapped to page pixels (the raster
//! space); the paged renderer then maps page pixels to points through a
//! single uniform scale.
//!
//! Label placement is a pure function of the dot, its successor, and
//! the label box size, shared by both renderers.

use serde::{Deserialize, Serialize};

use joindots_pipeline::{Dimensions, DotPuzzle, Point};

/// Page geometry and drawing style for both outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageLayout {
    /// Raster page size in pixels.
    pub page_px: Dimensions,
    /// Margin reserved on every side of the raster page, in pixels.
    pub margin_px: u32,
    /// Raster dot radius in pixels.
    pub dot_radius_px: f64,
    /// Pixel size of one bitmap-font cell for dot labels.
    pub label_glyph_scale: u32,
    /// Gap between a dot's edge and its label, in pixels.
    pub label_gap_px: f64,
    /// Raster guide line width in pixels.
    pub guide_width_px: f64,
    /// Raster guide line colour.
    pub guide_rgb: [u8; 3],
    /// Raster guide line dash and gap lengths, in pixels.
    pub guide_dash_px: [f64; 2],

    /// Paged document width in points.
    pub page_width_pt: f64,
    /// Paged document height in points.
    pub page_height_pt: f64,
    /// Margin reserved on every side of the paged document, in points.
    pub margin_pt: f64,
    /// Paged dot radius in points.
    pub dot_radius_pt: f64,
    /// Label font size in points (Helvetica-Bold).
    pub label_font_pt: f64,
    /// Gap between a dot's edge and its label, in points.
    pub label_gap_pt: f64,
    /// Paged guide line width in points.
    pub guide_width_pt: f64,
    /// Paged guide line grey level (0 black, 1 white).
    pub guide_gray: f64,
    /// Paged guide line dash and gap lengths, in points.
    pub guide_dash_pt: [f64; 2],

    /// Small branding mark printed at the bottom of both outputs.
    /// Empty disables the footer.
    pub footer_text: String,
    /// Pixel size of one bitmap-font cell for the raster footer.
    pub footer_glyph_scale: u32,
    /// Raster footer colour.
    pub footer_rgb: [u8; 3],
    /// Distance from the raster page bottom to the footer baseline.
    pub footer_offset_px: u32,
    /// Paged footer font size in points.
    pub footer_font_pt: f64,
    /// Paged footer grey level.
    pub footer_gray: f64,
    /// Distance from the paged bottom edge to the footer baseline.
    pub footer_baseline_pt: f64,
}

impl PageLayout {
    /// A4 at 300 DPI.
    pub const DEFAULT_PAGE_PX: Dimensions = Dimensions::new(2480, 3508);
    /// 1 cm at 300 DPI.
    pub const DEFAULT_MARGIN_PX: u32 = 118;
    /// Default raster dot radius in pixels.
    pub const DEFAULT_DOT_RADIUS_PX: f64 = 8.0;
    /// Label cell size: 14 px tall glyphs.
    pub const DEFAULT_LABEL_GLYPH_SCALE: u32 = 2;
    /// Default dot-to-label gap in pixels.
    pub const DEFAULT_LABEL_GAP_PX: f64 = 4.0;

    /// A4 width in points.
    pub const DEFAULT_PAGE_WIDTH_PT: f64 = 595.28;
    /// A4 height in points.
    pub const DEFAULT_PAGE_HEIGHT_PT: f64 = 841.89;
    /// 1 cm in points.
    pub const DEFAULT_MARGIN_PT: f64 = 28.35;
    /// Default paged dot radius in points.
    pub const DEFAULT_DOT_RADIUS_PT: f64 = 3.0;
    /// Default label font size in points.
    pub const DEFAULT_LABEL_FONT_PT: f64 = 7.0;
    /// Default dot-to-label gap in points.
    pub const DEFAULT_LABEL_GAP_PT: f64 = 2.0;

    /// Default footer branding mark.
    pub const DEFAULT_FOOTER_TEXT: &'static str = "colour.page";

    /// Printable area of the raster page: the page minus its margins.
    #[must_use]
    pub const fn content_px(&self) -> Dimensions {
        Dimensions::new(
            self.page_px.width.saturating_sub(2 * self.margin_px),
            self.page_px.height.saturating_sub(2 * self.margin_px),
        )
    }

    /// Bounds of the raster content area in page pixels.
    #[must_use]
    pub fn content_bounds_px(&self) -> Bounds {
        let margin = f64::from(self.margin_px);
        Bounds {
            min_x: margin,
            min_y: margin,
            max_x: f64::from(self.page_px.width) - margin,
            max_y: f64::from(self.page_px.height) - margin,
        }
    }

    /// Points per raster pixel.
    ///
    /// The smaller of the horizontal and vertical ratios between the two
    /// content areas, so the artwork never overflows either margin.
    #[must_use]
    pub fn points_per_pixel(&self) -> f64 {
        let content = self.content_px();
        if content.width == 0 || content.height == 0 {
            return 0.0;
        }
        let sx = 2.0f64.mul_add(-self.margin_pt, self.page_width_pt) / f64::from(content.width);
        let sy = 2.0f64.mul_add(-self.margin_pt, self.page_height_pt) / f64::from(content.height);
        sx.min(sy)
    }

    /// Convert a page-pixel point to points measured from the top-left
    /// corner of the paged document (y grows downwards).
    #[must_use]
    pub fn px_to_pt(&self, p: Point) -> Point {
        let scale = self.points_per_pixel();
        let margin = f64::from(self.margin_px);
        Point::new(
            (p.x - margin).mul_add(scale, self.margin_pt),
            (p.y - margin).mul_add(scale, self.margin_pt),
        )
    }

    /// Bounds of the paged content area in top-down points.
    #[must_use]
    pub fn content_bounds_pt(&self) -> Bounds {
        Bounds {
            min_x: self.margin_pt,
            min_y: self.margin_pt,
            max_x: self.page_width_pt - self.margin_pt,
            max_y: self.page_height_pt - self.margin_pt,
        }
    }

    /// Map every dot of `puzzle` to page pixels, centring the canvas in
    /// the content area.
    #[must_use = "returns the placed dots"]
    pub fn place(&self, puzzle: &DotPuzzle) -> Vec<Point> {
        let content = self.content_px();
        let margin = f64::from(self.margin_px);
        let offset_x =
            margin + (f64::from(content.width) - f64::from(puzzle.canvas.width)).max(0.0) / 2.0;
        let offset_y =
            margin + (f64::from(content.height) - f64::from(puzzle.canvas.height)).max(0.0) / 2.0;
        puzzle
            .dots
            .iter()
            .map(|d| Point::new(d.x + offset_x, d.y + offset_y))
            .collect()
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_px: Self::DEFAULT_PAGE_PX,
            margin_px: Self::DEFAULT_MARGIN_PX,
            dot_radius_px: Self::DEFAULT_DOT_RADIUS_PX,
            label_glyph_scale: Self::DEFAULT_LABEL_GLYPH_SCALE,
            label_gap_px: Self::DEFAULT_LABEL_GAP_PX,
            guide_width_px: 1.0,
            guide_rgb: [0xe0, 0xe0, 0xe0],
            guide_dash_px: [8.0, 6.0],
            page_width_pt: Self::DEFAULT_PAGE_WIDTH_PT,
            page_height_pt: Self::DEFAULT_PAGE_HEIGHT_PT,
            margin_pt: Self::DEFAULT_MARGIN_PT,
            dot_radius_pt: Self::DEFAULT_DOT_RADIUS_PT,
            label_font_pt: Self::DEFAULT_LABEL_FONT_PT,
            label_gap_pt: Self::DEFAULT_LABEL_GAP_PT,
            guide_width_pt: 0.3,
            guide_gray: 0.88,
            guide_dash_pt: [2.0, 1.5],
            footer_text: Self::DEFAULT_FOOTER_TEXT.to_owned(),
            footer_glyph_scale: 3,
            footer_rgb: [0xcc, 0xcc, 0xcc],
            footer_offset_px: 40,
            footer_font_pt: 8.0,
            footer_gray: 0.75,
            footer_baseline_pt: 12.0,
        }
    }
}

/// Axis-aligned rectangle in a y-down coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge.
    pub min_x: f64,
    /// Top edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub max_y: f64,
}

/// Size of a rendered label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelSize {
    /// Horizontal extent of the label text.
    pub width: f64,
    /// Vertical extent of the label text.
    pub height: f64,
}

/// Top-left corner of the label box for `dot`, in the same y-down units
/// as its arguments.
///
/// Without a successor the label sits up and to the right of the dot.
/// Otherwise it goes on the side facing away from `next`: left or right
/// (vertically centred) when the horizontal offset dominates, above or
/// below (horizontally centred) when the vertical offset does. Ties go
/// horizontal. The box is finally pushed inside `bounds`; a box larger
/// than the bounds is pinned to their top-left corner.
#[must_use]
pub fn label_anchor(
    dot: Point,
    next: Option<Point>,
    size: LabelSize,
    dot_radius: f64,
    gap: f64,
    bounds: Bounds,
) -> Point {
    let reach = dot_radius + gap;
    let (x, y) = match next {
        None => (dot.x + reach, dot.y - dot_radius - size.height),
        Some(next) => {
            let dx = next.x - dot.x;
            let dy = next.y - dot.y;
            if dx.abs() >= dy.abs() {
                let x = if dx > 0.0 {
                    dot.x - reach - size.width
                } else {
                    dot.x + reach
                };
                (x, dot.y - size.height / 2.0)
            } else {
                let y = if dy > 0.0 {
                    dot.y - reach - size.height
                } else {
                    dot.y + reach
                };
                (dot.x - size.width / 2.0, y)
            }
        }
    };

    Point::new(
        x.min(bounds.max_x - size.width).max(bounds.min_x),
        y.min(bounds.max_y - size.height).max(bounds.min_y),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SIZE: LabelSize = LabelSize {
        width: 20.0,
        height: 10.0,
    };

    const WIDE: Bounds = Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 1000.0,
        max_y: 1000.0,
    };

    fn anchor(next: Option<Point>) -> Point {
        label_anchor(Point::new(500.0, 500.0), next, SIZE, 8.0, 4.0, WIDE)
    }

    #[test]
    fn default_content_area_matches_pipeline_fit_area() {
        let layout = PageLayout::default();
        assert_eq!(layout.content_px(), Dimensions::new(2244, 3272));
        assert_eq!(
            layout.content_px(),
            joindots_pipeline::PipelineConfig::DEFAULT_FIT_AREA
        );
    }

    #[test]
    fn points_scale_maps_content_into_page_margins() {
        let layout = PageLayout::default();
        let scale = layout.points_per_pixel();
        assert!((scale - 0.24).abs() < 1e-3, "scale {scale}");

        let bottom_right = layout.px_to_pt(Point::new(2362.0, 3390.0));
        let bounds = layout.content_bounds_pt();
        assert!(bottom_right.x <= bounds.max_x + 1e-9);
        assert!(bottom_right.y <= bounds.max_y + 1e-9);

        let top_left = layout.px_to_pt(Point::new(118.0, 118.0));
        assert_eq!(top_left, Point::new(28.35, 28.35));
    }

    #[test]
    fn narrow_canvas_is_centred_horizontally() {
        let layout = PageLayout::default();
        let puzzle = DotPuzzle {
            dots: vec![Point::new(0.0, 0.0), Point::new(1043.0, 3271.0)],
            canvas: Dimensions::new(1044, 3272),
            working: Dimensions::new(255, 800),
        };
        let placed = layout.place(&puzzle);
        assert_eq!(placed[0], Point::new(118.0 + 600.0, 118.0));
        assert_eq!(placed[1], Point::new(118.0 + 600.0 + 1043.0, 118.0 + 3271.0));
    }

    #[test]
    fn lone_dot_label_goes_up_and_right() {
        assert_eq!(anchor(None), Point::new(512.0, 482.0));
    }

    #[test]
    fn label_avoids_next_dot_to_the_right() {
        let p = anchor(Some(Point::new(600.0, 520.0)));
        assert_eq!(p, Point::new(468.0, 495.0));
        assert!(p.x + SIZE.width <= 500.0);
    }

    #[test]
    fn label_avoids_next_dot_to_the_left() {
        let p = anchor(Some(Point::new(400.0, 450.0)));
        assert_eq!(p, Point::new(512.0, 495.0));
    }

    #[test]
    fn label_avoids_next_dot_below() {
        let p = anchor(Some(Point::new(510.0, 700.0)));
        assert_eq!(p, Point::new(490.0, 478.0));
        assert!(p.y + SIZE.height <= 500.0);
    }

    #[test]
    fn label_avoids_next_dot_above() {
        let p = anchor(Some(Point::new(490.0, 300.0)));
        assert_eq!(p, Point::new(490.0, 512.0));
    }

    #[test]
    fn label_is_clamped_inside_bounds() {
        let bounds = Bounds {
            min_x: 100.0,
            min_y: 100.0,
            max_x: 200.0,
            max_y: 200.0,
        };
        // Up-right of a dot in the top-right corner would leave the box.
        let p = label_anchor(Point::new(195.0, 102.0), None, SIZE, 8.0, 4.0, bounds);
        assert_eq!(p, Point::new(180.0, 100.0));

        // Left of a dot hugging the left margin.
        let p = label_anchor(
            Point::new(101.0, 150.0),
            Some(Point::new(150.0, 150.0)),
            SIZE,
            8.0,
            4.0,
            bounds,
        );
        assert_eq!(p.x, 100.0);
    }

    #[test]
    fn oversized_label_pins_to_top_left() {
        let bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10.0,
            max_y: 5.0,
        };
        let p = label_anchor(Point::new(5.0, 2.0), None, SIZE, 1.0, 1.0, bounds);
        assert_eq!(p, Point::new(0.0, 0.0));
    }

    #[test]
    fn layout_round_trips_through_json() {
        let layout = PageLayout::default();
        let json = serde_json::to_string(&layout).unwrap();
        let back: PageLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);

        let partial: PageLayout = serde_json::from_str(r#"{"footer_text":""}"#).unwrap();
        assert_eq!(partial.footer_text, "");
    }

    #[test]
    fn layout_rejects_keys_that_change_nothing() {
        let json = serde_json::to_string(&PageLayout::default()).unwrap();
        assert!(!json.contains("dpi"));
        assert!(serde_json::from_str::<PageLayout>(r#"{"dpi":150}"#).is_err());
    }

    #[test]
    fn default_page_is_a4_at_300_dpi() {
        let px_per_mm: f64 = 300.0 / 25.4;
        let layout = PageLayout::default();
        assert!((f64::from(layout.page_px.width) - (210.0 * px_per_mm).round()).abs() < 1e-9);
        assert!((f64::from(layout.page_px.height) - (297.0 * px_per_mm).round()).abs() < 1e-9);
    }
}

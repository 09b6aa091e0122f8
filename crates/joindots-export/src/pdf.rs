//! Paged document renderer (PDF).
//!
//! Builds a single-page A4 PDF with `lopdf`. Geometry matches the raster
//! page: dot positions are placed in page pixels, then mapped to points
//! with [`PageLayout::px_to_pt`]. Labels use the standard Helvetica-Bold
//! font so nothing is embedded, and are positioned with measured widths
//! from [`font`](crate::font).
//!
//! PDF user space has y growing upwards; everything here is computed
//! top-down and flipped when operators are emitted.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::debug;

use joindots_pipeline::{DotPuzzle, Point};

use crate::ExportError;
use crate::font;
use crate::layout::{LabelSize, PageLayout, label_anchor};

/// Control-point distance for a quarter circle drawn as a cubic Bézier,
/// as a fraction of the radius.
const KAPPA: f64 = 0.5523;

/// Resource name of the label font.
const FONT_NAME: &str = "F1";

#[allow(clippy::cast_possible_truncation)]
fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Emits operators in top-down coordinates.
struct Painter {
    page_height: f64,
    ops: Vec<Operation>,
}

impl Painter {
    const fn new(page_height: f64) -> Self {
        Self {
            page_height,
            ops: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn xy(&self, p: Point) -> [Object; 2] {
        [real(p.x), real(self.page_height - p.y)]
    }

    fn move_to(&mut self, p: Point) {
        let operands = self.xy(p).into();
        self.op("m", operands);
    }

    fn line_to(&mut self, p: Point) {
        let operands = self.xy(p).into();
        self.op("l", operands);
    }

    fn curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        let operands = [self.xy(c1), self.xy(c2), self.xy(end)].concat();
        self.op("c", operands);
    }

    /// Append a closed circle path made of four Bézier quarters.
    fn circle(&mut self, c: Point, r: f64) {
        let k = KAPPA * r;
        self.move_to(Point::new(c.x + r, c.y));
        self.curve_to(
            Point::new(c.x + r, c.y + k),
            Point::new(c.x + k, c.y + r),
            Point::new(c.x, c.y + r),
        );
        self.curve_to(
            Point::new(c.x - k, c.y + r),
            Point::new(c.x - r, c.y + k),
            Point::new(c.x - r, c.y),
        );
        self.curve_to(
            Point::new(c.x - r, c.y - k),
            Point::new(c.x - k, c.y - r),
            Point::new(c.x, c.y - r),
        );
        self.curve_to(
            Point::new(c.x + k, c.y - r),
            Point::new(c.x + r, c.y - k),
            Point::new(c.x + r, c.y),
        );
        self.op("h", vec![]);
    }

    /// Show `text` with its baseline starting at `baseline`.
    fn text(&mut self, text: &str, size: f64, baseline: Point) {
        self.op("BT", vec![]);
        self.op("Tf", vec![FONT_NAME.into(), real(size)]);
        let operands = self.xy(baseline).into();
        self.op("Td", operands);
        self.op("Tj", vec![Object::string_literal(text)]);
        self.op("ET", vec![]);
    }

    fn gray_fill(&mut self, level: f64) {
        self.op("rg", vec![real(level), real(level), real(level)]);
    }

    fn gray_stroke(&mut self, level: f64) {
        self.op("RG", vec![real(level), real(level), real(level)]);
    }
}

/// Render `puzzle` as a single-page PDF.
///
/// A puzzle with a single dot renders one labelled dot and no lines.
///
/// # Errors
///
/// Returns [`ExportError::Pdf`] if the content stream cannot be encoded
/// or the document cannot be serialized.
pub fn to_pdf(
    puzzle: &DotPuzzle,
    layout: &PageLayout,
    show_guide_lines: bool,
) -> Result<Vec<u8>, ExportError> {
    let dots: Vec<Point> = layout
        .place(puzzle)
        .into_iter()
        .map(|p| layout.px_to_pt(p))
        .collect();

    let mut painter = Painter::new(layout.page_height_pt);

    if show_guide_lines && dots.len() >= 2 {
        let [dash, gap] = layout.guide_dash_pt;
        painter.op("q", vec![]);
        painter.gray_stroke(layout.guide_gray);
        painter.op("w", vec![real(layout.guide_width_pt)]);
        painter.op(
            "d",
            vec![Object::Array(vec![real(dash), real(gap)]), 0.into()],
        );
        painter.move_to(dots[0]);
        for &p in &dots[1..] {
            painter.line_to(p);
        }
        painter.op("S", vec![]);
        painter.op("Q", vec![]);
    }

    painter.gray_fill(0.0);
    for &dot in &dots {
        painter.circle(dot, layout.dot_radius_pt);
    }
    if !dots.is_empty() {
        painter.op("f", vec![]);
    }

    let size = layout.label_font_pt;
    let bounds = layout.content_bounds_pt();
    let height = font::cap_height(size);
    for (i, &dot) in dots.iter().enumerate() {
        let label = (i + 1).to_string();
        let label_size = LabelSize {
            width: font::text_width(&label, size),
            height,
        };
        let top_left = label_anchor(
            dot,
            dots.get(i + 1).copied(),
            label_size,
            layout.dot_radius_pt,
            layout.label_gap_pt,
            bounds,
        );
        painter.text(&label, size, Point::new(top_left.x, top_left.y + height));
    }

    if !layout.footer_text.is_empty() {
        let size = layout.footer_font_pt;
        let width = font::text_width(&layout.footer_text, size);
        painter.gray_fill(layout.footer_gray);
        painter.text(
            &layout.footer_text,
            size,
            Point::new(
                (layout.page_width_pt - width) / 2.0,
                layout.page_height_pt - layout.footer_baseline_pt,
            ),
        );
    }

    let op_count = painter.ops.len();
    let bytes = assemble(painter.ops, layout)?;
    debug!(
        dots = dots.len(),
        operations = op_count,
        guide_lines = show_guide_lines,
        bytes = bytes.len(),
        "rendered paged document"
    );
    Ok(bytes)
}

/// Wrap content operations in a one-page document and serialize it.
fn assemble(operations: Vec<Operation>, layout: &PageLayout) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font::BASE_FONT,
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_NAME => font_id },
    });

    let content = Content { operations }
        .encode()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            real(layout.page_width_pt),
            real(layout.page_height_pt),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal("joindots"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(buf)
}

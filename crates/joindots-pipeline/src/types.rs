//! Shared types for the joindots conversion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A binary mask: every pixel is either foreground (255) or
/// background (0).
pub type BinaryMask = GrayImage;

/// Mask value for foreground pixels.
pub const FOREGROUND: u8 = 255;

/// Mask value for background pixels.
pub const BACKGROUND: u8 = 0;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation towards `other` by fraction `t`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            (other.x - self.x).mul_add(t, self.x),
            (other.y - self.y).mul_add(t, self.y),
        )
    }
}

/// A sequence of connected points.
///
/// Traced boundaries are stored as polylines whose closing edge (last
/// point back to the first) is implicit; see [`Polyline::perimeter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Open path length: sum of consecutive segment lengths.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Closed path length: [`length`](Self::length) plus the closing
    /// edge from the last point back to the first.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        match (self.0.first(), self.0.last()) {
            (Some(&first), Some(&last)) => self.length() + last.distance(first),
            _ => 0.0,
        }
    }

    /// Returns the polyline with its first point appended, making the
    /// implicit closing edge explicit.
    ///
    /// Polylines that are empty or already end where they start are
    /// returned unchanged.
    #[must_use]
    pub fn closed(&self) -> Self {
        let mut points = self.0.clone();
        let ends = (points.first().copied(), points.last().copied());
        if let (Some(first), Some(last)) = ends
            && first != last
        {
            points.push(first);
        }
        Self(points)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the canvas diagonal in pixels.
    #[must_use]
    pub fn diagonal(self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How aggressively traced outlines are simplified before dots are
/// placed on them.
///
/// Easier puzzles have fewer, larger corners; harder puzzles keep
/// finer detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Aggressive simplification: epsilon is 2% of the canvas diagonal.
    Easy,
    /// Epsilon is 1% of the canvas diagonal.
    #[default]
    Medium,
    /// Fine detail preserved: epsilon is 0.5% of the canvas diagonal.
    Hard,
}

impl Difficulty {
    /// Simplification tolerance as a fraction of the canvas diagonal.
    #[must_use]
    pub const fn epsilon_fraction(self) -> f64 {
        match self {
            Self::Easy => 0.02,
            Self::Medium => 0.01,
            Self::Hard => 0.005,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => f.write_str("easy"),
            Self::Medium => f.write_str("medium"),
            Self::Hard => f.write_str("hard"),
        }
    }
}

/// Per-job settings supplied by whoever submits the photo.
///
/// Field names serialize in camelCase (`dotCount`, `showGuideLines`)
/// to match the job record stored by the orchestrating service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSettings {
    /// Target number of dots. At most this many are placed.
    pub dot_count: u32,
    /// Simplification aggressiveness.
    pub difficulty: Difficulty,
    /// Whether faint lines are drawn between consecutive dots.
    pub show_guide_lines: bool,
}

impl JobSettings {
    /// Smallest accepted [`dot_count`](Self::dot_count).
    pub const MIN_DOT_COUNT: u32 = 2;

    /// Default [`dot_count`](Self::dot_count).
    pub const DEFAULT_DOT_COUNT: u32 = 100;

    /// Dot counts offered to users, from young children to experts.
    pub const DOT_COUNT_PRESETS: [u32; 4] = [50, 100, 150, 200];

    /// Check that the settings can drive the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if `dot_count` is
    /// below [`MIN_DOT_COUNT`](Self::MIN_DOT_COUNT).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.dot_count < Self::MIN_DOT_COUNT {
            return Err(PipelineError::InvalidSettings(format!(
                "dot count must be at least {}, got {}",
                Self::MIN_DOT_COUNT,
                self.dot_count,
            )));
        }
        Ok(())
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            dot_count: Self::DEFAULT_DOT_COUNT,
            difficulty: Difficulty::default(),
            show_guide_lines: false,
        }
    }
}

/// Tuning parameters for the conversion pipeline.
///
/// Unlike [`JobSettings`], these are not chosen per job; they fix the
/// cost bounds and noise thresholds of each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Printable content area (pixels) the artwork is scaled to fit.
    /// Dots are reported in this fit space.
    pub fit_area: Dimensions,

    /// Longest side of the working image in pixels. Larger inputs are
    /// downsampled to this before any per-pixel work.
    pub working_resolution: u32,

    /// Median filter radius (1 = 3x3 window). 0 disables denoising.
    pub median_radius: u32,

    /// Whether to stretch the luminance range to 0..=255 before
    /// denoising.
    pub stretch_contrast: bool,

    /// Half-width of the square neighborhood used for the local mean.
    pub threshold_radius: u32,

    /// A pixel is foreground when darker than its local mean minus
    /// this bias.
    pub threshold_bias: f64,

    /// Radius of the square structuring element for closing.
    /// 0 disables closing.
    pub close_radius: u8,

    /// Boundary tracing algorithm.
    pub contour_tracer: ContourTracerKind,

    /// Traced contours with fewer points are discarded as noise.
    pub min_contour_points: usize,

    /// Traced contours with more points are uniformly subsampled down
    /// to this many.
    pub max_contour_points: usize,

    /// Contours with a smaller perimeter (working pixels) are discarded.
    pub min_perimeter: f64,

    /// Maximum number of contours kept by the selector.
    pub max_contours: usize,

    /// The selector stops once the kept perimeter exceeds this fraction
    /// of the total candidate perimeter.
    pub perimeter_coverage: f64,

    /// Smallest dot allocation given to any contour that receives dots.
    pub min_dots_per_contour: u32,
}

impl PipelineConfig {
    /// Default fit area: an A4 page at 300 DPI less 118 px margins.
    pub const DEFAULT_FIT_AREA: Dimensions = Dimensions::new(2244, 3272);
    /// Default working resolution (longest side, pixels).
    pub const DEFAULT_WORKING_RESOLUTION: u32 = 800;
    /// Default median filter radius.
    pub const DEFAULT_MEDIAN_RADIUS: u32 = 1;
    /// Default local-mean neighborhood radius.
    pub const DEFAULT_THRESHOLD_RADIUS: u32 = 7;
    /// Default threshold bias constant.
    pub const DEFAULT_THRESHOLD_BIAS: f64 = 10.0;
    /// Default closing radius.
    pub const DEFAULT_CLOSE_RADIUS: u8 = 1;
    /// Default minimum traced contour length (points).
    pub const DEFAULT_MIN_CONTOUR_POINTS: usize = 12;
    /// Default maximum traced contour length (points).
    pub const DEFAULT_MAX_CONTOUR_POINTS: usize = 4000;
    /// Default minimum contour perimeter (pixels).
    pub const DEFAULT_MIN_PERIMETER: f64 = 24.0;
    /// Default maximum number of kept contours.
    pub const DEFAULT_MAX_CONTOURS: usize = 30;
    /// Default perimeter coverage fraction.
    pub const DEFAULT_PERIMETER_COVERAGE: f64 = 0.85;
    /// Default minimum dots per sampled contour.
    pub const DEFAULT_MIN_DOTS_PER_CONTOUR: u32 = 3;
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fit_area: Self::DEFAULT_FIT_AREA,
            working_resolution: Self::DEFAULT_WORKING_RESOLUTION,
            median_radius: Self::DEFAULT_MEDIAN_RADIUS,
            stretch_contrast: true,
            threshold_radius: Self::DEFAULT_THRESHOLD_RADIUS,
            threshold_bias: Self::DEFAULT_THRESHOLD_BIAS,
            close_radius: Self::DEFAULT_CLOSE_RADIUS,
            contour_tracer: ContourTracerKind::default(),
            min_contour_points: Self::DEFAULT_MIN_CONTOUR_POINTS,
            max_contour_points: Self::DEFAULT_MAX_CONTOUR_POINTS,
            min_perimeter: Self::DEFAULT_MIN_PERIMETER,
            max_contours: Self::DEFAULT_MAX_CONTOURS,
            perimeter_coverage: Self::DEFAULT_PERIMETER_COVERAGE,
            min_dots_per_contour: Self::DEFAULT_MIN_DOTS_PER_CONTOUR,
        }
    }
}

/// The pipeline's terminal artifact: numbered dots ready for rendering.
///
/// Dot `i` in [`dots`](Self::dots) carries the label `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotPuzzle {
    /// Ordered dots in fit-resolution pixel coordinates (whole pixels).
    pub dots: Vec<Point>,

    /// Size of the artwork at fit resolution: the source image scaled to
    /// fit the printable content area. Dots lie within this canvas.
    pub canvas: Dimensions,

    /// Size of the working-resolution image the dots were derived from.
    pub working: Dimensions,
}

impl DotPuzzle {
    /// Number of dots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.dots.len()
    }

    /// Returns `true` if the puzzle has no dots.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    /// Dots paired with their 1-based sequence numbers.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        self.dots.iter().enumerate().map(|(i, &p)| (i + 1, p))
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize` because `image::ImageError` does not
/// implement serde traits. Every variant is serialized as its
/// `Display` string under a variant tag.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image decoded but its dimensions cannot be processed.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The job settings are out of range.
    #[error("invalid job settings: {0}")]
    InvalidSettings(String),
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidImage(String),
    InvalidSettings(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidImage(s) => PipelineErrorProxy::InvalidImage(s.clone()),
            Self::InvalidSettings(s) => PipelineErrorProxy::InvalidSettings(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

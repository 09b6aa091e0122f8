//! joindots-pipeline: photo to numbered-dot conversion core (sans-IO).
//!
//! Converts a raster photo into an ordered list of dots that outline its
//! dominant shapes:
//! preprocess -> adaptive threshold -> morphological closing ->
//! Moore boundary tracing -> contour selection -> RDP simplification ->
//! arc-length dot sampling.
//!
//! This crate has **no I/O dependencies**: it takes encoded image bytes
//! and returns a [`DotPuzzle`]. Page rendering lives in
//! `joindots-export`.

pub mod contour;
pub mod diagnostics;
pub mod grid;
pub mod morphology;
pub mod pipeline;
pub mod preprocess;
pub mod progress;
pub mod sample;
pub mod select;
pub mod simplify;
pub mod threshold;
pub mod types;

pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use pipeline::Pipeline;
pub use progress::{NoProgress, ProgressSink, milestone};
pub use types::{
    Difficulty, Dimensions, DotPuzzle, JobSettings, PipelineConfig, PipelineError, Point, Polyline,
};

use progress::Monotonic;
use tracing::{info, instrument};

/// Run the full conversion pipeline.
///
/// Takes encoded image bytes (PNG, JPEG, BMP, WebP), the job settings,
/// and tuning parameters, and produces the numbered dots in fit-space
/// pixels. Progress milestones 10 through 65 are reported to `progress`.
///
/// Blank or featureless images are not an error: a border rectangle
/// stands in for the missing contours, so at least one dot is always
/// returned.
///
/// # Pipeline steps
///
/// 1. Decode, downsample to the working resolution, stretch contrast,
///    median filter
/// 2. Adaptive local-mean threshold
/// 3. Morphological closing
/// 4. Moore boundary tracing, dropping short contours
/// 5. Keep the longest contours covering most of the total perimeter
/// 6. RDP simplification with a difficulty-driven tolerance
/// 7. Share the dot budget by perimeter and sample by arc length
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if `settings` fail
/// validation, [`PipelineError::EmptyInput`] if `image_bytes` is empty,
/// [`PipelineError::ImageDecode`] if the image format is unrecognized,
/// and [`PipelineError::InvalidImage`] if the decoded image has no
/// pixels.
#[instrument(
    skip_all,
    fields(
        input_bytes = image_bytes.len(),
        dot_count = settings.dot_count,
        difficulty = %settings.difficulty,
    )
)]
pub fn process(
    image_bytes: &[u8],
    settings: &JobSettings,
    config: &PipelineConfig,
    progress: &mut dyn ProgressSink,
) -> Result<DotPuzzle, PipelineError> {
    let mut progress = Monotonic::new(progress);
    progress.report(milestone::STARTED);

    let prepared = Pipeline::new(image_bytes.to_vec(), *settings, config.clone()).preprocess()?;
    progress.report(milestone::PREPROCESSED);
    let thresholded = prepared.threshold();
    progress.report(milestone::THRESHOLDED);
    let closed = thresholded.close();
    progress.report(milestone::CLOSED);
    let traced = closed.trace();
    progress.report(milestone::TRACED);
    let selected = traced.select();
    progress.report(milestone::SELECTED);
    let simplified = selected.simplify();
    progress.report(milestone::SIMPLIFIED);
    let sampled = simplified.sample();
    progress.report(milestone::SAMPLED);

    let puzzle = sampled.into_puzzle();
    info!(dots = puzzle.len(), canvas = %puzzle.canvas, "dot puzzle ready");
    Ok(puzzle)
}

//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire conversion in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use joindots_pipeline::{JobSettings, Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let sampled = Pipeline::new(png, JobSettings::default(), PipelineConfig::default())
//!     .preprocess()?
//!     .threshold()
//!     .close()
//!     .trace()
//!     .select()
//!     .simplify()
//!     .sample();
//!
//! let puzzle = sampled.into_puzzle();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state.
//! Only preprocessing can fail; every later stage is total. A stage keeps
//! the shared [`Context`] and its own output. Raster intermediates are
//! dropped as soon as the next stage has consumed them, so a run never
//! holds more than two masks at once.

use tracing::debug;

use crate::contour::ContourTracer;
use crate::diagnostics::{StageMetrics, contour_stats, total_points};
use crate::preprocess::Preprocessed;
use crate::sample::Sampling;
use crate::select::{Selection, SelectionLimits};
use crate::threshold::count_foreground;
use crate::types::{
    BinaryMask, DotPuzzle, GrayImage, JobSettings, PipelineConfig, PipelineError, Point, Polyline,
};

/// Entry point for the incremental pipeline.
#[derive(Debug)]
pub struct Pipeline;

impl Pipeline {
    /// Start a run over encoded image bytes.
    ///
    /// Nothing is decoded or validated until
    /// [`Pending::preprocess`] is called.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, settings: JobSettings, config: PipelineConfig) -> Pending {
        Pending {
            settings,
            config,
            source,
        }
    }
}

/// Settings, configuration, and preprocessing output shared by every
/// stage after [`Pending`].
#[derive(Debug, Clone)]
pub struct Context {
    settings: JobSettings,
    config: PipelineConfig,
    source_len: usize,
    preprocessed: Preprocessed,
}

impl Context {
    /// The job settings for this run.
    #[must_use]
    pub const fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// The pipeline configuration for this run.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Size of the encoded input in bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Preprocessing output: working luminance and the resolutions.
    #[must_use]
    pub const fn preprocessed(&self) -> &Preprocessed {
        &self.preprocessed
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing, call .preprocess() to continue"]
pub struct Pending {
    settings: JobSettings,
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the settings, decode the source, and reduce it to a
    /// denoised working luminance image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the job settings are
    /// out of range, or any decoding error from
    /// [`preprocess`](crate::preprocess::preprocess).
    pub fn preprocess(self) -> Result<Prepared, PipelineError> {
        self.settings.validate()?;
        let preprocessed = crate::preprocess::preprocess(&self.source, &self.config)?;
        Ok(Prepared {
            ctx: Context {
                settings: self.settings,
                config: self.config,
                source_len: self.source.len(),
                preprocessed,
            },
        })
    }
}

// ───────────────────────── Stage 1: Prepared ─────────────────────────

/// Pipeline state after preprocessing.
#[must_use = "pipeline stages are consumed by advancing, call .threshold() to continue"]
pub struct Prepared {
    ctx: Context,
}

impl Prepared {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The denoised working-resolution luminance image.
    #[must_use]
    pub const fn luma(&self) -> &GrayImage {
        &self.ctx.preprocessed.luma
    }

    /// Binarize against the local mean.
    pub fn threshold(self) -> Thresholded {
        let config = &self.ctx.config;
        let mask = crate::threshold::adaptive_threshold(
            &self.ctx.preprocessed.luma,
            config.threshold_radius,
            config.threshold_bias,
        );
        let foreground = count_foreground(&mask);
        debug!(
            radius = config.threshold_radius,
            bias = config.threshold_bias,
            foreground,
            "thresholded"
        );
        Thresholded {
            ctx: self.ctx,
            mask,
            foreground,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let pre = &self.ctx.preprocessed;
        StageMetrics::Preprocess {
            input_bytes: self.ctx.source_len,
            source_width: pre.source.width,
            source_height: pre.source.height,
            working_width: pre.working.width,
            working_height: pre.working.height,
            fit_width: pre.fit.width,
            fit_height: pre.fit.height,
            downsampled: pre.downsampled,
        }
    }
}

// ───────────────────────── Stage 2: Thresholded ──────────────────────

/// Pipeline state after adaptive thresholding.
#[must_use = "pipeline stages are consumed by advancing, call .close() to continue"]
pub struct Thresholded {
    ctx: Context,
    mask: BinaryMask,
    foreground: u64,
}

impl Thresholded {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The raw foreground mask.
    #[must_use]
    pub const fn mask(&self) -> &BinaryMask {
        &self.mask
    }

    /// Bridge small gaps in the mask.
    pub fn close(self) -> Closed {
        let radius = self.ctx.config.close_radius;
        let closed = crate::morphology::close(&self.mask, radius);
        let foreground_after = count_foreground(&closed);
        debug!(
            radius,
            before = self.foreground,
            after = foreground_after,
            "closed mask"
        );
        Closed {
            ctx: self.ctx,
            closed,
            foreground_before: self.foreground,
            foreground_after,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Threshold {
            radius: self.ctx.config.threshold_radius,
            bias: self.ctx.config.threshold_bias,
            foreground_pixels: self.foreground,
            total_pixels: self.ctx.preprocessed.working.pixel_count(),
        }
    }
}

// ───────────────────────── Stage 3: Closed ───────────────────────────

/// Pipeline state after morphological closing.
#[must_use = "pipeline stages are consumed by advancing, call .trace() to continue"]
pub struct Closed {
    ctx: Context,
    closed: BinaryMask,
    foreground_before: u64,
    foreground_after: u64,
}

impl Closed {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The closed mask.
    #[must_use]
    pub const fn mask(&self) -> &BinaryMask {
        &self.closed
    }

    /// Trace every boundary and drop the short ones.
    pub fn trace(self) -> Traced {
        let config = &self.ctx.config;
        let traced = config.contour_tracer.trace(&self.closed);
        let traced_count = traced.len();
        let contours = crate::contour::prune(
            traced,
            config.min_contour_points,
            config.max_contour_points,
        );
        debug!(traced = traced_count, kept = contours.len(), "traced contours");
        Traced {
            ctx: self.ctx,
            contours,
            traced_count,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Close {
            radius: self.ctx.config.close_radius,
            foreground_before: self.foreground_before,
            foreground_after: self.foreground_after,
        }
    }
}

// ───────────────────────── Stage 4: Traced ───────────────────────────

/// Pipeline state after boundary tracing.
#[must_use = "pipeline stages are consumed by advancing, call .select() to continue"]
pub struct Traced {
    ctx: Context,
    contours: Vec<Polyline>,
    traced_count: usize,
}

impl Traced {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// Traced contours that survived pruning, in scan order.
    #[must_use]
    pub fn contours(&self) -> &[Polyline] {
        &self.contours
    }

    /// Keep the contours that explain most of the boundary length.
    pub fn select(self) -> Selected {
        let config = &self.ctx.config;
        let limits = SelectionLimits {
            min_perimeter: config.min_perimeter,
            max_contours: config.max_contours,
            coverage: config.perimeter_coverage,
        };
        let selection =
            crate::select::select_contours(self.contours, &limits, self.ctx.preprocessed.working);
        debug!(
            candidates = selection.candidates,
            kept = selection.contours.len(),
            fallback = selection.fallback,
            "selected contours"
        );
        Selected {
            ctx: self.ctx,
            selection,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let stats = contour_stats(&self.contours);
        StageMetrics::Trace {
            traced_count: self.traced_count,
            contour_count: self.contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        }
    }
}

// ───────────────────────── Stage 5: Selected ─────────────────────────

/// Pipeline state after contour selection.
#[must_use = "pipeline stages are consumed by advancing, call .simplify() to continue"]
pub struct Selected {
    ctx: Context,
    selection: Selection,
}

impl Selected {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The selection, longest contour first.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Simplify each kept contour with the difficulty's tolerance.
    pub fn simplify(self) -> Simplified {
        let epsilon = crate::simplify::epsilon_for(
            self.ctx.settings.difficulty,
            self.ctx.preprocessed.working,
        );
        let points_before = total_points(&self.selection.contours);
        let contours = crate::simplify::simplify_paths(&self.selection.contours, epsilon);
        debug!(
            difficulty = %self.ctx.settings.difficulty,
            epsilon,
            points_before,
            points_after = total_points(&contours),
            "simplified contours"
        );
        Simplified {
            ctx: self.ctx,
            epsilon,
            points_before,
            contours,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Select {
            candidates: self.selection.candidates,
            kept: self.selection.contours.len(),
            total_perimeter: self.selection.total_perimeter,
            kept_perimeter: self.selection.kept_perimeter,
            fallback: self.selection.fallback,
        }
    }
}

// ───────────────────────── Stage 6: Simplified ───────────────────────

/// Pipeline state after RDP simplification.
#[must_use = "pipeline stages are consumed by advancing, call .sample() to continue"]
pub struct Simplified {
    ctx: Context,
    epsilon: f64,
    points_before: usize,
    contours: Vec<Polyline>,
}

impl Simplified {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The simplification tolerance used, in working pixels.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The simplified contours, implicitly closed.
    #[must_use]
    pub fn contours(&self) -> &[Polyline] {
        &self.contours
    }

    /// Allocate the dot budget and place dots along each contour.
    pub fn sample(self) -> Sampled {
        let pre = &self.ctx.preprocessed;
        let sampling = crate::sample::sample_dots(
            &self.contours,
            self.ctx.settings.dot_count,
            self.ctx.config.min_dots_per_contour,
            pre.work_scale,
            pre.fit,
        );
        debug!(
            requested = self.ctx.settings.dot_count,
            emitted = sampling.dots.len(),
            "sampled dots"
        );
        Sampled {
            ctx: self.ctx,
            sampling,
        }
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let points_after = total_points(&self.contours);
        #[allow(clippy::cast_precision_loss)]
        let reduction_ratio = if self.points_before > 0 {
            1.0 - (points_after as f64 / self.points_before as f64)
        } else {
            0.0
        };
        StageMetrics::Simplify {
            epsilon: self.epsilon,
            points_before: self.points_before,
            points_after,
            reduction_ratio,
        }
    }
}

// ───────────────────────── Stage 7: Sampled ──────────────────────────

/// Final pipeline state: dots placed in fit space.
#[must_use = "call .into_puzzle() to obtain the result"]
pub struct Sampled {
    ctx: Context,
    sampling: Sampling,
}

impl Sampled {
    /// Shared run context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// The ordered dots in fit-resolution pixels.
    #[must_use]
    pub fn dots(&self) -> &[Point] {
        &self.sampling.dots
    }

    /// Dots allocated to each simplified contour.
    #[must_use]
    pub fn allocation(&self) -> &[u32] {
        &self.sampling.allocation
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Sample {
            requested: self.ctx.settings.dot_count,
            emitted: self.sampling.dots.len(),
            allocation: self.sampling.allocation.clone(),
        }
    }

    /// Finish the run.
    pub fn into_puzzle(self) -> DotPuzzle {
        DotPuzzle {
            dots: self.sampling.dots,
            canvas: self.ctx.preprocessed.fit,
            working: self.ctx.preprocessed.working,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, Dimensions};

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    fn square_png() -> Vec<u8> {
        encode_png(&GrayImage::from_fn(100, 80, |x, y| {
            let inside = (30..70).contains(&x) && (20..60).contains(&y);
            image::Luma([if inside { 10 } else { 240 }])
        }))
    }

    #[test]
    fn stages_expose_intermediates() {
        let prepared = Pipeline::new(square_png(), JobSettings::default(), PipelineConfig::default())
            .preprocess()
            .unwrap();
        assert_eq!(prepared.luma().dimensions(), (100, 80));

        let thresholded = prepared.threshold();
        assert!(count_foreground(thresholded.mask()) > 0);

        let closed = thresholded.close();
        assert_eq!(closed.mask().dimensions(), (100, 80));

        let traced = closed.trace();
        assert!(!traced.contours().is_empty());

        let selected = traced.select();
        assert!(!selected.selection().fallback);

        let simplified = selected.simplify();
        assert!(simplified.epsilon() > 0.0);
        assert!(
            simplified
                .contours()
                .iter()
                .all(|c| c.len() <= PipelineConfig::DEFAULT_MAX_CONTOUR_POINTS)
        );

        let sampled = simplified.sample();
        assert!(!sampled.dots().is_empty());
        assert!(sampled.dots().len() <= 100);

        let puzzle = sampled.into_puzzle();
        assert_eq!(puzzle.working, Dimensions::new(100, 80));
        assert_eq!(puzzle.canvas, Dimensions::new(2244, 1795));
    }

    #[test]
    fn invalid_settings_fail_at_preprocess() {
        let settings = JobSettings {
            dot_count: 0,
            ..JobSettings::default()
        };
        let result = Pipeline::new(square_png(), settings, PipelineConfig::default()).preprocess();
        assert!(matches!(result, Err(PipelineError::InvalidSettings(_))));
    }

    #[test]
    fn metrics_report_each_stage() {
        let settings = JobSettings {
            difficulty: Difficulty::Easy,
            ..JobSettings::default()
        };
        let prepared = Pipeline::new(square_png(), settings, PipelineConfig::default())
            .preprocess()
            .unwrap();
        assert!(matches!(
            prepared.metrics(),
            StageMetrics::Preprocess {
                source_width: 100,
                downsampled: false,
                ..
            }
        ));
        let selected = prepared.threshold().close().trace().select();
        let expected = selected.selection().contours.len();
        assert!(matches!(
            selected.metrics(),
            StageMetrics::Select { kept, .. } if kept == expected
        ));
    }
}

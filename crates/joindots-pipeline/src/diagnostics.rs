//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning. [`process_with_diagnostics`] runs the same stages
//! as [`crate::process`] and records one [`StageDiagnostics`] per stage.
//!
//! Timestamps come from an injected [`Clock`], so this crate never reads
//! the system time itself. Durations are serialized as fractional seconds
//! (`f64`) for JSON compatibility, since `std::time::Duration` does not
//! implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::{
    Closed, Pipeline, Prepared, Sampled, Selected, Simplified, Thresholded, Traced,
};
use crate::progress::{Monotonic, ProgressSink, milestone};
use crate::types::{DotPuzzle, JobSettings, PipelineConfig, PipelineError, Polyline};

/// Source of timestamps for stage timing.
///
/// Implemented by the caller (for example over `std::time::Instant`) so
/// the pipeline stays free of platform clock dependencies.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Decode, downsample, contrast stretch, and median filter.
    pub preprocess: StageDiagnostics,
    /// Adaptive local-mean threshold.
    pub threshold: StageDiagnostics,
    /// Morphological closing.
    pub close: StageDiagnostics,
    /// Boundary tracing.
    pub trace: StageDiagnostics,
    /// Perimeter-ranked contour selection.
    pub select: StageDiagnostics,
    /// RDP simplification.
    pub simplify: StageDiagnostics,
    /// Dot budget allocation and arc-length sampling.
    pub sample: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Preprocessing metrics.
    Preprocess {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded source width in pixels.
        source_width: u32,
        /// Decoded source height in pixels.
        source_height: u32,
        /// Working-resolution width in pixels.
        working_width: u32,
        /// Working-resolution height in pixels.
        working_height: u32,
        /// Fit-resolution width in pixels.
        fit_width: u32,
        /// Fit-resolution height in pixels.
        fit_height: u32,
        /// Whether the source was reduced to the working resolution.
        downsampled: bool,
    },
    /// Adaptive threshold metrics.
    Threshold {
        /// Local-mean window radius.
        radius: u32,
        /// Bias subtracted from the local mean.
        bias: f64,
        /// Foreground pixels in the mask.
        foreground_pixels: u64,
        /// Total pixel count for computing foreground density.
        total_pixels: u64,
    },
    /// Morphological closing metrics.
    Close {
        /// Structuring element radius.
        radius: u8,
        /// Foreground pixels before closing.
        foreground_before: u64,
        /// Foreground pixels after closing.
        foreground_after: u64,
    },
    /// Contour tracing metrics.
    Trace {
        /// Boundaries found before pruning.
        traced_count: usize,
        /// Contours kept after dropping short ones.
        contour_count: usize,
        /// Total number of points across kept contours.
        total_point_count: usize,
        /// Minimum points in any kept contour.
        min_contour_points: usize,
        /// Maximum points in any kept contour.
        max_contour_points: usize,
        /// Mean points per kept contour.
        mean_contour_points: f64,
    },
    /// Contour selection metrics.
    Select {
        /// Contours above the minimum perimeter.
        candidates: usize,
        /// Contours kept.
        kept: usize,
        /// Sum of candidate perimeters (working pixels).
        total_perimeter: f64,
        /// Sum of kept perimeters (working pixels).
        kept_perimeter: f64,
        /// Whether the border rectangle was substituted.
        fallback: bool,
    },
    /// Path simplification metrics.
    Simplify {
        /// RDP tolerance in working pixels.
        epsilon: f64,
        /// Total points before simplification.
        points_before: usize,
        /// Total points after simplification.
        points_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
    /// Dot sampling metrics.
    Sample {
        /// Requested dot count.
        requested: u32,
        /// Dots actually placed.
        emitted: usize,
        /// Dots allocated to each simplified contour, longest first.
        allocation: Vec<u32>,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Working-resolution pixel count.
    pub working_pixel_count: u64,
    /// Contours that received dots.
    pub contour_count: usize,
    /// Dots in the finished puzzle.
    pub dot_count: usize,
}

impl PipelineDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Preprocess", &self.preprocess),
            ("Threshold", &self.threshold),
            ("Close", &self.close),
            ("Trace", &self.trace),
            ("Select", &self.select),
            ("Simplify", &self.simplify),
            ("Sample", &self.sample),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} working pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.working_pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Dots: {}",
            self.summary.contour_count, self.summary.dot_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preprocess {
            input_bytes,
            source_width,
            source_height,
            working_width,
            working_height,
            fit_width,
            fit_height,
            downsampled,
        } => {
            let marker = if *downsampled { " (downsampled)" } else { "" };
            format!(
                "{input_bytes} bytes -> {source_width}x{source_height} -> work {working_width}x{working_height}{marker}, fit {fit_width}x{fit_height}",
            )
        }
        StageMetrics::Threshold {
            radius,
            bias,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("r={radius} C={bias:.1} fg={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::Close {
            radius,
            foreground_before,
            foreground_after,
        } => format!("r={radius} fg={foreground_before}->{foreground_after}"),
        StageMetrics::Trace {
            traced_count,
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => {
            format!(
                "{traced_count} traced, {contour_count} kept, {total_point_count} pts (min={min_contour_points} max={max_contour_points} mean={mean_contour_points:.1})",
            )
        }
        StageMetrics::Select {
            candidates,
            kept,
            total_perimeter,
            kept_perimeter,
            fallback,
        } => {
            if *fallback {
                format!("no candidates, border rectangle (perimeter {kept_perimeter:.0})")
            } else {
                format!(
                    "{kept}/{candidates} contours, perimeter {kept_perimeter:.0}/{total_perimeter:.0}",
                )
            }
        }
        StageMetrics::Simplify {
            epsilon,
            points_before,
            points_after,
            reduction_ratio,
        } => {
            format!(
                "eps={epsilon:.2} {points_before}->{points_after} pts ({:.1}% reduction)",
                reduction_ratio * 100.0,
            )
        }
        StageMetrics::Sample {
            requested,
            emitted,
            allocation,
        } => {
            let given = allocation.iter().filter(|&&n| n > 0).count();
            format!("{emitted}/{requested} dots over {given} contours")
        }
    }
}

/// Statistics for a set of contour polylines.
pub(crate) struct ContourStats {
    /// Total number of points across all contours.
    pub total: usize,
    /// Minimum number of points in any single contour.
    pub min: usize,
    /// Maximum number of points in any single contour.
    pub max: usize,
    /// Mean number of points per contour.
    pub mean: f64,
}

/// Compute contour statistics from a set of polylines.
pub(crate) fn contour_stats(contours: &[Polyline]) -> ContourStats {
    let total = total_points(contours);
    let min = contours.iter().map(Polyline::len).min().unwrap_or(0);
    let max = contours.iter().map(Polyline::len).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if contours.is_empty() {
        0.0
    } else {
        total as f64 / contours.len() as f64
    };
    ContourStats {
        total,
        min,
        max,
        mean,
    }
}

/// Total points across a slice of polylines.
pub(crate) fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// Run one stage under the clock and record its metrics.
fn timed<C: Clock, T>(
    clock: &C,
    run: impl FnOnce() -> Result<T, PipelineError>,
    metrics: impl FnOnce(&T) -> StageMetrics,
) -> Result<(T, StageDiagnostics), PipelineError> {
    let start = clock.now();
    let stage = run()?;
    let duration = clock.elapsed(&start);
    let metrics = metrics(&stage);
    Ok((stage, StageDiagnostics { duration, metrics }))
}

/// Run the pipeline and collect per-stage diagnostics.
///
/// Produces the same [`DotPuzzle`] as [`crate::process`] and reports the
/// same progress milestones.
///
/// # Errors
///
/// Returns the same errors as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    settings: &JobSettings,
    config: &PipelineConfig,
    clock: &C,
    progress: &mut dyn ProgressSink,
) -> Result<(DotPuzzle, PipelineDiagnostics), PipelineError> {
    let mut progress = Monotonic::new(progress);
    progress.report(milestone::STARTED);
    let total_start = clock.now();

    let pending = Pipeline::new(image_bytes.to_vec(), *settings, config.clone());
    let (prepared, preprocess) = timed(clock, || pending.preprocess(), |s: &Prepared| s.metrics())?;
    progress.report(milestone::PREPROCESSED);
    let (thresholded, threshold) = timed(clock, || Ok(prepared.threshold()), |s: &Thresholded| {
        s.metrics()
    })?;
    progress.report(milestone::THRESHOLDED);
    let (closed, close) = timed(clock, || Ok(thresholded.close()), |s: &Closed| s.metrics())?;
    progress.report(milestone::CLOSED);
    let (traced, trace) = timed(clock, || Ok(closed.trace()), |s: &Traced| s.metrics())?;
    progress.report(milestone::TRACED);
    let (selected, select) = timed(clock, || Ok(traced.select()), |s: &Selected| s.metrics())?;
    progress.report(milestone::SELECTED);
    let (simplified, simplify) = timed(clock, || Ok(selected.simplify()), |s: &Simplified| {
        s.metrics()
    })?;
    progress.report(milestone::SIMPLIFIED);
    let (sampled, sample) = timed(clock, || Ok(simplified.sample()), |s: &Sampled| s.metrics())?;
    progress.report(milestone::SAMPLED);

    let total_duration = clock.elapsed(&total_start);
    let source = sampled.context().preprocessed().source;
    let working = sampled.context().preprocessed().working;
    let summary = PipelineSummary {
        image_width: source.width,
        image_height: source.height,
        working_pixel_count: working.pixel_count(),
        contour_count: sampled.allocation().iter().filter(|&&n| n > 0).count(),
        dot_count: sampled.dots().len(),
    };
    let puzzle = sampled.into_puzzle();

    let diagnostics = PipelineDiagnostics {
        preprocess,
        threshold,
        close,
        trace,
        select,
        simplify,
        sample,
        total_duration,
        summary,
    };
    info!(
        dots = puzzle.len(),
        total_ms = duration_ms(diagnostics.total_duration),
        "pipeline finished with diagnostics"
    );

    Ok((puzzle, diagnostics))
}

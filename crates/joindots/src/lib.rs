//! joindots: turn a photo into a printable numbered connect-the-dots page.
//!
//! [`generate`] is the single entry point: encoded image bytes and
//! [`JobSettings`] in, an A4 PNG and an A4 PDF out. It chains the
//! conversion pipeline (`joindots-pipeline`) and both page renderers
//! (`joindots-export`) and reports progress percentages along the way.
//!
//! The computation is synchronous, deterministic, and keeps no state
//! between calls, so independent jobs may run concurrently on separate
//! threads. There is no cancellation; run the call on a thread or
//! process that can be abandoned if a job must be aborted.

use tracing::{info, instrument};

pub use joindots_export::{ExportError, PageLayout};
pub use joindots_pipeline::{
    Clock, Difficulty, DotPuzzle, JobSettings, NoProgress, PipelineConfig, PipelineDiagnostics,
    PipelineError, ProgressSink, milestone,
};

use joindots_pipeline::progress::Monotonic;

/// Errors from [`generate`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The photo or settings were rejected by the conversion pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A page could not be rendered.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Both rendered pages plus the dots they were drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPuzzle {
    /// A4 PNG page.
    pub raster: Vec<u8>,
    /// One-page A4 PDF.
    pub paged: Vec<u8>,
    /// The numbered dots, in fit-space pixels.
    pub puzzle: DotPuzzle,
}

/// Pipeline tuning and page geometry for a run.
///
/// The pipeline's fit area must match the layout's content area so dots
/// land inside the page margins; [`Generator::new`] keeps the two in
/// step.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    config: PipelineConfig,
    layout: PageLayout,
}

impl Generator {
    /// A generator for `layout` with default pipeline tuning.
    #[must_use]
    pub fn new(layout: PageLayout) -> Self {
        Self::with_config(PipelineConfig::default(), layout)
    }

    /// A generator with explicit pipeline tuning. The fit area of
    /// `config` is replaced by the content area of `layout`.
    #[must_use]
    pub fn with_config(config: PipelineConfig, layout: PageLayout) -> Self {
        let config = PipelineConfig {
            fit_area: layout.content_px(),
            ..config
        };
        Self { config, layout }
    }

    /// Pipeline tuning in effect.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Page geometry in effect.
    #[must_use]
    pub const fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Convert `image_bytes` and render both pages.
    ///
    /// Reports milestones from 10 through 100 to `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Pipeline`] for empty, undecodable, or
    /// zero-sized images and invalid settings, and
    /// [`GenerateError::Export`] if a page cannot be rendered.
    #[instrument(
        skip_all,
        fields(
            input_bytes = image_bytes.len(),
            dot_count = settings.dot_count,
            difficulty = %settings.difficulty,
        )
    )]
    pub fn generate(
        &self,
        image_bytes: &[u8],
        settings: &JobSettings,
        progress: &mut dyn ProgressSink,
    ) -> Result<GeneratedPuzzle, GenerateError> {
        let mut progress = Monotonic::new(progress);
        let puzzle = joindots_pipeline::process(image_bytes, settings, &self.config, &mut progress)?;
        self.render(puzzle, settings, &mut progress)
    }

    /// Like [`generate`](Self::generate), also returning per-stage
    /// pipeline diagnostics timed with `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn generate_with_diagnostics<C: Clock>(
        &self,
        image_bytes: &[u8],
        settings: &JobSettings,
        clock: &C,
        progress: &mut dyn ProgressSink,
    ) -> Result<(GeneratedPuzzle, PipelineDiagnostics), GenerateError> {
        let mut progress = Monotonic::new(progress);
        let (puzzle, diagnostics) = joindots_pipeline::process_with_diagnostics(
            image_bytes,
            settings,
            &self.config,
            clock,
            &mut progress,
        )?;
        Ok((self.render(puzzle, settings, &mut progress)?, diagnostics))
    }

    fn render(
        &self,
        puzzle: DotPuzzle,
        settings: &JobSettings,
        progress: &mut dyn ProgressSink,
    ) -> Result<GeneratedPuzzle, GenerateError> {
        let raster = joindots_export::to_png(&puzzle, &self.layout, settings.show_guide_lines)?;
        progress.report(milestone::RASTER_RENDERED);
        let paged = joindots_export::to_pdf(&puzzle, &self.layout, settings.show_guide_lines)?;
        progress.report(milestone::PAGED_RENDERED);

        info!(
            dots = puzzle.len(),
            raster_bytes = raster.len(),
            paged_bytes = paged.len(),
            "pages rendered"
        );
        progress.report(milestone::DONE);
        Ok(GeneratedPuzzle {
            raster,
            paged,
            puzzle,
        })
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(PageLayout::default())
    }
}

/// Convert a photo into a numbered-dot puzzle on an A4 PNG and PDF.
///
/// Uses the default A4 layout and pipeline tuning. Pass [`NoProgress`]
/// when nobody is listening.
///
/// # Errors
///
/// See [`Generator::generate`].
pub fn generate(
    image_bytes: &[u8],
    settings: &JobSettings,
    progress: &mut dyn ProgressSink,
) -> Result<GeneratedPuzzle, GenerateError> {
    Generator::default().generate(image_bytes, settings, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_keeps_fit_area_in_step_with_layout() {
        let layout = PageLayout {
            margin_px: 200,
            ..PageLayout::default()
        };
        let generator = Generator::with_config(PipelineConfig::default(), layout.clone());
        assert_eq!(generator.config().fit_area, layout.content_px());
        assert_eq!(generator.layout(), &layout);
    }

    #[test]
    fn default_generator_uses_default_fit_area() {
        assert_eq!(
            Generator::default().config(),
            &PipelineConfig::default()
        );
    }

    #[test]
    fn pipeline_errors_pass_through() {
        let result = generate(&[], &JobSettings::default(), &mut NoProgress);
        assert!(matches!(
            result,
            Err(GenerateError::Pipeline(PipelineError::EmptyInput))
        ));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = JobSettings {
            dot_count: 1,
            ..JobSettings::default()
        };
        let result = generate(b"irrelevant", &settings, &mut NoProgress);
        assert!(matches!(
            result,
            Err(GenerateError::Pipeline(PipelineError::InvalidSettings(_)))
        ));
    }
}

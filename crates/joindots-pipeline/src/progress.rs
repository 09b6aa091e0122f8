//! Progress reporting at stage boundaries.
//!
//! Reports are advisory whole percentages (0-100), non-decreasing over
//! one run. Any `FnMut(u8)` closure is a [`ProgressSink`]; pass
//! [`NoProgress`] when nobody is listening.
//!
//! The sink is called synchronously on the pipeline's thread. A caller
//! driving an asynchronous job record should forward percentages over a
//! channel and run the conversion on a blocking worker.

/// Receives progress percentages.
pub trait ProgressSink {
    /// Record that the run has reached `percent` (0-100).
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent);
    }
}

/// A sink that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Fixed milestones reported by the conversion.
pub mod milestone {
    /// The run has started.
    pub const STARTED: u8 = 10;
    /// Decoded, downsampled, and denoised.
    pub const PREPROCESSED: u8 = 20;
    /// Foreground mask produced.
    pub const THRESHOLDED: u8 = 30;
    /// Mask closed.
    pub const CLOSED: u8 = 35;
    /// Boundaries traced.
    pub const TRACED: u8 = 45;
    /// Dominant contours selected.
    pub const SELECTED: u8 = 55;
    /// Contours simplified.
    pub const SIMPLIFIED: u8 = 60;
    /// Dots placed.
    pub const SAMPLED: u8 = 65;
    /// Raster page rendered.
    pub const RASTER_RENDERED: u8 = 80;
    /// Paged document rendered.
    pub const PAGED_RENDERED: u8 = 95;
    /// Both outputs ready.
    pub const DONE: u8 = 100;
}

/// Wraps a sink and drops reports that would move progress backwards
/// or past 100.
pub struct Monotonic<'a, S: ProgressSink + ?Sized> {
    inner: &'a mut S,
    last: Option<u8>,
}

impl<'a, S: ProgressSink + ?Sized> Monotonic<'a, S> {
    /// Wrap `inner`.
    pub const fn new(inner: &'a mut S) -> Self {
        Self { inner, last: None }
    }

    /// The most recent percentage forwarded, if any.
    #[must_use]
    pub const fn last(&self) -> Option<u8> {
        self.last
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Monotonic<'_, S> {
    fn report(&mut self, percent: u8) {
        let percent = percent.min(milestone::DONE);
        if self.last.is_some_and(|last| percent < last) {
            return;
        }
        self.last = Some(percent);
        self.inner.report(percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            sink.report(10);
            sink.report(20);
        }
        assert_eq!(seen, vec![10, 20]);
    }

    #[test]
    fn monotonic_drops_regressions_and_caps() {
        let mut seen = Vec::new();
        let mut record = |p: u8| seen.push(p);
        let mut sink = Monotonic::new(&mut record);
        sink.report(20);
        sink.report(10);
        sink.report(20);
        sink.report(250);
        assert_eq!(sink.last(), Some(100));
        assert_eq!(seen, vec![20, 20, 100]);
    }

    #[test]
    fn milestones_are_increasing() {
        let all = [
            milestone::STARTED,
            milestone::PREPROCESSED,
            milestone::THRESHOLDED,
            milestone::CLOSED,
            milestone::TRACED,
            milestone::SELECTED,
            milestone::SIMPLIFIED,
            milestone::SAMPLED,
            milestone::RASTER_RENDERED,
            milestone::PAGED_RENDERED,
            milestone::DONE,
        ];
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn no_progress_accepts_anything() {
        NoProgress.report(42);
    }
}

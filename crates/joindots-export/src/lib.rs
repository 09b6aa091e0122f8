//! joindots-export: page renderers for dot puzzles (sans-IO).
//!
//! Turns a [`DotPuzzle`](joindots_pipeline::DotPuzzle) into two print
//! artifacts with identical geometry:
//!
//! - [`to_png`]: an A4 raster page at 300 DPI.
//! - [`to_pdf`]: a one-page A4 PDF.
//!
//! Both take the same [`PageLayout`] and share [`label_anchor`] for
//! direction-aware label placement. Nothing here touches the
//! filesystem; callers receive bytes.

#![warn(missing_docs)]

pub mod font;
pub mod glyphs;
pub mod layout;
pub mod pdf;
pub mod raster;

pub use layout::{Bounds, LabelSize, PageLayout, label_anchor};
pub use pdf::to_pdf;
pub use raster::to_png;

/// Errors that can occur while rendering a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The raster surface could not be allocated (zero or oversized
    /// page dimensions).
    #[error("could not allocate a raster page")]
    Canvas,

    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),

    /// The PDF document could not be built or serialized.
    #[error("failed to build PDF: {0}")]
    Pdf(String),
}

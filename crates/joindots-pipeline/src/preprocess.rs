//! Image decoding, downsampling, and luminance cleanup.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP), reduces the image so
//! the longest axis is at most the configured working resolution, and
//! produces a denoised single-channel luminance image. Every later
//! per-pixel stage runs on this bounded grid, so their cost does not
//! depend on the size of the upload.
//!
//! Two resolutions leave this stage:
//!
//! - **working**: the grid the pipeline analyses.
//! - **fit**: the source scaled to fit the printable content area. Dots
//!   are reported in this space, and `work_scale` converts between the two.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::types::{Dimensions, PipelineConfig, PipelineError};

/// Output of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Denoised luminance at working resolution.
    pub luma: GrayImage,
    /// Decoded source dimensions.
    pub source: Dimensions,
    /// Working-resolution dimensions (same as `luma`).
    pub working: Dimensions,
    /// Fit-resolution dimensions.
    pub fit: Dimensions,
    /// `working / fit` along the longest axis. Divide a working-space
    /// coordinate by this to obtain its fit-space position.
    pub work_scale: f64,
    /// Whether the source was larger than the working resolution.
    pub downsampled: bool,
}

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt, and [`PipelineError::InvalidImage`] if the decoded
/// image has a zero dimension.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "decoded image is {}x{}",
            img.width(),
            img.height(),
        )));
    }
    Ok(img)
}

/// Scale `source` to fit inside `area`, preserving aspect ratio.
///
/// Both axes of the result are at least 1 pixel.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops
)]
pub fn fit_dimensions(source: Dimensions, area: Dimensions) -> Dimensions {
    let scale = (f64::from(area.width) / f64::from(source.width.max(1)))
        .min(f64::from(area.height) / f64::from(source.height.max(1)));
    Dimensions::new(
        ((f64::from(source.width) * scale).round() as u32).max(1),
        ((f64::from(source.height) * scale).round() as u32).max(1),
    )
}

/// Downsample so the longest axis is at most `max_dimension` pixels.
///
/// Returns the (possibly unchanged) image and whether downsampling was
/// actually applied. Images are never upscaled.
#[must_use]
pub fn downsample(image: &DynamicImage, max_dimension: u32) -> (DynamicImage, bool) {
    let long_axis = image.width().max(image.height());
    if max_dimension == 0 || long_axis <= max_dimension {
        return (image.clone(), false);
    }
    let resized = image.resize(max_dimension, max_dimension, FilterType::Triangle);
    (resized, true)
}

/// Linearly stretch luminance so the darkest pixel becomes 0 and the
/// brightest 255.
///
/// Flat images (every pixel the same value) are returned unchanged.
#[must_use = "returns the stretched image"]
pub fn stretch_contrast(image: &GrayImage) -> GrayImage {
    let (lo, hi) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if lo >= hi {
        return image.clone();
    }

    let range = f64::from(hi - lo);
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate().skip(usize::from(lo)) {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let stretched = ((v as f64 - f64::from(lo)) * 255.0 / range).round().min(255.0) as u8;
        *slot = stretched;
    }

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([lut[usize::from(image.get_pixel(x, y).0[0])]])
    })
}

/// Median filter to suppress sensor and compression noise.
///
/// A radius of 0 returns the image unchanged.
#[must_use = "returns the denoised image"]
pub fn denoise(image: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

/// Run the full preprocessing stage.
///
/// # Errors
///
/// Propagates decoding failures from [`decode`].
pub fn preprocess(bytes: &[u8], config: &PipelineConfig) -> Result<Preprocessed, PipelineError> {
    let decoded = decode(bytes)?;
    let source = Dimensions::new(decoded.width(), decoded.height());
    let fit = fit_dimensions(source, config.fit_area);

    let (reduced, downsampled) = downsample(&decoded, config.working_resolution);
    let gray = reduced.to_luma8();
    let working = Dimensions::new(gray.width(), gray.height());

    let gray = if config.stretch_contrast {
        stretch_contrast(&gray)
    } else {
        gray
    };
    let luma = denoise(&gray, config.median_radius);

    let work_scale = if working.width >= working.height {
        f64::from(working.width) / f64::from(fit.width)
    } else {
        f64::from(working.height) / f64::from(fit.height)
    };

    debug!(
        %source,
        %working,
        %fit,
        work_scale,
        downsampled,
        "preprocessed image"
    );

    Ok(Preprocessed {
        luma,
        source,
        working,
        fit,
        work_scale,
        downsampled,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn gray_png(w: u32, h: u32, value: u8) -> Vec<u8> {
        encode_png(&image::RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([value, value, value, 255]),
        ))
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn fit_landscape_into_portrait_area() {
        let fit = fit_dimensions(Dimensions::new(400, 200), Dimensions::new(2244, 3272));
        assert_eq!(fit, Dimensions::new(2244, 1122));
    }

    #[test]
    fn fit_portrait_is_height_limited() {
        let fit = fit_dimensions(Dimensions::new(100, 400), Dimensions::new(2244, 3272));
        assert_eq!(fit, Dimensions::new(818, 3272));
    }

    #[test]
    fn small_image_is_not_downsampled() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 80));
        let (result, applied) = downsample(&img, 800);
        assert!(!applied);
        assert_eq!((result.width(), result.height()), (100, 80));
    }

    #[test]
    fn large_image_is_downsampled_preserving_aspect() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(1600, 1200));
        let (result, applied) = downsample(&img, 800);
        assert!(applied);
        assert_eq!((result.width(), result.height()), (800, 600));
    }

    #[test]
    fn stretch_maps_range_to_full_scale() {
        let img = GrayImage::from_fn(3, 1, |x, _| image::Luma([[100, 150, 200][x as usize]]));
        let out = stretch_contrast(&img);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
        let mid = out.get_pixel(1, 0).0[0];
        assert!((127..=128).contains(&mid), "mid = {mid}");
    }

    #[test]
    fn stretch_leaves_flat_image_alone() {
        let img = GrayImage::from_pixel(4, 4, image::Luma([255]));
        assert_eq!(stretch_contrast(&img), img);
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut img = GrayImage::from_pixel(5, 5, image::Luma([0]));
        img.put_pixel(2, 2, image::Luma([255]));
        let out = denoise(&img, 1);
        assert_eq!(out.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn preprocess_reports_all_resolutions() {
        let png = gray_png(1000, 500, 200);
        let config = PipelineConfig::default();
        let pre = preprocess(&png, &config).unwrap();
        assert_eq!(pre.source, Dimensions::new(1000, 500));
        assert_eq!(pre.working, Dimensions::new(800, 400));
        assert_eq!(pre.fit, Dimensions::new(2244, 1122));
        assert!(pre.downsampled);
        assert!((pre.work_scale - 800.0 / 2244.0).abs() < 1e-12);
        assert_eq!(pre.luma.dimensions(), (800, 400));
    }
}

//! Adaptive local-mean thresholding.
//!
//! Each pixel is compared with the mean luminance of the square window
//! centred on it. A pixel darker than `mean - bias` becomes foreground
//! (255); everything else is background (0). Comparing against a local
//! mean rather than one global cutoff keeps shadows and uneven lighting
//! from swallowing whole regions.
//!
//! Window sums come from a summed-area table, so the per-pixel cost is
//! constant regardless of the window radius.

use image::GrayImage;

use crate::types::{BACKGROUND, BinaryMask, FOREGROUND};

/// Summed-area table of a grayscale image.
///
/// Has `(width + 1) x (height + 1)` entries with a zero top row and left
/// column, so `sum(x0..x1, y0..y1)` needs no edge special-casing.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    table: Vec<u64>,
}

impl IntegralImage {
    /// Build the table for `gray`.
    #[must_use]
    pub fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = w as usize + 1;
        let mut table = vec![0u64; stride * (h as usize + 1)];

        for y in 0..h as usize {
            let mut row_sum = 0u64;
            for x in 0..w as usize {
                #[allow(clippy::cast_possible_truncation)]
                let value = gray.get_pixel(x as u32, y as u32).0[0];
                row_sum += u64::from(value);
                table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
            }
        }

        Self {
            width: w,
            height: h,
            table,
        }
    }

    /// Sum of pixel values in the half-open rectangle `[x0, x1) x [y0, y1)`.
    ///
    /// Coordinates are clamped to the image.
    #[must_use]
    pub fn sum(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let stride = self.width as usize + 1;
        let x0 = x0.min(self.width) as usize;
        let x1 = x1.min(self.width) as usize;
        let y0 = y0.min(self.height) as usize;
        let y1 = y1.min(self.height) as usize;
        if x1 <= x0 || y1 <= y0 {
            return 0;
        }
        self.table[y1 * stride + x1] + self.table[y0 * stride + x0]
            - self.table[y0 * stride + x1]
            - self.table[y1 * stride + x0]
    }

    /// Mean luminance of the square window of `radius` around `(cx, cy)`,
    /// clipped to the image.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn window_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let x0 = cx.saturating_sub(radius);
        let y0 = cy.saturating_sub(radius);
        let x1 = cx.saturating_add(radius).saturating_add(1).min(self.width);
        let y1 = cy.saturating_add(radius).saturating_add(1).min(self.height);
        let area = u64::from(x1.saturating_sub(x0)) * u64::from(y1.saturating_sub(y0));
        if area == 0 {
            return 0.0;
        }
        self.sum(x0, y0, x1, y1) as f64 / area as f64
    }
}

/// Binarize `gray` against its local mean.
///
/// A pixel is foreground when `value < local_mean - bias`.
#[must_use = "returns the binary mask"]
pub fn adaptive_threshold(gray: &GrayImage, radius: u32, bias: f64) -> BinaryMask {
    let integral = IntegralImage::new(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let mean = integral.window_mean(x, y, radius);
        let value = f64::from(gray.get_pixel(x, y).0[0]);
        if value < mean - bias {
            image::Luma([FOREGROUND])
        } else {
            image::Luma([BACKGROUND])
        }
    })
}

/// Number of foreground pixels in a mask.
#[must_use]
pub fn count_foreground(mask: &BinaryMask) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] == FOREGROUND)).sum()
}

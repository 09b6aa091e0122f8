//! Morphological closing of the thresholded mask.
//!
//! Dilation followed by erosion with the same square structuring
//! element. Gaps narrower than the element are bridged, so broken edge
//! fragments join into continuous boundaries, while features wider
//! than the element keep their shape.
//!
//! Wraps [`imageproc::morphology`] with the chessboard (L-infinity)
//! norm, which makes the structuring element a `(2r+1) x (2r+1)` square.

use imageproc::distance_transform::Norm;

use crate::types::BinaryMask;

/// Grow foreground: a pixel becomes foreground if any pixel within
/// `radius` (chessboard distance) is foreground.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &BinaryMask, radius: u8) -> BinaryMask {
    imageproc::morphology::dilate(mask, Norm::LInf, radius)
}

/// Shrink foreground: a pixel stays foreground only if every pixel
/// within `radius` (chessboard distance) is foreground.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &BinaryMask, radius: u8) -> BinaryMask {
    imageproc::morphology::erode(mask, Norm::LInf, radius)
}

/// Close small gaps: [`dilate`] then [`erode`] with the same radius.
///
/// A radius of 0 returns the mask unchanged.
#[must_use = "returns the closed mask"]
pub fn close(mask: &BinaryMask, radius: u8) -> BinaryMask {
    if radius == 0 {
        return mask.clone();
    }
    erode(&dilate(mask, radius), radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::count_foreground;
    use crate::types::{BACKGROUND, FOREGROUND};

    fn mask_from(rows: &[&str]) -> BinaryMask {
        let h = rows.len() as u32;
        let w = rows.first().map_or(0, |r| r.len()) as u32;
        BinaryMask::from_fn(w, h, |x, y| {
            let set = rows[y as usize].as_bytes()[x as usize] == b'#';
            image::Luma([if set { FOREGROUND } else { BACKGROUND }])
        })
    }

    #[test]
    fn close_bridges_one_pixel_gap() {
        let mask = mask_from(&[
            ".........",
            ".........",
            ".###.###.",
            ".........",
            ".........",
        ]);
        let closed = close(&mask, 1);
        assert_eq!(closed.get_pixel(4, 2).0[0], FOREGROUND);
    }

    #[test]
    fn close_keeps_wide_gap_open() {
        let mask = mask_from(&[
            "...........",
            "...........",
            ".###...###.",
            "...........",
            "...........",
        ]);
        let closed = close(&mask, 1);
        assert_eq!(closed.get_pixel(5, 2).0[0], BACKGROUND);
    }

    #[test]
    fn dilate_grows_single_pixel_to_square() {
        let mut mask = BinaryMask::new(7, 7);
        mask.put_pixel(3, 3, image::Luma([FOREGROUND]));
        let grown = dilate(&mask, 1);
        assert_eq!(count_foreground(&grown), 9);
        assert_eq!(grown.get_pixel(2, 2).0[0], FOREGROUND);
    }

    #[test]
    fn erode_removes_thin_line() {
        let mask = mask_from(&[".....", ".....", "#####", ".....", "....."]);
        let eroded = erode(&mask, 1);
        assert_eq!(count_foreground(&eroded), 0);
    }

    #[test]
    fn zero_radius_is_identity() {
        let mask = mask_from(&["#.#", ".#.", "#.#"]);
        assert_eq!(close(&mask, 0), mask);
    }
}

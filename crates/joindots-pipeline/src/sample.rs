//! Arc-length resampling and dot budget allocation.
//!
//! The requested dot count is shared among the simplified contours in
//! proportion to their perimeters, then each contour is walked by arc
//! length and dots are emitted at even spacing. Dot positions are
//! interpolated along segments, so they rarely coincide with vertices.

use crate::types::{Dimensions, Point, Polyline};

/// Resample an open polyline to exactly `n` points evenly spaced by
/// arc length.
///
/// Points are spaced `length / (n - 1)` apart; the first and last
/// points of the input are preserved. A zero-length polyline yields
/// `n` copies of its first point. An empty polyline yields no points.
#[must_use = "returns the resampled points"]
#[allow(clippy::cast_precision_loss)]
pub fn resample(polyline: &Polyline, n: usize) -> Vec<Point> {
    let points = polyline.points();
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![first];
    }

    let total = polyline.length();
    if total <= 0.0 {
        return vec![first; n];
    }

    let step = total / (n - 1) as f64;
    let mut out = Vec::with_capacity(n);
    out.push(first);

    // Walk segments once; `walked` is the arc length at the start of
    // segment `seg`.
    let mut seg = 0;
    let mut walked = 0.0;
    for k in 1..n - 1 {
        let target = step * k as f64;
        while seg + 1 < points.len() - 1 {
            let seg_len = points[seg].distance(points[seg + 1]);
            if walked + seg_len >= target {
                break;
            }
            walked += seg_len;
            seg += 1;
        }
        let a = points[seg];
        let b = points[seg + 1];
        let seg_len = a.distance(b);
        let t = if seg_len > 0.0 {
            ((target - walked) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(a.lerp(b, t));
    }

    out.push(last);
    out
}

/// Place `n` dots evenly around an implicitly closed contour.
///
/// Dots are spaced `perimeter / n` apart starting at the first point.
/// The start is not repeated at the end.
#[must_use = "returns the sampled points"]
pub fn resample_closed(contour: &Polyline, n: usize) -> Vec<Point> {
    if n == 0 {
        return Vec::new();
    }
    let mut points = resample(&contour.closed(), n + 1);
    points.pop();
    points
}

/// Whether a contour can carry dots: at least two distinct points.
#[must_use]
pub fn is_sampleable(contour: &Polyline) -> bool {
    contour.len() >= 2 && contour.perimeter() > 0.0
}

/// Share `total` dots among contours with the given perimeters.
///
/// Contours are visited longest first. Each receives
/// `round(remaining_dots * perimeter / remaining_perimeter)`, raised to
/// `min_per_contour` and capped at the dots still available. The last
/// contour visited takes whatever remains. A leftover smaller than
/// `min_per_contour` is added to the previously allocated contour
/// instead of starting a new one, so only a lone contour with
/// `total < min_per_contour` is ever below the minimum. Once the budget
/// is used up, shorter contours receive nothing. Non-positive perimeters
/// always receive nothing and consume no budget.
///
/// Returns one allocation per input perimeter, in input order. The sum
/// never exceeds `total`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn allocate_dots(perimeters: &[f64], total: u32, min_per_contour: u32) -> Vec<u32> {
    let mut allocation = vec![0u32; perimeters.len()];

    let mut order: Vec<usize> = (0..perimeters.len())
        .filter(|&i| perimeters[i] > 0.0)
        .collect();
    order.sort_by(|&a, &b| perimeters[b].total_cmp(&perimeters[a]));

    let mut remaining_dots = total;
    let mut remaining_perimeter: f64 = order.iter().map(|&i| perimeters[i]).sum();

    let mut previous: Option<usize> = None;

    for (rank, &i) in order.iter().enumerate() {
        if remaining_dots == 0 {
            break;
        }
        let perimeter = perimeters[i];
        let share = if rank + 1 == order.len() || remaining_perimeter <= 0.0 {
            remaining_dots
        } else {
            let proportional =
                (f64::from(remaining_dots) * perimeter / remaining_perimeter).round() as u32;
            proportional.max(min_per_contour).min(remaining_dots)
        };
        if share < min_per_contour
            && let Some(prev) = previous
        {
            allocation[prev] += remaining_dots;
            break;
        }
        allocation[i] = share;
        remaining_dots -= share;
        remaining_perimeter -= perimeter;
        previous = Some(i);
    }

    allocation
}

/// Output of the sampling stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampling {
    /// Dots in fit-resolution pixels, contour by contour.
    pub dots: Vec<Point>,
    /// Dots given to each input contour, in input order.
    pub allocation: Vec<u32>,
}

/// Convert a working-space point to whole fit-space pixels inside `fit`.
#[must_use]
pub fn to_fit_space(point: Point, work_scale: f64, fit: Dimensions) -> Point {
    let scale = if work_scale > 0.0 { work_scale } else { 1.0 };
    let max_x = f64::from(fit.width.saturating_sub(1));
    let max_y = f64::from(fit.height.saturating_sub(1));
    Point::new(
        (point.x / scale).round().clamp(0.0, max_x),
        (point.y / scale).round().clamp(0.0, max_y),
    )
}

/// Allocate `total` dots across `contours` and sample each one.
///
/// Contours that are not [sampleable](is_sampleable) are skipped without
/// consuming budget. If no dot could be placed at all, a single dot at
/// the centre of the fit canvas is returned so the puzzle is never empty.
#[must_use = "returns the sampled dots"]
pub fn sample_dots(
    contours: &[Polyline],
    total: u32,
    min_per_contour: u32,
    work_scale: f64,
    fit: Dimensions,
) -> Sampling {
    let perimeters: Vec<f64> = contours
        .iter()
        .map(|c| if is_sampleable(c) { c.perimeter() } else { 0.0 })
        .collect();
    let allocation = allocate_dots(&perimeters, total, min_per_contour);

    let mut dots: Vec<Point> = contours
        .iter()
        .zip(&allocation)
        .filter(|&(_, &n)| n > 0)
        .flat_map(|(contour, &n)| resample_closed(contour, n as usize))
        .map(|p| to_fit_space(p, work_scale, fit))
        .collect();

    if dots.is_empty() && total > 0 {
        dots.push(Point::new(
            f64::from(fit.width / 2),
            f64::from(fit.height / 2),
        ));
    }

    Sampling { dots, allocation }
}

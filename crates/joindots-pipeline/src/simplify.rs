//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count in polylines by removing points that are within
//! a given tolerance of the line between their neighbors. Segments are
//! processed from an explicit work stack, so pathological inputs cannot
//! exhaust the call stack.
//!
//! The tolerance is tied to the puzzle difficulty through
//! [`epsilon_for`]: easy puzzles collapse outlines to a few bold
//! corners, hard puzzles keep fine detail.

use crate::types::{Difficulty, Dimensions, Point, Polyline};

/// Simplification tolerance in working pixels for `difficulty` on a
/// canvas of `working` size: a fraction of the canvas diagonal.
#[must_use]
pub fn epsilon_for(difficulty: Difficulty, working: Dimensions) -> f64 {
    working.diagonal() * difficulty.epsilon_fraction()
}

/// Simplify a single open polyline using the Ramer-Douglas-Peucker
/// algorithm.
///
/// Points within `tolerance` pixels of the line between their endpoints
/// are removed. A tolerance of 0.0 preserves all points. The first and
/// last points are always kept.
///
/// Polylines with fewer than 3 points are returned unchanged (nothing
/// to simplify).
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 {
        return polyline.clone();
    }

    let kept = rdp_keep_mask(points, tolerance);

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polyline::new(simplified)
}

/// Simplify an implicitly closed contour.
///
/// The loop is opened at its first point (which is appended as the end
/// point), simplified with [`simplify`], and the duplicate end removed
/// again, so the result is implicitly closed like the input.
#[must_use = "returns the simplified contour"]
pub fn simplify_closed(contour: &Polyline, tolerance: f64) -> Polyline {
    let mut points = simplify(&contour.closed(), tolerance).into_points();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polyline::new(points)
}

/// Simplify multiple closed contours, applying RDP to each independently.
#[must_use = "returns the simplified contours"]
pub fn simplify_paths(contours: &[Polyline], tolerance: f64) -> Vec<Polyline> {
    contours
        .iter()
        .map(|c| simplify_closed(c, tolerance))
        .collect()
}

/// Which points of `points` survive simplification.
///
/// Each stack entry is a `(start, end)` index pair whose endpoints are
/// already kept. The farthest interior point from the chord is kept if
/// it lies beyond `tolerance`, and both halves are pushed.
fn rdp_keep_mask(points: &[Point], tolerance: f64) -> Vec<bool> {
    let last = points.len() - 1;
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[last] = true;

    let mut stack = vec![(0, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;
        for i in (start + 1)..end {
            let d = perpendicular_distance(points[i], points[start], points[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist > tolerance {
            kept[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    kept
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

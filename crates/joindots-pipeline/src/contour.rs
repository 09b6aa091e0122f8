//! Contour tracing: extract ordered boundary polylines from a binary mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime. Traced contours are implicitly closed: the walk ends where
//! it started and the closing edge is not repeated.
//!
//! Siblings, holes, and separate objects are all traced the same way;
//! no hierarchy between contours is recorded.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::types::{BACKGROUND, BinaryMask, Point, Polyline};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContourTracerKind {
    /// Moore-neighborhood boundary following with a visited-pixel grid.
    #[default]
    Moore,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (non-zero = foreground).
/// Output: one ordered polyline per traced boundary, in scan order.
pub trait ContourTracer {
    /// Trace every boundary in the mask.
    fn trace(&self, mask: &BinaryMask) -> Vec<Polyline>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &BinaryMask) -> Vec<Polyline> {
        match *self {
            Self::Moore => trace_moore(mask),
        }
    }
}

/// The 8-neighborhood, clockwise on screen (y grows downward),
/// starting east.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Foreground lookup over a mask. Outside the image is background.
struct Occupancy(Grid<bool>);

impl Occupancy {
    fn new(mask: &BinaryMask) -> Self {
        Self(Grid::from_fn(mask.width(), mask.height(), |x, y| {
            mask.get_pixel(x, y).0[0] != BACKGROUND
        }))
    }

    fn is_foreground(&self, x: i64, y: i64) -> bool {
        self.0.get(x, y).copied().unwrap_or(false)
    }

    /// Index of the first background neighbor in [`DIRECTIONS`] order.
    fn first_background_neighbor(&self, x: i64, y: i64) -> Option<usize> {
        DIRECTIONS
            .iter()
            .position(|&(dx, dy)| !self.is_foreground(x + dx, y + dy))
    }
}

/// Backtrack direction, relative to the pixel just entered, after a
/// step in direction `dir`.
///
/// The backtrack is the background neighbor examined immediately before
/// the step was found. Seen from the new pixel it sits two steps
/// counter-clockwise of the reverse direction after a straight move and
/// three after a diagonal one.
const fn backtrack_after(dir: usize) -> usize {
    if dir % 2 == 0 {
        (dir + 6) % 8
    } else {
        (dir + 5) % 8
    }
}

/// Moore boundary tracing over every unvisited boundary pixel.
///
/// A boundary pixel is a foreground pixel with at least one background
/// 8-neighbor. Each trace starts at such a pixel, searches clockwise
/// from its first background neighbor, and stops on returning to the
/// start pixel or after `width * height` steps.
fn trace_moore(mask: &BinaryMask) -> Vec<Polyline> {
    let occupancy = Occupancy::new(mask);
    let mut visited = Grid::filled(mask.width(), mask.height(), false);
    let step_cap = usize::try_from(u64::from(mask.width()) * u64::from(mask.height()))
        .unwrap_or(usize::MAX);
    let mut contours = Vec::new();

    for y in 0..i64::from(mask.height()) {
        for x in 0..i64::from(mask.width()) {
            if !occupancy.is_foreground(x, y) || visited.get(x, y).copied().unwrap_or(true) {
                continue;
            }
            let Some(back) = occupancy.first_background_neighbor(x, y) else {
                continue;
            };
            let points = follow_boundary(&occupancy, &mut visited, (x, y), back, step_cap);
            contours.push(Polyline::new(points));
        }
    }

    contours
}

/// Walk one boundary starting at `start` with its backtrack neighbor in
/// direction `back`.
#[allow(clippy::cast_precision_loss)]
fn follow_boundary(
    occupancy: &Occupancy,
    visited: &mut Grid<bool>,
    start: (i64, i64),
    mut back: usize,
    step_cap: usize,
) -> Vec<Point> {
    let (mut x, mut y) = start;
    let mut points = Vec::new();

    for _ in 0..step_cap {
        visited.set(x, y, true);
        points.push(Point::new(x as f64, y as f64));

        let next = (1..8).map(|i| (back + i) % 8).find(|&dir| {
            let (dx, dy) = DIRECTIONS[dir];
            occupancy.is_foreground(x + dx, y + dy)
        });
        let Some(dir) = next else {
            // Isolated pixel.
            break;
        };

        // A diagonal step cuts the corner pixel on the inside. It touches
        // background only diagonally, so mark it to keep it from seeding
        // a duplicate trace of this same boundary.
        if dir % 2 == 1 {
            let (cx, cy) = DIRECTIONS[(dir + 1) % 8];
            if occupancy.is_foreground(x + cx, y + cy) {
                visited.set(x + cx, y + cy, true);
            }
        }

        let (dx, dy) = DIRECTIONS[dir];
        x += dx;
        y += dy;
        back = backtrack_after(dir);

        if (x, y) == start {
            break;
        }
    }

    points
}

/// Drop contours shorter than `min_points` and uniformly subsample those
/// longer than `max_points`.
///
/// A `max_points` of 0 disables the cap.
#[must_use = "returns the pruned contours"]
pub fn prune(contours: Vec<Polyline>, min_points: usize, max_points: usize) -> Vec<Polyline> {
    contours
        .into_iter()
        .filter(|c| c.len() >= min_points.max(1))
        .map(|c| {
            if max_points == 0 || c.len() <= max_points {
                c
            } else {
                subsample_uniform(&c, max_points)
            }
        })
        .collect()
}

/// Keep `count` points at evenly spaced indices, starting with the first.
fn subsample_uniform(contour: &Polyline, count: usize) -> Polyline {
    let points = contour.points();
    let len = points.len();
    Polyline::new(
        (0..count)
            .filter_map(|i| points.get(i * len / count).copied())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FOREGROUND;

    fn filled_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> BinaryMask {
        BinaryMask::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                image::Luma([FOREGROUND])
            } else {
                image::Luma([BACKGROUND])
            }
        })
    }

    #[test]
    fn default_is_moore() {
        assert_eq!(ContourTracerKind::default(), ContourTracerKind::Moore);
    }

    #[test]
    fn backtrack_table_points_at_examined_neighbor() {
        for dir in 0..8 {
            // The backtrack seen from the new pixel equals the neighbor
            // examined just before `dir`, seen from the old pixel.
            let (sx, sy) = DIRECTIONS[dir];
            let (bx, by) = DIRECTIONS[(dir + 7) % 8];
            let (rx, ry) = DIRECTIONS[backtrack_after(dir)];
            assert_eq!((sx + rx, sy + ry), (bx, by), "dir {dir}");
        }
    }

    #[test]
    fn empty_mask_produces_no_contours() {
        let mask = BinaryMask::new(10, 10);
        assert!(ContourTracerKind::Moore.trace(&mask).is_empty());
    }

    #[test]
    fn isolated_pixel_is_single_point_contour() {
        let mut mask = BinaryMask::new(10, 10);
        mask.put_pixel(5, 5, image::Luma([FOREGROUND]));
        let contours = ContourTracerKind::Moore.trace(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[Point::new(5.0, 5.0)]);
    }

    #[test]
    fn filled_square_traces_its_border_once() {
        let mask = filled_rect(20, 20, 5, 5, 15, 15);
        let contours = ContourTracerKind::Moore.trace(&mask);
        assert_eq!(contours.len(), 1, "interior pixels are never boundary");

        let outline = &contours[0];
        // 10x10 square: 36 border pixels, each visited once.
        assert_eq!(outline.len(), 36);
        assert_eq!(outline.first(), Some(&Point::new(5.0, 5.0)));
        assert!((outline.perimeter() - 36.0).abs() < 1e-9);
        for p in outline.points() {
            let on_border = p.x == 5.0 || p.x == 14.0 || p.y == 5.0 || p.y == 14.0;
            assert!(on_border, "{p:?} is not on the square border");
        }
    }

    #[test]
    fn trace_walks_clockwise_on_screen() {
        let mask = filled_rect(20, 20, 5, 5, 15, 15);
        let outline = &ContourTracerKind::Moore.trace(&mask)[0];
        // From the top-left corner the walk heads east along the top edge.
        assert_eq!(outline.points()[1], Point::new(6.0, 5.0));
    }

    #[test]
    fn consecutive_points_are_8_connected() {
        let mask = BinaryMask::from_fn(40, 40, |x, y| {
            let dx = f64::from(x) - 20.0;
            let dy = f64::from(y) - 20.0;
            if dx.hypot(dy) < 12.0 {
                image::Luma([FOREGROUND])
            } else {
                image::Luma([BACKGROUND])
            }
        });
        let contours = ContourTracerKind::Moore.trace(&mask);
        assert_eq!(contours.len(), 1, "corner pixels must not seed new traces");
        for w in contours[0].points().windows(2) {
            assert!((w[0].x - w[1].x).abs() <= 1.0);
            assert!((w[0].y - w[1].y).abs() <= 1.0);
        }
    }

    #[test]
    fn separate_blobs_give_separate_contours() {
        let mask = BinaryMask::from_fn(40, 20, |x, y| {
            let left = (3..10).contains(&x) && (3..10).contains(&y);
            let right = (25..35).contains(&x) && (5..15).contains(&y);
            image::Luma([if left || right { FOREGROUND } else { BACKGROUND }])
        });
        assert_eq!(ContourTracerKind::Moore.trace(&mask).len(), 2);
    }

    #[test]
    fn ring_traces_outer_and_inner_boundaries() {
        let mask = BinaryMask::from_fn(30, 30, |x, y| {
            let outer = (5..25).contains(&x) && (5..25).contains(&y);
            let hole = (10..20).contains(&x) && (10..20).contains(&y);
            image::Luma([if outer && !hole { FOREGROUND } else { BACKGROUND }])
        });
        let contours = ContourTracerKind::Moore.trace(&mask);
        assert!(contours.len() >= 2, "got {}", contours.len());
    }

    #[test]
    fn image_border_counts_as_background() {
        let mask = filled_rect(6, 6, 0, 0, 6, 6);
        let contours = ContourTracerKind::Moore.trace(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 20);
    }

    #[test]
    fn prune_drops_short_and_caps_long() {
        let short = Polyline::new(vec![Point::new(0.0, 0.0); 3]);
        let long = Polyline::new((0..100).map(|i| Point::new(f64::from(i), 0.0)).collect());
        let pruned = prune(vec![short, long], 5, 10);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].len(), 10);
        assert_eq!(pruned[0].first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(pruned[0].points()[1], Point::new(10.0, 0.0));
    }

    #[test]
    fn prune_without_cap_keeps_everything_long_enough() {
        let long = Polyline::new((0..100).map(|i| Point::new(f64::from(i), 0.0)).collect());
        let pruned = prune(vec![long], 2, 0);
        assert_eq!(pruned[0].len(), 100);
    }
}

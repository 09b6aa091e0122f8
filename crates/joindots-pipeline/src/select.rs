//! Contour selection: keep the few boundaries that explain most of the
//! traced outline length.

use crate::types::{Dimensions, Point, Polyline};

/// Parameters for [`select_contours`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionLimits {
    /// Contours with a smaller perimeter are discarded as noise.
    pub min_perimeter: f64,
    /// Stop after keeping this many contours.
    pub max_contours: usize,
    /// Stop once the kept perimeter exceeds this fraction of the total.
    pub coverage: f64,
}

/// Result of contour selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Kept contours, longest perimeter first.
    pub contours: Vec<Polyline>,
    /// Number of contours that passed the perimeter filter.
    pub candidates: usize,
    /// Sum of candidate perimeters.
    pub total_perimeter: f64,
    /// Sum of kept perimeters.
    pub kept_perimeter: f64,
    /// Whether the synthetic border rectangle was substituted.
    pub fallback: bool,
}

/// Rectangle through the four corner pixels of a `canvas`-sized image.
///
/// Substituted when nothing else survives selection, so the pipeline
/// always has an outline to place dots on.
#[must_use]
pub fn border_rectangle(canvas: Dimensions) -> Polyline {
    let right = f64::from(canvas.width.saturating_sub(1));
    let bottom = f64::from(canvas.height.saturating_sub(1));
    Polyline::new(vec![
        Point::new(0.0, 0.0),
        Point::new(right, 0.0),
        Point::new(right, bottom),
        Point::new(0.0, bottom),
    ])
}

/// Rank contours by perimeter and keep the dominant ones.
///
/// Contours below `min_perimeter` are dropped. The rest are sorted by
/// perimeter, longest first, and kept greedily until either
/// `max_contours` are kept or the kept perimeter exceeds `coverage` of
/// the candidate total. With no candidates, [`border_rectangle`] of
/// `canvas` is returned instead.
#[must_use = "returns the selected contours"]
pub fn select_contours(
    contours: Vec<Polyline>,
    limits: &SelectionLimits,
    canvas: Dimensions,
) -> Selection {
    let mut ranked: Vec<(f64, Polyline)> = contours
        .into_iter()
        .map(|c| (c.perimeter(), c))
        .filter(|(perimeter, _)| *perimeter >= limits.min_perimeter)
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let candidates = ranked.len();
    let total_perimeter: f64 = ranked.iter().map(|(p, _)| p).sum();

    if ranked.is_empty() {
        let rect = border_rectangle(canvas);
        let perimeter = rect.perimeter();
        return Selection {
            contours: vec![rect],
            candidates: 0,
            total_perimeter: 0.0,
            kept_perimeter: perimeter,
            fallback: true,
        };
    }

    let target = total_perimeter * limits.coverage;
    let mut kept = Vec::new();
    let mut kept_perimeter = 0.0;
    for (perimeter, contour) in ranked {
        if kept.len() >= limits.max_contours || kept_perimeter > target {
            break;
        }
        kept_perimeter += perimeter;
        kept.push(contour);
    }

    Selection {
        contours: kept,
        candidates,
        total_perimeter,
        kept_perimeter,
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: f64, side: f64) -> Polyline {
        Polyline::new(vec![
            Point::new(origin, origin),
            Point::new(origin + side, origin),
            Point::new(origin + side, origin + side),
            Point::new(origin, origin + side),
        ])
    }

    const LIMITS: SelectionLimits = SelectionLimits {
        min_perimeter: 24.0,
        max_contours: 30,
        coverage: 0.85,
    };

    #[test]
    fn empty_input_substitutes_border_rectangle() {
        let selection = select_contours(Vec::new(), &LIMITS, Dimensions::new(100, 50));
        assert!(selection.fallback);
        assert_eq!(selection.contours.len(), 1);
        assert_eq!(selection.contours[0], border_rectangle(Dimensions::new(100, 50)));
        assert!((selection.kept_perimeter - 2.0 * (99.0 + 49.0)).abs() < 1e-9);
    }

    #[test]
    fn tiny_contours_alone_trigger_fallback() {
        let selection = select_contours(vec![square(0.0, 2.0)], &LIMITS, Dimensions::new(10, 10));
        assert!(selection.fallback);
    }

    #[test]
    fn contours_are_sorted_longest_first() {
        let selection = select_contours(
            vec![square(0.0, 10.0), square(0.0, 40.0), square(0.0, 20.0)],
            &SelectionLimits {
                coverage: 1.0,
                ..LIMITS
            },
            Dimensions::new(100, 100),
        );
        let perimeters: Vec<f64> = selection.contours.iter().map(Polyline::perimeter).collect();
        assert_eq!(perimeters, vec![160.0, 80.0, 40.0]);
        assert_eq!(selection.candidates, 3);
    }

    #[test]
    fn stops_once_coverage_is_exceeded() {
        // Perimeters 400, 40, 40, 40: the first alone is 76.9% of 520,
        // the second pushes it to 84.6%, the third to 92.3%.
        let contours = vec![
            square(0.0, 100.0),
            square(0.0, 10.0),
            square(1.0, 10.0),
            square(2.0, 10.0),
        ];
        let selection = select_contours(contours, &LIMITS, Dimensions::new(200, 200));
        assert_eq!(selection.contours.len(), 3);
        assert!(selection.kept_perimeter > 0.85 * selection.total_perimeter);
    }

    #[test]
    fn stops_at_max_contours() {
        let contours: Vec<Polyline> = (0..50).map(|i| square(f64::from(i), 10.0)).collect();
        let selection = select_contours(contours, &LIMITS, Dimensions::new(200, 200));
        assert_eq!(selection.contours.len(), 30);
    }
}

//! Bounded 2D grid with checked, signed indexing.
//!
//! Neighbor searches step one pixel in each direction and routinely
//! land outside the image. [`Grid`] takes signed coordinates and
//! returns `None` out of bounds so callers never compute a raw index.

/// A `width x height` grid of cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        let len = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![value; len],
        }
    }
}

impl<T> Grid<T> {
    /// Create a grid by evaluating `f(x, y)` for every cell.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let mut cells =
            Vec::with_capacity(usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0));
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major index of `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        usize::try_from(y * i64::from(self.width) + x).ok()
    }

    /// The cell at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        self.index(x, y).and_then(|i| self.cells.get(i))
    }

    /// Mutable access to the cell at `(x, y)`, or `None` outside the grid.
    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut T> {
        self.index(x, y).and_then(|i| self.cells.get_mut(i))
    }

    /// Overwrite the cell at `(x, y)`. Returns `false` (and does
    /// nothing) outside the grid.
    pub fn set(&mut self, x: i64, y: i64, value: T) -> bool {
        self.get_mut(x, y).map(|cell| *cell = value).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads_are_none() {
        let grid = Grid::filled(3, 2, 0u8);
        assert!(grid.get(-1, 0).is_none());
        assert!(grid.get(0, -1).is_none());
        assert!(grid.get(3, 0).is_none());
        assert!(grid.get(0, 2).is_none());
        assert_eq!(grid.get(2, 1), Some(&0));
    }

    #[test]
    fn set_and_get_round_trip_in_bounds_only() {
        let mut grid = Grid::filled(4, 4, false);
        assert!(grid.set(1, 2, true));
        assert!(!grid.set(4, 0, true));
        assert_eq!(grid.get(1, 2), Some(&true));
        assert_eq!(grid.get(2, 1), Some(&false));
    }

    #[test]
    fn from_fn_is_row_major() {
        let grid = Grid::from_fn(3, 2, |x, y| x + 10 * y);
        assert_eq!(grid.get(2, 0), Some(&2));
        assert_eq!(grid.get(0, 1), Some(&10));
        assert_eq!(grid.index(1, 1), Some(4));
    }

    #[test]
    fn empty_grid_has_no_cells() {
        let grid = Grid::filled(0, 5, 1u8);
        assert!(grid.get(0, 0).is_none());
    }
}

//! Dense board-shaped containers
//!
//! `Grid<T>` stores one value per board position in row-major order. Numeric
//! grids get an elementwise algebra, and every grid supports a multi-source
//! worklist propagation used to build distance and danger fields.

use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

use crate::types::Coord;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    height: usize,
    width: usize,
    values: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Grid with every cell set to `value`
    pub fn filled(height: usize, width: usize, value: T) -> Self {
        Grid {
            height,
            width,
            values: vec![value; height * width],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn contains(&self, at: Coord) -> bool {
        at.row >= 0 && at.col >= 0 && (at.row as usize) < self.height && (at.col as usize) < self.width
    }

    pub fn get(&self, at: Coord) -> Option<&T> {
        if self.contains(at) {
            Some(&self.values[self.offset(at)])
        } else {
            None
        }
    }

    /// Every board coordinate in row-major order
    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        let width = self.width;
        (0..self.height * self.width).map(move |i| Coord::new((i / width) as i32, (i % width) as i32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, &T)> {
        self.coords().zip(self.values.iter())
    }

    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            height: self.height,
            width: self.width,
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Combines two equally-shaped grids cell by cell
    pub fn zip_with<U, V, F>(&self, other: &Grid<U>, mut f: F) -> Grid<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        debug_assert_eq!((self.height, self.width), (other.height, other.width));
        Grid {
            height: self.height,
            width: self.width,
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }

    /// Multi-source worklist relaxation.
    ///
    /// Seeds are written and queued first. Each dequeued cell is handed to
    /// `relax` together with a [`Relaxation`] handle; every value emitted
    /// through the handle is stored immediately and its cell re-queued. The
    /// loop ends when the queue drains, so `relax` must only emit values that
    /// make progress towards a fixed point.
    pub fn propagate<I, F>(&mut self, seeds: I, mut relax: F)
    where
        I: IntoIterator<Item = (Coord, T)>,
        F: FnMut(Coord, &mut Relaxation<'_, T>),
    {
        let mut queue = VecDeque::new();
        for (at, value) in seeds {
            self[at] = value;
            queue.push_back(at);
        }

        while let Some(current) = queue.pop_front() {
            let mut relaxation = Relaxation {
                grid: &mut *self,
                queue: &mut queue,
            };
            relax(current, &mut relaxation);
        }
    }

    fn offset(&self, at: Coord) -> usize {
        debug_assert!(self.contains(at), "{:?} outside {}x{} grid", at, self.height, self.width);
        at.row as usize * self.width + at.col as usize
    }
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(height: usize, width: usize) -> Self {
        Self::filled(height, width, T::default())
    }
}

impl<T: Clone> Index<Coord> for Grid<T> {
    type Output = T;

    fn index(&self, at: Coord) -> &T {
        &self.values[self.offset(at)]
    }
}

impl<T: Clone> IndexMut<Coord> for Grid<T> {
    fn index_mut(&mut self, at: Coord) -> &mut T {
        let offset = self.offset(at);
        &mut self.values[offset]
    }
}

/// Handle given to a propagation's relax function
pub struct Relaxation<'a, T> {
    grid: &'a mut Grid<T>,
    queue: &'a mut VecDeque<Coord>,
}

impl<'a, T: Clone> Relaxation<'a, T> {
    /// Current values, including everything emitted so far
    pub fn grid(&self) -> &Grid<T> {
        &*self.grid
    }

    /// Stores `value` at `at` and schedules `at` for relaxation
    pub fn emit(&mut self, at: Coord, value: T) {
        self.grid[at] = value;
        self.queue.push_back(at);
    }
}

impl Grid<f64> {
    pub fn add(&self, other: &Grid<f64>) -> Grid<f64> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Grid<f64>) -> Grid<f64> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn scale(&self, factor: f64) -> Grid<f64> {
        self.map(|v| v * factor)
    }

    pub fn max_with(&self, other: &Grid<f64>) -> Grid<f64> {
        self.zip_with(other, |a, b| a.max(*b))
    }

    pub fn min_with(&self, other: &Grid<f64>) -> Grid<f64> {
        self.zip_with(other, |a, b| a.min(*b))
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Rescales so the mean becomes `target`. A zero-mean grid cannot be
    /// rescaled and comes back as all zeros.
    pub fn normalized(&self, target: f64) -> Grid<f64> {
        let mean = self.mean();
        if mean == 0.0 {
            return self.map(|_| 0.0);
        }
        self.scale(target / mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_row_major() {
        let mut grid: Grid<i32> = Grid::new(3, 4);
        grid[Coord::new(1, 2)] = 7;
        assert_eq!(grid.values[6], 7);
        assert_eq!(grid.get(Coord::new(1, 2)), Some(&7));
        assert_eq!(grid.get(Coord::new(3, 0)), None);
        assert_eq!(grid.get(Coord::new(0, -1)), None);
    }

    #[test]
    fn test_coords_cover_board() {
        let grid: Grid<u8> = Grid::new(2, 3);
        let coords: Vec<Coord> = grid.coords().collect();
        assert_eq!(coords.len(), 6);
        assert_eq!(coords[0], Coord::new(0, 0));
        assert_eq!(coords[5], Coord::new(1, 2));
    }

    #[test]
    fn test_elementwise_algebra() {
        let a = Grid::filled(2, 2, 3.0);
        let mut b = Grid::filled(2, 2, 1.0);
        b[Coord::new(0, 0)] = 5.0;

        assert_eq!(a.add(&b)[Coord::new(0, 0)], 8.0);
        assert_eq!(a.sub(&b)[Coord::new(1, 1)], 2.0);
        assert_eq!(a.scale(0.5)[Coord::new(1, 0)], 1.5);
        assert_eq!(a.max_with(&b)[Coord::new(0, 0)], 5.0);
        assert_eq!(a.min_with(&b)[Coord::new(0, 0)], 3.0);
        assert_eq!(a.min_with(&b)[Coord::new(0, 1)], 1.0);
    }

    #[test]
    fn test_normalized_mean() {
        let mut grid = Grid::filled(2, 2, 0.0);
        grid[Coord::new(0, 0)] = 4.0;
        let normalized = grid.normalized(1.0);
        assert!((normalized.mean() - 1.0).abs() < 1e-12);
        assert_eq!(normalized[Coord::new(0, 0)], 4.0);
    }

    #[test]
    fn test_normalized_zero_grid_stays_zero() {
        let grid = Grid::filled(2, 2, 0.0);
        assert_eq!(grid.normalized(1.0), grid);
    }

    #[test]
    fn test_propagate_breadth_first_distances() {
        let mut grid = Grid::filled(3, 3, -1);
        grid.propagate(vec![(Coord::new(0, 0), 0)], |at, relaxation| {
            let here = relaxation.grid()[at];
            for next in at.neighbours().iter() {
                if relaxation.grid().get(*next) == Some(&-1) {
                    relaxation.emit(*next, here + 1);
                }
            }
        });

        assert_eq!(grid[Coord::new(0, 0)], 0);
        assert_eq!(grid[Coord::new(1, 1)], 2);
        assert_eq!(grid[Coord::new(2, 2)], 4);
    }

    #[test]
    fn test_propagate_multiple_seeds() {
        let mut grid = Grid::filled(1, 5, -1);
        let seeds = vec![(Coord::new(0, 0), 0), (Coord::new(0, 4), 0)];
        grid.propagate(seeds, |at, relaxation| {
            let here = relaxation.grid()[at];
            for next in at.neighbours().iter() {
                if relaxation.grid().get(*next) == Some(&-1) {
                    relaxation.emit(*next, here + 1);
                }
            }
        });

        assert_eq!(grid[Coord::new(0, 2)], 2);
        assert_eq!(grid[Coord::new(0, 3)], 1);
    }
}

//! Двумерная сетка значений (row-major)

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{MapError, Result};

/// Двумерная сетка `rows × cols`, хранимая построчно
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MapError::ShapeMismatch {
                expected: (rows, cols),
                actual: (data.len() / cols.max(1), cols),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Строит сетку поэлементно. С фичей `parallel` строки считаются через rayon;
    /// `f` должна быть чистой функцией координат.
    pub fn from_fn<F>(rows: usize, cols: usize, f: F) -> Self
    where
        T: Send,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        let data = (0..rows * cols)
            .into_par_iter()
            .map(|idx| f(idx / cols, idx % cols))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let data = (0..rows * cols).map(|idx| f(idx / cols, idx % cols)).collect();
        Self { rows, cols, data }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }

    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Проверяет, что у двух сеток одинаковая форма
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> Result<()> {
        if self.shape() == other.shape() {
            Ok(())
        } else {
            Err(MapError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            })
        }
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

impl<T: Copy> Grid<T> {
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }
}

impl Grid<f64> {
    /// Минимум и максимум; `None` для пустой сетки
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        if self.data.is_empty() {
            return None;
        }
        let min = self.data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

/// `n` равноотстоящих точек на `[start, stop)` (правый конец не входит)
#[must_use]
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / n.max(1) as f64;
    (0..n).map(|k| start + step * k as f64).collect()
}

/// Координатные сетки `(X, Y)` формы `ys.len() × xs.len()`
#[must_use]
pub fn meshgrid(xs: &[f64], ys: &[f64]) -> (Grid<f64>, Grid<f64>) {
    let rows = ys.len();
    let cols = xs.len();
    let mut x_grid = Vec::with_capacity(rows * cols);
    let mut y_grid = Vec::with_capacity(rows * cols);
    for &y in ys {
        for &x in xs {
            x_grid.push(x);
            y_grid.push(y);
        }
    }
    (
        Grid {
            rows,
            cols,
            data: x_grid,
        },
        Grid {
            rows,
            cols,
            data: y_grid,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_excludes_endpoint() {
        assert_eq!(linspace(0.0, 4.0, 4), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_meshgrid_layout() {
        let (x, y) = meshgrid(&[0.0, 1.0, 2.0], &[10.0, 20.0]);
        assert_eq!(x.shape(), (2, 3));
        assert_eq!(x.at(1, 2), 2.0);
        assert_eq!(y.at(1, 2), 20.0);
        assert_eq!(y.at(0, 0), 10.0);
    }

    #[test]
    fn test_from_fn_matches_indices() {
        let g = Grid::from_fn(3, 4, |i, j| i * 10 + j);
        assert_eq!(g.at(2, 3), 23);
        assert_eq!(g.row(1), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(Grid::from_vec(2, 2, vec![1, 2, 3]).is_err());
        assert!(Grid::from_vec(2, 2, vec![1, 2, 3, 4]).is_ok());
    }
}

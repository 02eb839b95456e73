//! Градиентный шум (Perlin) на сетке ячеек
//!
//! Отличие от классического шума Перлина: длина градиентного вектора тоже случайна
//! (равномерно на `[0, 1)`), векторы не нормируются.

use std::f64::consts::TAU;

use crate::error::{MapError, Result};
use crate::grid::Grid;
use crate::random::RandomStream;

/// Генератор двумерного градиентного шума с разрешением `cells` ячеек
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Perlin2d {
    pub cells: (usize, usize),
    pub seed: u32,
}

/// Таблица градиентов размера `(cx + 2) × (cy + 2)`, индекс `[a][b]` по осям x, y
struct GradientTable {
    stride: usize,
    gradx: Vec<f64>,
    grady: Vec<f64>,
}

impl GradientTable {
    fn draw(rng: &mut dyn RandomStream, cells: (usize, usize)) -> Self {
        let nx = cells.0 + 2;
        let ny = cells.1 + 2;
        let magnitudes = rng.next_uniform_vec(nx * ny);
        let angles = rng.next_uniform_vec(nx * ny);
        let gradx = magnitudes
            .iter()
            .zip(&angles)
            .map(|(m, a)| m * (TAU * a).cos())
            .collect();
        let grady = magnitudes
            .iter()
            .zip(&angles)
            .map(|(m, a)| m * (TAU * a).sin())
            .collect();
        Self {
            stride: ny,
            gradx,
            grady,
        }
    }

    #[inline]
    fn dot(&self, a: usize, b: usize, dx: f64, dy: f64) -> f64 {
        let idx = a * self.stride + b;
        self.gradx[idx] * dx + self.grady[idx] * dy
    }

    fn point_altitude(&self, x: f64, y: f64) -> f64 {
        let x0 = x as usize;
        let y0 = y as usize;
        let x1 = x0 + 1;
        let y1 = y0 + 1;
        let fx0 = x - x0 as f64;
        let fy0 = y - y0 as f64;
        let fx1 = x - x1 as f64;
        let fy1 = y - y1 as f64;
        let wx = fade(fx0);
        let wy = fade(fy0);

        (1.0 - wx) * (1.0 - wy) * self.dot(x0, y0, fx0, fy0)
            + wx * (1.0 - wy) * self.dot(x1, y0, fx1, fy0)
            + (1.0 - wx) * wy * self.dot(x0, y1, fx0, fy1)
            + wx * wy * self.dot(x1, y1, fx1, fy1)
    }
}

/// Квинтическое сглаживание `6t^5 - 15t^4 + 10t^3`
#[inline]
#[must_use]
pub fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Переводит координаты в индексное пространство `[0, cells]`
fn rescale(values: &Grid<f64>, cells: usize) -> Grid<f64> {
    let (min, max) = values.min_max().unwrap_or((0.0, 0.0));
    let span = max - min;
    if span > 0.0 {
        values.map(|v| (v - min) / span * cells as f64)
    } else {
        values.map(|_| 0.0)
    }
}

impl Perlin2d {
    pub fn new(cells: (usize, usize), seed: u32) -> Result<Self> {
        if cells.0 == 0 || cells.1 == 0 {
            return Err(MapError::config(format!(
                "perlin cells must be positive, got {cells:?}"
            )));
        }
        Ok(Self { cells, seed })
    }

    /// Значение шума в каждой точке сеток `x`, `y`.
    ///
    /// Перед вытягиванием градиентов поток пересеивается сидом шума,
    /// поэтому повторный вызов даёт то же поле.
    pub fn sample(
        &self,
        rng: &mut dyn RandomStream,
        x: &Grid<f64>,
        y: &Grid<f64>,
    ) -> Result<Grid<f64>> {
        x.ensure_same_shape(y)?;
        let xr = rescale(x, self.cells.0);
        let yr = rescale(y, self.cells.1);

        rng.reseed(u64::from(self.seed));
        let table = GradientTable::draw(rng, self.cells);

        let noise = Grid::from_fn(x.rows, x.cols, |i, j| {
            table.point_altitude(xr.at(i, j), yr.at(i, j))
        });
        tracing::debug!(
            target: "mapmaker",
            seed = self.seed,
            cells = ?self.cells,
            rows = noise.rows,
            cols = noise.cols,
            "noise.generated"
        );
        Ok(noise)
    }
}

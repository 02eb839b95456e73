//! Каркас континентов
//!
//! Каждый континент задаётся контуром в полярных координатах вокруг центра:
//! `r(θ) = d/2 + w · Σ c_k · sin((k+1)θ)`. Каркас мира — объединение масок всех
//! континентов на сетке отсчётов.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::grid::Grid;
use crate::random::RandomStream;

/// Количество гармоник контура по умолчанию
pub const DEFAULT_EDGES: usize = 5;
/// Основание геометрического затухания гармоник
pub const DEFAULT_DECAY_BASE: f64 = 0.9;
/// Амплитуда волны относительно диаметра
pub const DEFAULT_WAVE_SCALE: f64 = 0.2;

/// Контур одного континента
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    pub name: String,
    pub xc: f64,
    pub yc: f64,
    pub diameter: f64,
    pub wave_height: f64,
    pub fourier: Vec<f64>,
}

impl Continent {
    pub fn new(
        name: impl Into<String>,
        center: (f64, f64),
        diameter: f64,
        wave_height: f64,
        fourier: Vec<f64>,
    ) -> Result<Self> {
        if diameter <= 0.0 || !diameter.is_finite() {
            return Err(MapError::config(format!(
                "continent diameter must be positive, got {diameter}"
            )));
        }
        Ok(Self {
            name: name.into(),
            xc: center.0,
            yc: center.1,
            diameter,
            wave_height,
            fourier,
        })
    }

    /// Радиус контура в направлении `theta`
    #[must_use]
    pub fn radius(&self, theta: f64) -> f64 {
        let wave: f64 = self
            .fourier
            .iter()
            .enumerate()
            .map(|(k, c)| c * ((k + 1) as f64 * theta).sin())
            .sum();
        0.5 * self.diameter + self.wave_height * wave
    }

    /// Лежит ли точка строго внутри контура
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (r, theta) = to_polar(x - self.xc, y - self.yc);
        r < self.radius(theta)
    }

    /// Маска континента на координатных сетках
    pub fn mask(&self, x: &Grid<f64>, y: &Grid<f64>) -> Result<Grid<bool>> {
        x.ensure_same_shape(y)?;
        Ok(Grid::from_fn(x.rows, x.cols, |i, j| {
            self.contains(x.at(i, j), y.at(i, j))
        }))
    }
}

/// Полярные координаты; в начале координат угол равен 0
fn to_polar(x: f64, y: f64) -> (f64, f64) {
    let r = x.hypot(y);
    let mut theta = 0.0;
    if r != 0.0 {
        theta = (x / r).clamp(-1.0, 1.0).acos();
    }
    if y < 0.0 {
        theta = -theta;
    }
    if y == 0.0 && x < 0.0 {
        theta = PI;
    }
    (r, theta)
}

/// Затухающие коэффициенты Фурье: `k`-я гармоника масштабируется на `base^(k+1)`
fn decayed_coefficients(draws: &[f64], base: f64) -> Vec<f64> {
    draws
        .iter()
        .zip(1..)
        .map(|(u, power)| u * base.powi(power))
        .collect()
}

/// Протяжённость мира и диапазоны размещения центров континентов
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    pub width: f64,
    pub height: f64,
    pub width_range: (f64, f64),
    pub height_range: (f64, f64),
}

/// Каркас мира: набор континентов и их объединённая маска
#[derive(Debug, Clone)]
pub struct WorldFrame {
    pub continents: Vec<Continent>,
    pub mask: Grid<bool>,
}

impl WorldFrame {
    /// Строит `count` континентов и их маску на сетке `x`, `y`.
    ///
    /// Поток не пересеивается: вызывающий отвечает за состояние `rng`.
    pub fn generate(
        rng: &mut dyn RandomStream,
        count: usize,
        layout: &FrameLayout,
        x: &Grid<f64>,
        y: &Grid<f64>,
    ) -> Result<Self> {
        let continents = match count {
            0 => Vec::new(),
            1 => vec![center_continent(rng, layout, DEFAULT_EDGES, DEFAULT_DECAY_BASE)?],
            n => random_continents(
                rng,
                layout,
                n,
                DEFAULT_EDGES,
                DEFAULT_DECAY_BASE,
                DEFAULT_WAVE_SCALE,
            )?,
        };
        Self::from_continents(continents, x, y)
    }

    /// Маска из готового списка континентов (пересечения просто насыщаются)
    pub fn from_continents(
        continents: Vec<Continent>,
        x: &Grid<f64>,
        y: &Grid<f64>,
    ) -> Result<Self> {
        x.ensure_same_shape(y)?;
        let mut mask = Grid::new(x.rows, x.cols, false);
        for continent in &continents {
            let part = continent.mask(x, y)?;
            for (cell, inside) in mask.data.iter_mut().zip(part.data) {
                *cell |= inside;
            }
        }
        tracing::debug!(
            target: "mapmaker",
            continents = continents.len(),
            land_cells = mask.data.iter().filter(|&&v| v).count(),
            "frame.generated"
        );
        Ok(Self { continents, mask })
    }
}

/// Единственный континент в центре мира
pub fn center_continent(
    rng: &mut dyn RandomStream,
    layout: &FrameLayout,
    edges: usize,
    base: f64,
) -> Result<Continent> {
    let center = (layout.width / 2.0, layout.height / 2.0);
    let half_min = center.0.min(center.1);
    let fourier = decayed_coefficients(&rng.next_uniform_vec(edges), base);
    Continent::new(
        "Random continent",
        center,
        half_min,
        DEFAULT_WAVE_SCALE * half_min,
        fourier,
    )
}

/// Несколько континентов со случайными центрами внутри заданных диапазонов.
///
/// Для каждого континента вытягивается блок из `2 × (edges + 4)` чисел:
/// первая строка даёт центр, диаметр и амплитуду (с конца), вторая — коэффициенты.
pub fn random_continents(
    rng: &mut dyn RandomStream,
    layout: &FrameLayout,
    number: usize,
    edges: usize,
    base: f64,
    wave_scale: f64,
) -> Result<Vec<Continent>> {
    let block = edges + 4;
    let (x0, x1) = layout.width_range;
    let (y0, y1) = layout.height_range;
    let mut continents = Vec::with_capacity(number);

    for i in 0..number {
        let shape = rng.next_uniform_vec(block);
        let harmonics = rng.next_uniform_vec(block);

        let xc = layout.width * (x0 + (x1 - x0) * shape[block - 1]);
        let yc = layout.height * (y0 + (y1 - y0) * shape[block - 2]);
        let edge_distance = xc
            .min(yc)
            .min(layout.width - xc)
            .min(layout.height - yc);
        let diameter = edge_distance * (0.5 * shape[block - 3] + 0.5);
        let wave = 2.0 * shape[block - 4] * wave_scale * diameter;
        let fourier = decayed_coefficients(&harmonics[..edges], base);

        continents.push(Continent::new(
            format!("Random continent {}", i + 1),
            (xc, yc),
            diameter,
            wave,
            fourier,
        )?);
    }
    Ok(continents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{linspace, meshgrid};
    use crate::random::{ChaChaStream, ScriptedStream};

    fn layout() -> FrameLayout {
        FrameLayout {
            width: 100.0,
            height: 80.0,
            width_range: (0.25, 0.75),
            height_range: (0.25, 0.75),
        }
    }

    #[test]
    fn test_circle_containment() {
        let c = Continent::new("disc", (10.0, 20.0), 6.0, 0.0, vec![0.3, 0.2]).unwrap();
        for r in [0.0, 1.0, 2.9, 2.999] {
            assert!(c.contains(10.0 + r, 20.0), "r = {r} should be inside");
            assert!(c.contains(10.0 - r, 20.0), "r = -{r} should be inside");
            assert!(c.contains(10.0, 20.0 + r));
        }
        for r in [3.001, 4.0, 50.0] {
            assert!(!c.contains(10.0 + r, 20.0), "r = {r} should be outside");
            assert!(!c.contains(10.0, 20.0 - r));
        }
    }

    #[test]
    fn test_polar_conventions() {
        assert_eq!(to_polar(0.0, 0.0), (0.0, 0.0));
        assert_eq!(to_polar(-2.0, 0.0).1, PI);
        assert!((to_polar(0.0, -1.0).1 + PI / 2.0).abs() < 1e-12);
        assert!((to_polar(0.0, 1.0).1 - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_radius_uses_harmonics() {
        let c = Continent::new("wavy", (0.0, 0.0), 2.0, 1.0, vec![0.5, 0.25]).unwrap();
        let theta = PI / 4.0;
        let expected = 1.0 + 0.5 * theta.sin() + 0.25 * (2.0 * theta).sin();
        assert!((c.radius(theta) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_diameter() {
        assert!(Continent::new("bad", (0.0, 0.0), 0.0, 0.0, vec![]).is_err());
        assert!(Continent::new("bad", (0.0, 0.0), -1.0, 0.0, vec![]).is_err());
    }

    #[test]
    fn test_higher_harmonics_decay() {
        let coeffs = decayed_coefficients(&[1.0, 1.0, 1.0], 0.5);
        assert_eq!(coeffs, vec![0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_center_continent_geometry() {
        let mut rng = ScriptedStream::constant(0.5);
        let c = center_continent(&mut rng, &layout(), 5, 0.9).unwrap();
        assert_eq!((c.xc, c.yc), (50.0, 40.0));
        assert_eq!(c.diameter, 40.0);
        assert!((c.wave_height - 8.0).abs() < 1e-12);
        assert_eq!(c.fourier.len(), 5);
    }

    #[test]
    fn test_random_continents_stay_inside_ranges() {
        let mut rng = ChaChaStream::new(7777);
        let continents = random_continents(&mut rng, &layout(), 6, 5, 0.9, 0.2).unwrap();
        assert_eq!(continents.len(), 6);
        for c in &continents {
            assert!((25.0..=75.0).contains(&c.xc));
            assert!((20.0..=60.0).contains(&c.yc));
            let edge = c.xc.min(c.yc).min(100.0 - c.xc).min(80.0 - c.yc);
            assert!(c.diameter <= edge && c.diameter >= 0.5 * edge);
            assert!(c.wave_height <= 0.4 * c.diameter);
        }
    }

    #[test]
    fn test_frame_is_union_of_masks() {
        let (x, y) = meshgrid(&linspace(0.0, 100.0, 50), &linspace(0.0, 80.0, 40));
        let a = Continent::new("a", (30.0, 40.0), 20.0, 0.0, vec![]).unwrap();
        let b = Continent::new("b", (38.0, 40.0), 20.0, 0.0, vec![]).unwrap();
        let frame = WorldFrame::from_continents(vec![a.clone(), b.clone()], &x, &y).unwrap();
        let ma = a.mask(&x, &y).unwrap();
        let mb = b.mask(&x, &y).unwrap();
        for idx in 0..frame.mask.data.len() {
            assert_eq!(frame.mask.data[idx], ma.data[idx] || mb.data[idx]);
        }
    }

    #[test]
    fn test_empty_frame() {
        let (x, y) = meshgrid(&linspace(0.0, 10.0, 5), &linspace(0.0, 10.0, 5));
        let frame = WorldFrame::generate(&mut ChaChaStream::new(1), 0, &layout(), &x, &y).unwrap();
        assert!(frame.continents.is_empty());
        assert!(frame.mask.data.iter().all(|v| !v));
    }
}

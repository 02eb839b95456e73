use crate::config::AltitudeParams;
use crate::continent::{Continent, FrameLayout, WorldFrame};
use crate::error::{MapError, Result};
use crate::grid::{Grid, linspace, meshgrid};
use crate::noise::Perlin2d;
use crate::random::{RandomStream, resolve_seed};

/// Нормированное гауссово ядро радиуса `⌈2σ⌉`, сумма значений равна 1
pub fn gaussian_kernel(sigma: f64) -> Result<Grid<f64>> {
    let weights = gaussian_weights(sigma)?;
    let size = weights.len();
    let mut kernel = Grid::from_fn(size, size, |i, j| weights[i] * weights[j]);
    let sum: f64 = kernel.data.iter().sum();
    for v in &mut kernel.data {
        *v /= sum;
    }
    Ok(kernel)
}

/// Одномерные нормированные веса; двумерное ядро — их внешнее произведение
fn gaussian_weights(sigma: f64) -> Result<Vec<f64>> {
    if sigma <= 0.0 || !sigma.is_finite() {
        return Err(MapError::config(format!("blur sigma must be positive, got {sigma}")));
    }
    let radius = (2.0 * sigma).ceil() as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-(k * k) as f64 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / sum).collect())
}

/// Размывает маску континентов гауссовым ядром (свёртка "same", за краем нули).
///
/// Ядро разделимо, поэтому свёртка делается двумя проходами: по строкам и по столбцам.
pub fn blur(mask: &Grid<bool>, sigma: f64) -> Result<Grid<f64>> {
    let weights = gaussian_weights(sigma)?;
    let radius = (weights.len() / 2) as isize;
    let rows = mask.rows as isize;
    let cols = mask.cols as isize;
    let field = mask.map(|&inside| if inside { 1.0 } else { 0.0 });

    // 1. Горизонтальный проход
    let horizontal = Grid::from_fn(mask.rows, mask.cols, |i, j| {
        let mut acc = 0.0;
        for (k, w) in weights.iter().enumerate() {
            let x = j as isize + k as isize - radius;
            if (0..cols).contains(&x) {
                acc += w * field.at(i, x as usize);
            }
        }
        acc
    });

    // 2. Вертикальный проход
    Ok(Grid::from_fn(mask.rows, mask.cols, |i, j| {
        let mut acc = 0.0;
        for (k, w) in weights.iter().enumerate() {
            let y = i as isize + k as isize - radius;
            if (0..rows).contains(&y) {
                acc += w * horizontal.at(y as usize, j);
            }
        }
        acc
    }))
}

/// `land_level · blurred + 2 · noise_level · noise`
pub fn compose(
    blurred: &Grid<f64>,
    noise: &Grid<f64>,
    land_level: f64,
    noise_level: f64,
) -> Result<Grid<f64>> {
    blurred.ensure_same_shape(noise)?;
    let data = blurred
        .data
        .iter()
        .zip(&noise.data)
        .map(|(b, n)| land_level * b + 2.0 * noise_level * n)
        .collect();
    Grid::from_vec(blurred.rows, blurred.cols, data)
}

/// Приводит поле к `[0, 1]`; для постоянного поля возвращает `FlatField`
pub fn normalize(field: &Grid<f64>) -> Result<Grid<f64>> {
    let (lowest, highest) = field.min_max().ok_or(MapError::FlatField(0.0))?;
    let span = highest - lowest;
    if span <= 0.0 || !span.is_finite() {
        return Err(MapError::FlatField(lowest));
    }
    Ok(field.map(|v| (v - lowest) / span))
}

/// Оставляет только высоту над уровнем моря: `x ≤ sea ? 0 : x − sea`
#[must_use]
pub fn clamp_to_land(field: &Grid<f64>, sea_level: f64) -> Grid<f64> {
    field.map(|&x| if x > sea_level { x - sea_level } else { 0.0 })
}

/// Карта высот со всеми промежуточными слоями
#[derive(Debug, Clone)]
pub struct AltitudeMap {
    pub name: String,
    pub seed: u32,
    pub params: AltitudeParams,
    pub frame: WorldFrame,
    /// Размытый каркас, умноженный на `land_level`
    pub continents: Grid<f64>,
    pub noise: Grid<f64>,
    /// Композиция до обрезки по уровню моря
    pub nonsea_map: Grid<f64>,
    /// Итоговое поле высот в `[0, 1]`
    pub map: Grid<f64>,
}

impl AltitudeMap {
    /// Генерирует карту высот: каркас → размытие → шум → (море) → нормализация
    pub fn generate(
        name: impl Into<String>,
        seed: Option<u32>,
        params: &AltitudeParams,
        rng: &mut dyn RandomStream,
    ) -> Result<Self> {
        params.validate()?;
        let seed = resolve_seed(seed);
        let (rows, cols) = params.grid_size();

        let xs = linspace(0.0, params.longitude_range, cols);
        let ys = linspace(0.0, params.latitude_range, rows);
        let (x, y) = meshgrid(&xs, &ys);

        let layout = FrameLayout {
            width: params.longitude_range,
            height: params.latitude_range,
            width_range: params.width_range,
            height_range: params.height_range,
        };
        rng.reseed(u64::from(seed));
        let frame = WorldFrame::generate(rng, params.continent_number, &layout, &x, &y)?;

        let continents = blur(&frame.mask, params.blur_sigma())?.map(|v| params.land_level * v);
        let noise = Perlin2d::new(params.perlin_cells, seed)?.sample(rng, &x, &y)?;
        let nonsea_map = compose(&continents, &noise, 1.0, params.noise_level)?;

        let map = if params.generate_sea {
            normalize(&clamp_to_land(&nonsea_map, params.sea_level))?
        } else {
            normalize(&nonsea_map)?
        };

        let altitude = Self {
            name: name.into(),
            seed,
            params: params.clone(),
            frame,
            continents,
            noise,
            nonsea_map,
            map,
        };
        tracing::debug!(
            target: "mapmaker",
            name = %altitude.name,
            seed,
            rows,
            cols,
            continents = altitude.frame.continents.len(),
            "altitude.generated"
        );
        Ok(altitude)
    }

    #[must_use]
    pub fn continents(&self) -> &[Continent] {
        &self.frame.continents
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.map.shape()
    }
}

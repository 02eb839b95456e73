//! Полировка растра: уточнение разрешения, выветривание, береговая линия

use crate::biome::{LandMask, TerrainClass, TerrainRaster, assign_plant, land_mask};
use crate::config::{PlantSettings, PolishSettings, check_weathering_intensity};
use crate::error::{MapError, Result};
use crate::grid::Grid;
use crate::random::RandomStream;

/// Повторяет каждую клетку блоком `factor × factor`
pub fn refine(raster: &TerrainRaster, factor: usize) -> Result<TerrainRaster> {
    if factor == 0 {
        return Err(MapError::config("refine factor must be positive"));
    }
    let rows = raster.rows * factor;
    let cols = raster.cols * factor;
    let mut data = Vec::with_capacity(rows * cols);
    for i in 0..raster.rows {
        let mut line = Vec::with_capacity(cols);
        for &code in raster.row(i) {
            line.extend(std::iter::repeat_n(code, factor));
        }
        for _ in 0..factor {
            data.extend_from_slice(&line);
        }
    }
    Grid::from_vec(rows, cols, data)
}

/// Случайно заменяет внутренние клетки значениями соседей.
///
/// Поток пересеивается `seed` и выдаёт блок `rows × cols × 2`. Для каждой внутренней
/// клетки первое число выбирает соседа по вертикали (> 1−p — южный, < p — северный),
/// второе — по горизонтали (> 1−p — восточный, < p — западный) и может перезаписать
/// первое. Все соседи читаются из исходного растра, изменения не каскадируются.
pub fn weather(
    raster: &TerrainRaster,
    intensity: f64,
    rng: &mut dyn RandomStream,
    seed: u32,
) -> Result<TerrainRaster> {
    check_weathering_intensity(intensity)?;
    let mut new_map = raster.clone();
    if raster.rows < 3 || raster.cols < 3 {
        return Ok(new_map);
    }

    rng.reseed(u64::from(seed));
    let randmat = rng.next_uniform_vec(raster.rows * raster.cols * 2);
    let mut changed = 0usize;
    for i in 1..raster.rows - 1 {
        for j in 1..raster.cols - 1 {
            let cell = 2 * raster.index(i, j);
            let (vertical, horizontal) = (randmat[cell], randmat[cell + 1]);
            let mut value = raster.at(i, j);
            if vertical > 1.0 - intensity {
                value = raster.at(i + 1, j);
            } else if vertical < intensity {
                value = raster.at(i - 1, j);
            }
            if horizontal > 1.0 - intensity {
                value = raster.at(i, j + 1);
            } else if horizontal < intensity {
                value = raster.at(i, j - 1);
            }
            if value != raster.at(i, j) {
                changed += 1;
            }
            new_map.set(i, j, value);
        }
    }
    tracing::debug!(target: "mapmaker", seed, intensity, changed, "raster.weathered");
    Ok(new_map)
}

/// Помечает внутренние клетки суши с хотя бы одним несухопутным соседом как `Boundary`.
///
/// Решение принимается только по переданной маске, поэтому перемаркировка одной
/// клетки не влияет на соседние в том же проходе.
pub fn extract_coastline(raster: &TerrainRaster, land: &LandMask) -> Result<TerrainRaster> {
    raster.ensure_same_shape(land)?;
    let mut new_map = raster.clone();
    if raster.rows < 3 || raster.cols < 3 {
        return Ok(new_map);
    }
    let boundary = TerrainClass::Boundary.code();
    for i in 1..raster.rows - 1 {
        for j in 1..raster.cols - 1 {
            if land.at(i, j)
                && !(land.at(i + 1, j)
                    && land.at(i - 1, j)
                    && land.at(i, j + 1)
                    && land.at(i, j - 1))
            {
                new_map.set(i, j, boundary);
            }
        }
    }
    Ok(new_map)
}

/// Изменяемая карта местности: растр, маска суши и счётчик уточнений
#[derive(Debug, Clone)]
pub struct TerrainMap {
    pub seed: u32,
    pub origin: TerrainRaster,
    pub raster: TerrainRaster,
    pub land: LandMask,
    /// Сколько раз вызывалось уточнение (не суммарный множитель)
    pub refinements: usize,
    /// Число уточнений исходного растра
    pub origin_refinements: usize,
    /// Растр после каждого шага полировки, если включено `keep_history`
    pub history: Vec<TerrainRaster>,
}

impl TerrainMap {
    #[must_use]
    pub fn new(raster: TerrainRaster, seed: u32) -> Self {
        Self::with_refinements(raster, seed, 0)
    }

    /// Карта, уже уточнённая `refinements` раз (например, загруженная из файла)
    #[must_use]
    pub fn with_refinements(raster: TerrainRaster, seed: u32, refinements: usize) -> Self {
        let land = land_mask(&raster);
        Self {
            seed,
            origin: raster.clone(),
            raster,
            land,
            refinements,
            origin_refinements: refinements,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    fn replace(&mut self, raster: TerrainRaster) {
        self.land = land_mask(&raster);
        self.raster = raster;
    }

    /// Возвращает растр к исходному состоянию
    pub fn recover_origin(&mut self) {
        self.replace(self.origin.clone());
        self.refinements = self.origin_refinements;
        self.history.clear();
    }

    pub fn assign_plant(
        &mut self,
        settings: &PlantSettings,
        rng: &mut dyn RandomStream,
    ) -> Result<()> {
        let planted = assign_plant(&self.raster, settings, rng, self.seed)?;
        self.replace(planted);
        Ok(())
    }

    pub fn refine(&mut self, factor: usize) -> Result<()> {
        let refined = refine(&self.raster, factor)?;
        self.replace(refined);
        self.refinements += 1;
        tracing::debug!(
            target: "mapmaker",
            refinements = self.refinements,
            rows = self.raster.rows,
            cols = self.raster.cols,
            "raster.refined"
        );
        Ok(())
    }

    pub fn weathering(&mut self, intensity: f64, rng: &mut dyn RandomStream) -> Result<()> {
        let weathered = weather(&self.raster, intensity, rng, self.seed)?;
        self.replace(weathered);
        Ok(())
    }

    pub fn coastline(&mut self) -> Result<()> {
        let coast = extract_coastline(&self.raster, &self.land)?;
        self.replace(coast);
        tracing::debug!(target: "mapmaker", "raster.coastline");
        Ok(())
    }

    /// Полная полировка: растительность, `times` раз уточнение + выветривание, берег
    pub fn polish(
        &mut self,
        settings: &PolishSettings,
        plant: &PlantSettings,
        rng: &mut dyn RandomStream,
    ) -> Result<()> {
        settings.validate()?;
        if settings.assign_plant {
            self.assign_plant(plant, rng)?;
        }
        if settings.keep_history {
            self.history.push(self.raster.clone());
        }
        for _ in 0..settings.times {
            self.refine(settings.refine_factor)?;
            self.weathering(settings.weathering_intensity, rng)?;
            if settings.keep_history {
                self.history.push(self.raster.clone());
            }
        }
        self.coastline()?;
        tracing::info!(
            target: "mapmaker",
            seed = self.seed,
            refinements = self.refinements,
            rows = self.raster.rows,
            cols = self.raster.cols,
            "map.polished"
        );
        Ok(())
    }

    /// Шаг подразбиения рек, соответствующий текущему разрешению: `1 / 2^(n+1)`
    #[must_use]
    pub fn river_delta_length(&self) -> f64 {
        0.5_f64.powi(self.refinements as i32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ChaChaStream, ScriptedStream};

    const O: u8 = 0;
    const P: u8 = 2;
    const M: u8 = 3;
    const B: u8 = 9;

    #[test]
    fn test_refine_blocks() {
        let raster = Grid::from_vec(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();
        let refined = refine(&raster, 3).unwrap();
        assert_eq!(refined.shape(), (6, 9));
        for i in 0..2 {
            for j in 0..3 {
                for a in 0..3 {
                    for b in 0..3 {
                        assert_eq!(refined.at(3 * i + a, 3 * j + b), raster.at(i, j));
                    }
                }
            }
        }
        assert!(refine(&raster, 0).is_err());
    }

    #[test]
    fn test_weathering_does_not_cascade() {
        // Чередующиеся строки "P M P M ..." и "M P M P ...". При p = 1 число 0.0
        // выбирает северного соседа, затем западного, который и остаётся.
        let rows = 5;
        let cols = 6;
        let raster = Grid::from_fn(rows, cols, |i, j| if (i + j) % 2 == 0 { P } else { M });
        let weathered = weather(&raster, 1.0, &mut ScriptedStream::constant(0.0), 0).unwrap();
        for i in 0..rows {
            for j in 0..cols {
                let expected = if i == 0 || j == 0 || i == rows - 1 || j == cols - 1 {
                    raster.at(i, j)
                } else {
                    raster.at(i, j - 1)
                };
                assert_eq!(weathered.at(i, j), expected, "cell ({i}, {j})");
            }
        }
        // При каскаде вся строка повторила бы значение первого столбца
        assert_ne!(weathered.at(2, 1), weathered.at(2, 2));
    }

    #[test]
    fn test_weathering_vertical_only() {
        // Первое число 0.95 (> 1 − 0.1) выбирает южного соседа, второе 0.5 ничего не делает
        let raster = Grid::from_fn(4, 4, |i, _| if i % 2 == 0 { P } else { M });
        let mut rng = ScriptedStream::new(vec![0.95, 0.5]);
        let weathered = weather(&raster, 0.1, &mut rng, 0).unwrap();
        for j in 1..3 {
            assert_eq!(weathered.at(1, j), P);
            assert_eq!(weathered.at(2, j), M);
        }
        assert_eq!(weathered.row(0), raster.row(0));
        assert_eq!(weathered.row(3), raster.row(3));
    }

    #[test]
    fn test_weathering_small_raster_is_noop() {
        let raster = Grid::from_vec(2, 2, vec![0, 2, 3, 4]).unwrap();
        let weathered = weather(&raster, 0.5, &mut ChaChaStream::new(3), 3).unwrap();
        assert_eq!(weathered, raster);
        assert!(weather(&raster, 0.0, &mut ChaChaStream::new(3), 3).is_err());
    }

    #[test]
    fn test_weathering_is_reproducible() {
        let raster = Grid::from_fn(20, 20, |i, j| ((i * 7 + j * 3) % 5) as u8);
        let mut rng = ChaChaStream::default();
        let a = weather(&raster, 0.3, &mut rng, 11).unwrap();
        let b = weather(&raster, 0.3, &mut rng, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_coastline_marks_land_next_to_water() {
        #[rustfmt::skip]
        let raster = Grid::from_vec(5, 5, vec![
            O, O, O, O, O,
            O, P, P, P, O,
            O, P, P, P, O,
            O, P, P, P, O,
            O, O, O, O, O,
        ]).unwrap();
        let coast = extract_coastline(&raster, &land_mask(&raster)).unwrap();
        #[rustfmt::skip]
        let expected = vec![
            O, O, O, O, O,
            O, B, B, B, O,
            O, B, P, B, O,
            O, B, B, B, O,
            O, O, O, O, O,
        ];
        assert_eq!(coast.data, expected);
    }

    #[test]
    fn test_coastline_ignores_border_cells() {
        let raster = Grid::from_vec(3, 3, vec![P, O, P, P, P, P, P, P, P]).unwrap();
        let coast = extract_coastline(&raster, &land_mask(&raster)).unwrap();
        assert_eq!(coast.at(0, 0), P);
        assert_eq!(coast.at(0, 2), P);
        assert_eq!(coast.at(1, 1), B);
    }

    #[test]
    fn test_coastline_second_pass_is_stable() {
        let raster = Grid::from_fn(12, 12, |i, j| {
            let (di, dj) = (i as i32 - 6, j as i32 - 6);
            if di * di + dj * dj < 20 { P } else { O }
        });
        let first = extract_coastline(&raster, &land_mask(&raster)).unwrap();
        let second = extract_coastline(&first, &land_mask(&first)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_terrain_map_tracks_refinements() {
        let raster = Grid::from_vec(2, 2, vec![O, P, P, P]).unwrap();
        let mut map = TerrainMap::new(raster, 5);
        assert!((map.river_delta_length() - 0.5).abs() < 1e-12);
        map.refine(2).unwrap();
        map.refine(2).unwrap();
        assert_eq!(map.refinements, 2);
        assert_eq!(map.shape(), (8, 8));
        assert_eq!(map.land.shape(), (8, 8));
        assert!(!map.land.at(0, 0));
        assert!(map.land.at(7, 7));
        assert!((map.river_delta_length() - 0.125).abs() < 1e-12);
        map.recover_origin();
        assert_eq!(map.shape(), (2, 2));
        assert_eq!(map.refinements, 0);
    }

    #[test]
    fn test_recover_origin_keeps_loaded_refinements() {
        let raster = Grid::new(4, 4, P);
        let mut map = TerrainMap::with_refinements(raster, 5, 2);
        assert!((map.river_delta_length() - 0.125).abs() < 1e-12);
        map.refine(2).unwrap();
        assert_eq!(map.refinements, 3);
        map.recover_origin();
        assert_eq!(map.shape(), (4, 4));
        assert_eq!(map.refinements, 2);
        assert!((map.river_delta_length() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_coastline_small_raster_is_noop() {
        let raster = Grid::from_vec(2, 3, vec![P, O, P, P, P, P]).unwrap();
        let coast = extract_coastline(&raster, &land_mask(&raster)).unwrap();
        assert_eq!(coast, raster);
        let column = Grid::from_vec(3, 1, vec![P, O, P]).unwrap();
        assert_eq!(extract_coastline(&column, &land_mask(&column)).unwrap(), column);
    }

    #[test]
    fn test_polish_keeps_history() {
        let raster = Grid::from_fn(6, 8, |i, j| {
            if (1..5).contains(&i) && (1..7).contains(&j) { P } else { O }
        });
        let mut map = TerrainMap::new(raster, 21);
        let settings = PolishSettings {
            times: 2,
            keep_history: true,
            ..Default::default()
        };
        map.polish(&settings, &PlantSettings::default(), &mut ChaChaStream::default())
            .unwrap();
        assert_eq!(map.history.len(), 3);
        assert_eq!(map.history[2].shape(), (24, 32));
        assert_eq!(map.shape(), (24, 32));
        assert!(map.raster.data.contains(&B));
    }
}

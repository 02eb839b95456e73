//! Карта мира: источник высот, растр местности и реки
//!
//! Вид входных данных задаётся явно через [`MapSource`], а не угадывается по типу
//! значений сетки.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::biome::{TerrainRaster, check_raster, classify};
use crate::config::{
    AltitudeParams, MapParams, PlantSettings, PolishSettings, RiverSpec, Thresholds,
};
use crate::error::{MapError, Result};
use crate::grid::Grid;
use crate::heightmap::AltitudeMap;
use crate::persist;
use crate::polish::TerrainMap;
use crate::random::{RandomStream, resolve_seed};
use crate::rivers::River;

pub const MAP_FILE: &str = "map.txt";
pub const ALTITUDE_FILE: &str = "altitude.txt";
pub const RIVER_INDEX_FILE: &str = "river_name.txt";

/// Откуда берётся исходный растр
#[derive(Debug, Clone)]
pub enum MapSource {
    /// Сгенерировать карту высот с нуля
    Generate(AltitudeParams),
    /// Готовое поле высот (ожидается в `[0, 1]`), классифицируется
    Elevation(Grid<f64>),
    /// Уже классифицированный растр, уточнённый `refinements` раз
    Raster {
        raster: TerrainRaster,
        refinements: usize,
    },
    ElevationFile(PathBuf),
    RasterFile { path: PathBuf, refinements: usize },
}

#[derive(Debug, Clone)]
pub struct WorldMap {
    pub name: String,
    pub seed: u32,
    /// Сгенерированная карта высот (только для `MapSource::Generate`)
    pub altitude: Option<AltitudeMap>,
    /// Поле высот, из которого получен растр (если было)
    pub elevation: Option<Grid<f64>>,
    pub terrain: TerrainMap,
    pub rivers: Vec<River>,
    /// Начало ещё не занятых подпотоков рек
    pub river_stream: u64,
    /// Протяжённость карты `(width, height)` в клетках исходного растра (координаты рек)
    pub extent: (f64, f64),
}

/// Краткая сводка прогона, достаточная для его воспроизведения
#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub name: String,
    pub seed: u32,
    pub rows: usize,
    pub cols: usize,
    pub refinements: usize,
    pub land_cells: usize,
    pub rivers: Vec<String>,
}

impl WorldMap {
    pub fn build(
        name: impl Into<String>,
        seed: Option<u32>,
        source: MapSource,
        thresholds: &Thresholds,
        rng: &mut dyn RandomStream,
    ) -> Result<Self> {
        thresholds.validate()?;
        let name = name.into();
        let seed = resolve_seed(seed);

        let (altitude, elevation, raster, refinements) = match source {
            MapSource::Generate(params) => {
                let altitude = AltitudeMap::generate(name.clone(), Some(seed), &params, rng)?;
                let raster = classify(&altitude.map, thresholds)?;
                let elevation = altitude.map.clone();
                (Some(altitude), Some(elevation), raster, 0)
            }
            MapSource::Elevation(elevation) => {
                let raster = classify(&elevation, thresholds)?;
                (None, Some(elevation), raster, 0)
            }
            MapSource::ElevationFile(path) => {
                let elevation = persist::read_elevation(path)?;
                let raster = classify(&elevation, thresholds)?;
                (None, Some(elevation), raster, 0)
            }
            MapSource::Raster {
                raster,
                refinements,
            } => {
                check_raster(&raster)?;
                (None, None, raster, refinements)
            }
            MapSource::RasterFile { path, refinements } => {
                (None, None, persist::read_raster(path)?, refinements)
            }
        };

        let extent = (raster.cols as f64, raster.rows as f64);
        tracing::info!(
            target: "mapmaker",
            name = %name,
            seed,
            rows = raster.rows,
            cols = raster.cols,
            "map.created"
        );
        Ok(Self {
            name,
            seed,
            altitude,
            elevation,
            terrain: TerrainMap::with_refinements(raster, seed, refinements),
            rivers: Vec::new(),
            river_stream: u64::from(seed),
            extent,
        })
    }

    /// Полный прогон по конфигурации: генерация, полировка, реки
    pub fn from_params(params: &MapParams, rng: &mut dyn RandomStream) -> Result<Self> {
        params.validate()?;
        let mut map = Self::build(
            params.name.clone(),
            params.seed,
            MapSource::Generate(params.altitude.clone()),
            &params.thresholds,
            rng,
        )?;
        map.polish(&params.polish, &params.plant, rng)?;
        for spec in &params.rivers {
            map.add_river(spec, rng)?;
        }
        Ok(map)
    }

    pub fn polish(
        &mut self,
        settings: &PolishSettings,
        plant: &PlantSettings,
        rng: &mut dyn RandomStream,
    ) -> Result<()> {
        self.terrain.polish(settings, plant, rng)
    }

    /// Первый подпоток, не использованный ни одной рекой карты
    fn free_river_stream(&self) -> u64 {
        self.rivers
            .iter()
            .map(|r| r.var_seed)
            .fold(self.river_stream, u64::max)
    }

    /// Добавляет реку; шаг подразбиения соответствует текущему разрешению растра.
    ///
    /// Река без собственного сида получает подпотоки после всех уже занятых.
    pub fn add_river(&mut self, spec: &RiverSpec, rng: &mut dyn RandomStream) -> Result<&River> {
        if self.rivers.iter().any(|r| r.name == spec.name) {
            return Err(MapError::config(format!("river {:?} already exists", spec.name)));
        }
        let stream = self.free_river_stream();
        let river = River::from_spec(spec, stream, self.terrain.river_delta_length(), rng)?;
        if spec.seed.is_none() {
            tracing::info!(
                target: "mapmaker",
                river = %river.name,
                seed = river.seed,
                "river.seeded"
            );
        }
        self.river_stream = self.river_stream.max(river.var_seed);
        self.rivers.push(river);
        Ok(&self.rivers[self.rivers.len() - 1])
    }

    /// Первое свободное имя вида `river N`
    #[must_use]
    pub fn default_river_name(&self) -> String {
        (1..)
            .map(|i| format!("river {i}"))
            .find(|candidate| self.rivers.iter().all(|r| &r.name != candidate))
            .unwrap_or_default()
    }

    /// Удаляет реки с заданными именами; без имён удаляет последнюю
    pub fn clear_rivers(&mut self, names: &[&str]) {
        if names.is_empty() {
            self.rivers.pop();
        } else {
            self.rivers.retain(|r| !names.contains(&r.name.as_str()));
        }
    }

    /// Меняет форму рек (всех или одной) при тех же опорных точках.
    ///
    /// Новые подпотоки берутся после всех занятых; реки без опорных точек не меняются.
    pub fn rerandomize_rivers(&mut self, name: Option<&str>, rng: &mut dyn RandomStream) {
        for idx in 0..self.rivers.len() {
            let river = &self.rivers[idx];
            if river.keypoints.len() < 2 || name.is_some_and(|n| n != river.name) {
                continue;
            }
            let stream = self.free_river_stream();
            let river = &mut self.rivers[idx];
            river.var_seed = stream;
            river.rerandomize(rng);
            self.river_stream = self.river_stream.max(river.var_seed);
        }
    }

    #[must_use]
    pub fn summary(&self) -> MapSummary {
        let (rows, cols) = self.terrain.shape();
        MapSummary {
            name: self.name.clone(),
            seed: self.seed,
            rows,
            cols,
            refinements: self.terrain.refinements,
            land_cells: self.terrain.land.data.iter().filter(|&&v| v).count(),
            rivers: self.rivers.iter().map(|r| r.name.clone()).collect(),
        }
    }

    /// Сохраняет растр, высоты и реки в каталог
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        persist::write_raster(dir.join(MAP_FILE), &self.terrain.raster)?;
        if let Some(elevation) = &self.elevation {
            persist::write_elevation(dir.join(ALTITUDE_FILE), elevation)?;
        }
        let mut index = String::new();
        for river in &self.rivers {
            if persist::write_river(dir.join(format!("{}.txt", river.name)), river)? {
                index.push_str(&river.name);
                index.push('\n');
            }
        }
        fs::write(dir.join(RIVER_INDEX_FILE), index)?;
        Ok(())
    }

    /// Загружает реки, перечисленные в индексном файле каталога
    pub fn load_rivers_from_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let index = dir.join(RIVER_INDEX_FILE);
        if !index.exists() {
            tracing::warn!(target: "mapmaker", path = %index.display(), "river index missing");
            return Ok(());
        }
        self.rivers.clear();
        for name in fs::read_to_string(index)?.lines().map(str::trim).filter(|n| !n.is_empty()) {
            self.rivers.push(persist::read_river(dir.join(format!("{name}.txt")), name)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::TerrainClass;
    use crate::random::ChaChaStream;
    use tempfile::tempdir;

    fn small_params() -> AltitudeParams {
        AltitudeParams {
            longitude_range: 40.0,
            latitude_range: 30.0,
            slope: 2.0,
            perlin_cells: (4, 3),
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let params = MapParams {
            seed: Some(4321),
            altitude: AltitudeParams {
                continent_number: 3,
                ..small_params()
            },
            polish: PolishSettings {
                times: 2,
                ..Default::default()
            },
            rivers: vec![RiverSpec {
                name: "river 1".into(),
                keypoints: vec![[3.0, 3.0], [15.0, 20.0], [35.0, 25.0]],
                intensity: 0.4,
                seed: None,
                insert_times: None,
            }],
            ..Default::default()
        };
        let a = WorldMap::from_params(&params, &mut ChaChaStream::default()).unwrap();
        let b = WorldMap::from_params(&params, &mut ChaChaStream::new(99)).unwrap();
        assert_eq!(a.terrain.raster, b.terrain.raster);
        assert_eq!(a.elevation, b.elevation);
        assert_eq!(a.rivers[0].points, b.rivers[0].points);
        assert_eq!(a.terrain.shape(), (120, 160));

        let other = WorldMap::from_params(
            &MapParams {
                seed: Some(4322),
                ..params
            },
            &mut ChaChaStream::default(),
        )
        .unwrap();
        assert_ne!(other.elevation, a.elevation);
    }

    #[test]
    fn test_build_from_elevation() {
        let elevation = Grid::from_vec(1, 4, vec![0.0, 0.1, 0.6, 0.9]).unwrap();
        let map = WorldMap::build(
            "e",
            Some(1),
            MapSource::Elevation(elevation),
            &Thresholds::default(),
            &mut ChaChaStream::default(),
        )
        .unwrap();
        assert_eq!(map.terrain.raster.data, vec![0, 1, 3, 4]);
        assert_eq!(map.extent, (4.0, 1.0));
        assert!(map.altitude.is_none());
    }

    #[test]
    fn test_build_from_raster_keeps_refinements() {
        let raster = Grid::new(4, 4, TerrainClass::Prairie.code());
        let map = WorldMap::build(
            "r",
            Some(1),
            MapSource::Raster {
                raster,
                refinements: 2,
            },
            &Thresholds::default(),
            &mut ChaChaStream::default(),
        )
        .unwrap();
        assert_eq!(map.terrain.refinements, 2);
        assert!((map.terrain.river_delta_length() - 0.125).abs() < 1e-12);

        let bad = WorldMap::build(
            "r",
            Some(1),
            MapSource::Raster {
                raster: Grid::new(4, 4, 42),
                refinements: 0,
            },
            &Thresholds::default(),
            &mut ChaChaStream::default(),
        );
        assert!(matches!(bad, Err(MapError::UnknownClass(_))));
    }

    #[test]
    fn test_river_management() {
        let mut rng = ChaChaStream::default();
        let mut map = WorldMap::build(
            "rivers",
            Some(3),
            MapSource::Generate(small_params()),
            &Thresholds::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(map.default_river_name(), "river 1");
        let spec = RiverSpec {
            name: map.default_river_name(),
            keypoints: vec![[5.0, 5.0], [20.0, 12.0]],
            intensity: 0.5,
            seed: None,
            insert_times: None,
        };
        let river = map.add_river(&spec, &mut rng).unwrap();
        assert_eq!(river.seed, 3);
        assert!(map.add_river(&spec, &mut rng).is_err());
        assert_eq!(map.default_river_name(), "river 2");

        let before = map.rivers[0].points.clone();
        map.rerandomize_rivers(Some("river 1"), &mut rng);
        assert_ne!(map.rivers[0].points, before);

        map.clear_rivers(&[]);
        assert!(map.rivers.is_empty());
    }

    fn straight_spec(name: &str, y: f64) -> RiverSpec {
        RiverSpec {
            name: name.into(),
            keypoints: vec![[0.0, y], [8.0, y]],
            intensity: 0.5,
            seed: None,
            insert_times: None,
        }
    }

    #[test]
    fn test_rivers_without_seed_use_disjoint_streams() {
        let mut rng = ChaChaStream::default();
        let raster = Grid::new(16, 16, TerrainClass::Prairie.code());
        let mut map = WorldMap::build(
            "pair",
            Some(3),
            MapSource::Raster {
                raster,
                refinements: 0,
            },
            &Thresholds::default(),
            &mut rng,
        )
        .unwrap();
        map.add_river(&straight_spec("a", 0.0), &mut rng).unwrap();
        map.add_river(&straight_spec("b", 10.0), &mut rng).unwrap();
        let (a, b) = (&map.rivers[0], &map.rivers[1]);
        assert_eq!(a.seed, 3);
        assert!(b.seed >= a.var_seed);
        assert_eq!(a.points.len(), b.points.len());
        let same_shape = a
            .points
            .iter()
            .zip(&b.points)
            .all(|(p, q)| (p[0] - q[0]).abs() < 1e-9 && (p[1] + 10.0 - q[1]).abs() < 1e-9);
        assert!(!same_shape);

        // Новая форма тоже берёт ещё не занятые подпотоки
        let before = map.rivers[1].var_seed;
        map.rerandomize_rivers(Some("a"), &mut rng);
        assert!(map.rivers[0].seed == 3 && map.rivers[0].var_seed > before);
    }

    #[test]
    fn test_save_and_resume_from_dir() {
        let dir = tempdir().unwrap();
        let mut rng = ChaChaStream::default();
        let params = MapParams {
            name: "resume".into(),
            seed: Some(2222),
            altitude: small_params(),
            polish: PolishSettings {
                times: 1,
                ..Default::default()
            },
            rivers: vec![RiverSpec {
                name: "river 1".into(),
                keypoints: vec![[2.0, 2.0], [30.0, 20.0]],
                intensity: 0.5,
                seed: None,
                insert_times: None,
            }],
            ..Default::default()
        };
        let map = WorldMap::from_params(&params, &mut rng).unwrap();
        map.save_to_dir(dir.path()).unwrap();

        let mut resumed = WorldMap::build(
            "resume",
            Some(2222),
            MapSource::RasterFile {
                path: dir.path().join(MAP_FILE),
                refinements: map.terrain.refinements,
            },
            &Thresholds::default(),
            &mut rng,
        )
        .unwrap();
        resumed.load_rivers_from_dir(dir.path()).unwrap();
        assert_eq!(resumed.terrain.raster, map.terrain.raster);
        assert_eq!(resumed.rivers.len(), 1);
        assert_eq!(resumed.rivers[0].points, map.rivers[0].points);

        // У загруженной реки нет опорных точек, её путь сохраняется
        resumed.rerandomize_rivers(None, &mut rng);
        assert_eq!(resumed.rivers[0].points, map.rivers[0].points);

        let from_elevation = WorldMap::build(
            "resume",
            Some(2222),
            MapSource::ElevationFile(dir.path().join(ALTITUDE_FILE)),
            &Thresholds::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(from_elevation.elevation, map.elevation);
    }
}

// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией:
//! - Карта высот: уровни суши/моря/шума, число континентов, уклон, размер мира
//! - Пороги классификации рельефа
//! - Распределение растительности
//! - Параметры полировки (уточнение, выветривание)
//! - Опорные точки рек
//!
//! Все структуры поддерживают сериализацию в TOML/JSON. Проверка значений выполняется
//! методами `validate()` до начала работы с растрами.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::biome::TerrainClass;
use crate::error::{MapError, Result};

/// Параметры генерации карты высот
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AltitudeParams {
    /// Вес размытого каркаса континентов (0.0..=1.0)
    #[serde(default = "default_land_level")]
    pub land_level: f64,

    /// Уровень моря: всё, что ниже, обнуляется (0.0..=1.0)
    #[serde(default = "default_sea_level")]
    pub sea_level: f64,

    /// Вес шума Перлина (0.0..=1.0)
    #[serde(default = "default_noise_level")]
    pub noise_level: f64,

    /// Количество континентов (0 = только шум, 1 = центральный континент)
    #[serde(default = "default_continent_number")]
    pub continent_number: usize,

    /// Уклон берегов: сигма гауссова размытия в единицах мира
    #[serde(default = "default_slope")]
    pub slope: f64,

    /// Доля ширины мира, в которой размещаются центры континентов
    #[serde(default = "default_placement_range")]
    pub width_range: (f64, f64),

    /// Доля высоты мира, в которой размещаются центры континентов
    #[serde(default = "default_placement_range")]
    pub height_range: (f64, f64),

    /// Разрешение сетки ячеек шума Перлина по долготе и широте
    #[serde(default = "default_perlin_cells")]
    pub perlin_cells: (usize, usize),

    /// Протяжённость мира по долготе
    #[serde(default = "default_longitude_range")]
    pub longitude_range: f64,

    /// Протяжённость мира по широте
    #[serde(default = "default_latitude_range")]
    pub latitude_range: f64,

    /// Число отсчётов на единицу протяжённости
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Обрезать ли высоты по уровню моря перед нормализацией
    #[serde(default = "default_generate_sea")]
    pub generate_sea: bool,
}

fn default_land_level() -> f64 {
    0.5
}
fn default_sea_level() -> f64 {
    0.2
}
fn default_noise_level() -> f64 {
    0.5
}
fn default_continent_number() -> usize {
    1
}
fn default_slope() -> f64 {
    5.0
}
fn default_placement_range() -> (f64, f64) {
    (0.25, 0.75)
}
fn default_perlin_cells() -> (usize, usize) {
    (10, 10)
}
fn default_longitude_range() -> f64 {
    100.0
}
fn default_latitude_range() -> f64 {
    80.0
}
fn default_resolution() -> f64 {
    1.0
}
fn default_generate_sea() -> bool {
    true
}

impl Default for AltitudeParams {
    fn default() -> Self {
        Self {
            land_level: 0.5,
            sea_level: 0.2,
            noise_level: 0.5,
            continent_number: 1,
            slope: 5.0,
            width_range: (0.25, 0.75),
            height_range: (0.25, 0.75),
            perlin_cells: (10, 10),
            longitude_range: 100.0,
            latitude_range: 80.0,
            resolution: 1.0,
            generate_sea: true,
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MapError::config(format!("{name} must be in [0, 1], got {value}")))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(MapError::config(format!("{name} must be positive, got {value}")))
    }
}

fn check_placement(name: &str, range: (f64, f64)) -> Result<()> {
    let (lo, hi) = range;
    if 0.0 < lo && lo <= hi && hi < 1.0 {
        Ok(())
    } else {
        Err(MapError::config(format!(
            "{name} must satisfy 0 < lo <= hi < 1, got {range:?}"
        )))
    }
}

impl AltitudeParams {
    pub fn validate(&self) -> Result<()> {
        check_unit("land_level", self.land_level)?;
        check_unit("sea_level", self.sea_level)?;
        check_unit("noise_level", self.noise_level)?;
        check_positive("slope", self.slope)?;
        check_positive("longitude_range", self.longitude_range)?;
        check_positive("latitude_range", self.latitude_range)?;
        check_positive("resolution", self.resolution)?;
        check_placement("width_range", self.width_range)?;
        check_placement("height_range", self.height_range)?;
        if self.perlin_cells.0 == 0 || self.perlin_cells.1 == 0 {
            return Err(MapError::config(format!(
                "perlin_cells must be positive, got {:?}",
                self.perlin_cells
            )));
        }
        let (rows, cols) = self.grid_size();
        if rows == 0 || cols == 0 {
            return Err(MapError::config("world extent × resolution gives an empty grid"));
        }
        Ok(())
    }

    /// Размер сетки отсчётов `(rows, cols)` = разрешение × протяжённость
    #[must_use]
    pub fn grid_size(&self) -> (usize, usize) {
        (
            (self.resolution * self.latitude_range).round() as usize,
            (self.resolution * self.longitude_range).round() as usize,
        )
    }

    /// Сигма гауссова ядра в отсчётах: на более частой сетке ядро шире
    #[must_use]
    pub fn blur_sigma(&self) -> f64 {
        self.slope * self.resolution
    }
}

/// Пороги классификации высот; должны строго возрастать
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    #[serde(default = "default_shallow_level")]
    pub shallow: f64,
    #[serde(default = "default_mountain_level")]
    pub mountain: f64,
    #[serde(default = "default_peak_level")]
    pub peak: f64,
}

fn default_shallow_level() -> f64 {
    0.15
}
fn default_mountain_level() -> f64 {
    0.50
}
fn default_peak_level() -> f64 {
    0.85
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            shallow: 0.15,
            mountain: 0.50,
            peak: 0.85,
        }
    }
}

impl Thresholds {
    pub fn new(shallow: f64, mountain: f64, peak: f64) -> Result<Self> {
        let thresholds = Self {
            shallow,
            mountain,
            peak,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        if 0.0 < self.shallow && self.shallow < self.mountain && self.mountain < self.peak {
            Ok(())
        } else {
            Err(MapError::config(format!(
                "thresholds must be strictly ascending and positive, got {self:?}"
            )))
        }
    }
}

/// Распределение растительности по суше
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantSettings {
    /// Доли для `[forest, farmland, prairie, gobi, desert]`; нормируются
    #[serde(default = "default_proportions")]
    pub proportions: [f64; 5],

    /// Классы, которые перераспределяются
    #[serde(default = "default_plant_areas")]
    pub areas: Vec<TerrainClass>,

    /// Число ячеек шума по ширине (по высоте — пропорционально)
    #[serde(default = "default_plant_cells")]
    pub cells: usize,
}

fn default_proportions() -> [f64; 5] {
    [0.2; 5]
}
fn default_plant_areas() -> Vec<TerrainClass> {
    TerrainClass::VEGETATION.to_vec()
}
fn default_plant_cells() -> usize {
    5
}

impl Default for PlantSettings {
    fn default() -> Self {
        Self {
            proportions: [0.2; 5],
            areas: TerrainClass::VEGETATION.to_vec(),
            cells: 5,
        }
    }
}

impl PlantSettings {
    pub fn validate(&self) -> Result<()> {
        if self.proportions.iter().any(|p| *p < 0.0 || !p.is_finite()) {
            return Err(MapError::config("plant proportions must be non-negative"));
        }
        if self.proportions.iter().sum::<f64>() <= 0.0 {
            return Err(MapError::config("plant proportions must not all be zero"));
        }
        if self.cells == 0 {
            return Err(MapError::config("plant noise cells must be positive"));
        }
        Ok(())
    }
}

/// Параметры полировки растра
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolishSettings {
    /// Сколько раз уточнить и выветрить растр
    #[serde(default = "default_polish_times")]
    pub times: usize,

    /// Множитель разрешения на одно уточнение
    #[serde(default = "default_refine_factor")]
    pub refine_factor: usize,

    /// Вероятность смены значения на соседское по каждой оси
    #[serde(default = "default_weathering_intensity")]
    pub weathering_intensity: f64,

    /// Распределить растительность перед уточнением
    #[serde(default = "default_assign_plant")]
    pub assign_plant: bool,

    /// Сохранять растр после каждого шага
    #[serde(default)]
    pub keep_history: bool,
}

fn default_polish_times() -> usize {
    3
}
fn default_refine_factor() -> usize {
    2
}
fn default_weathering_intensity() -> f64 {
    0.1
}
fn default_assign_plant() -> bool {
    true
}

impl Default for PolishSettings {
    fn default() -> Self {
        Self {
            times: 3,
            refine_factor: 2,
            weathering_intensity: 0.1,
            assign_plant: true,
            keep_history: false,
        }
    }
}

impl PolishSettings {
    pub fn validate(&self) -> Result<()> {
        if self.refine_factor == 0 {
            return Err(MapError::config("refine_factor must be positive"));
        }
        check_weathering_intensity(self.weathering_intensity)
    }
}

pub(crate) fn check_weathering_intensity(intensity: f64) -> Result<()> {
    if intensity > 0.0 && intensity <= 1.0 {
        Ok(())
    } else {
        Err(MapError::config(format!(
            "weathering intensity must be in (0, 1], got {intensity}"
        )))
    }
}

/// Описание реки: имя и опорные точки.
///
/// Координаты считаются в клетках исходного (неуточнённого) растра, ось y вверх.
/// С координатами мира они совпадают только при `resolution = 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiverSpec {
    pub name: String,

    #[serde(default)]
    pub keypoints: Vec<[f64; 2]>,

    /// Сила смещения середин (0.0..=1.0)
    #[serde(default = "default_river_intensity")]
    pub intensity: f64,

    /// Собственный сид реки; по умолчанию берётся сид карты
    #[serde(default)]
    pub seed: Option<u32>,

    /// Явное число раундов подразбиения на сегмент
    #[serde(default)]
    pub insert_times: Option<u32>,
}

fn default_river_intensity() -> f64 {
    0.5
}

/// Полная конфигурация одного прогона. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapParams {
    #[serde(default = "default_name")]
    pub name: String,

    /// Сид генератора; если не задан, вытягивается из [0, 10000)
    #[serde(default)]
    pub seed: Option<u32>,

    #[serde(default)]
    pub altitude: AltitudeParams,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub plant: PlantSettings,

    #[serde(default)]
    pub polish: PolishSettings,

    #[serde(default)]
    pub rivers: Vec<RiverSpec>,
}

fn default_name() -> String {
    "Unnamed map".to_string()
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: None,
            altitude: AltitudeParams::default(),
            thresholds: Thresholds::default(),
            plant: PlantSettings::default(),
            polish: PolishSettings::default(),
            rivers: Vec::new(),
        }
    }
}

impl MapParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// name = "Three continents"
    /// seed = 7777
    ///
    /// [altitude]
    /// continent_number = 3
    /// perlin_cells = [20, 10]
    /// longitude_range = 200.0
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        self.altitude.validate()?;
        self.thresholds.validate()?;
        self.plant.validate()?;
        self.polish.validate()?;
        for river in &self.rivers {
            check_unit("river intensity", river.intensity)?;
        }
        Ok(())
    }
}

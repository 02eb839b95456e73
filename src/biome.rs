//! Типы местности и классификация высот
//!
//! Таблица кодов фиксирована на весь прогон: классификация, маска суши и
//! выветривание опираются на одни и те же коды.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{PlantSettings, Thresholds};
use crate::error::{MapError, Result};
use crate::grid::{Grid, meshgrid};
use crate::noise::Perlin2d;
use crate::random::RandomStream;

/// Растр классов местности
pub type TerrainRaster = Grid<u8>;
/// Маска суши: `true` для всего, что не океан и не вода
pub type LandMask = Grid<bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TerrainClass {
    Ocean = 0,
    Water = 1,
    Prairie = 2,
    Mountain = 3,
    Peak = 4,
    Forest = 5,
    Farmland = 6,
    Gobi = 7,
    Desert = 8,
    Boundary = 9,
    Other = 10,
}

impl TerrainClass {
    pub const ALL: [TerrainClass; 11] = [
        TerrainClass::Ocean,
        TerrainClass::Water,
        TerrainClass::Prairie,
        TerrainClass::Mountain,
        TerrainClass::Peak,
        TerrainClass::Forest,
        TerrainClass::Farmland,
        TerrainClass::Gobi,
        TerrainClass::Desert,
        TerrainClass::Boundary,
        TerrainClass::Other,
    ];

    /// Классы растительности в порядке накопленных долей
    pub const VEGETATION: [TerrainClass; 5] = [
        TerrainClass::Forest,
        TerrainClass::Farmland,
        TerrainClass::Prairie,
        TerrainClass::Gobi,
        TerrainClass::Desert,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| MapError::UnknownClass(code.to_string()))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TerrainClass::Ocean => "ocean",
            TerrainClass::Water => "water",
            TerrainClass::Prairie => "prairie",
            TerrainClass::Mountain => "mountain",
            TerrainClass::Peak => "peak",
            TerrainClass::Forest => "forest",
            TerrainClass::Farmland => "farmland",
            TerrainClass::Gobi => "gobi",
            TerrainClass::Desert => "desert",
            TerrainClass::Boundary => "boundary",
            TerrainClass::Other => "other",
        }
    }

    #[must_use]
    pub fn is_water(self) -> bool {
        matches!(self, TerrainClass::Ocean | TerrainClass::Water)
    }

    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            TerrainClass::Ocean => [32, 64, 128],
            TerrainClass::Water => [80, 140, 200],
            TerrainClass::Prairie => [150, 200, 100],
            TerrainClass::Mountain => [140, 110, 80],
            TerrainClass::Peak => [230, 230, 240],
            TerrainClass::Forest => [40, 110, 50],
            TerrainClass::Farmland => [190, 170, 60],
            TerrainClass::Gobi => [170, 150, 120],
            TerrainClass::Desert => [220, 200, 140],
            TerrainClass::Boundary => [60, 60, 60],
            TerrainClass::Other => [255, 255, 255],
        }
    }
}

impl fmt::Display for TerrainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TerrainClass {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.name() == s)
            .ok_or_else(|| MapError::UnknownClass(s.to_string()))
    }
}

/// Класс одной высоты; значение ровно на пороге уходит в верхний класс
#[must_use]
pub fn classify_value(x: f64, thresholds: &Thresholds) -> TerrainClass {
    if x <= 0.0 {
        TerrainClass::Ocean
    } else if x < thresholds.shallow {
        TerrainClass::Water
    } else if x < thresholds.mountain {
        TerrainClass::Prairie
    } else if x < thresholds.peak {
        TerrainClass::Mountain
    } else {
        TerrainClass::Peak
    }
}

/// Переводит поле высот в растр классов
pub fn classify(elevation: &Grid<f64>, thresholds: &Thresholds) -> Result<TerrainRaster> {
    thresholds.validate()?;
    let raster = elevation.map(|&x| classify_value(x, thresholds).code());
    tracing::debug!(
        target: "mapmaker",
        rows = raster.rows,
        cols = raster.cols,
        "raster.classified"
    );
    Ok(raster)
}

#[must_use]
pub fn is_land_code(code: u8) -> bool {
    code != TerrainClass::Ocean.code() && code != TerrainClass::Water.code()
}

/// Проверяет, что все коды растра есть в таблице классов
pub fn check_raster(raster: &TerrainRaster) -> Result<()> {
    for &code in &raster.data {
        TerrainClass::from_code(code)?;
    }
    Ok(())
}

#[must_use]
pub fn land_mask(raster: &TerrainRaster) -> LandMask {
    raster.map(|&code| is_land_code(code))
}

/// Перераспределяет клетки классов `settings.areas` по растительности.
///
/// Используется отдельный шум Перлина с сидом `seed`, снятый в целочисленных
/// координатах пикселей и сдвинутый на +0.5; клетки прочих классов не меняются.
pub fn assign_plant(
    raster: &TerrainRaster,
    settings: &PlantSettings,
    rng: &mut dyn RandomStream,
    seed: u32,
) -> Result<TerrainRaster> {
    settings.validate()?;
    if raster.data.is_empty() {
        return Ok(raster.clone());
    }

    let cells_y = (settings.cells * raster.rows).div_ceil(raster.cols).max(1);
    let perlin = Perlin2d::new((settings.cells, cells_y), seed)?;
    let xs: Vec<f64> = (0..raster.cols).map(|j| j as f64).collect();
    let ys: Vec<f64> = (0..raster.rows).map(|i| i as f64).collect();
    let (x, y) = meshgrid(&xs, &ys);
    let noise = perlin.sample(rng, &x, &y)?;

    let total: f64 = settings.proportions.iter().sum();
    let mut running = 0.0;
    let accumulate: Vec<f64> = settings
        .proportions
        .iter()
        .map(|p| {
            running += p;
            running / total
        })
        .collect();

    let eligible: Vec<u8> = settings.areas.iter().map(|c| c.code()).collect();
    let data = raster
        .data
        .iter()
        .zip(&noise.data)
        .map(|(&code, &n)| {
            if !eligible.contains(&code) {
                return code;
            }
            let level = n + 0.5;
            let slot = accumulate[..accumulate.len() - 1]
                .iter()
                .position(|&edge| level < edge)
                .unwrap_or(accumulate.len() - 1);
            TerrainClass::VEGETATION[slot].code()
        })
        .collect();

    tracing::debug!(target: "mapmaker", seed, "plants.assigned");
    Grid::from_vec(raster.rows, raster.cols, data)
}

/// Оставляет только указанные слои; всё прочее становится `Other`
#[must_use]
pub fn extract_layer(raster: &TerrainRaster, layers: &[TerrainClass]) -> TerrainRaster {
    let keep: Vec<u8> = layers.iter().map(|c| c.code()).collect();
    raster.map(|&code| {
        if keep.contains(&code) {
            code
        } else {
            TerrainClass::Other.code()
        }
    })
}

pub mod biome;
pub mod config;
pub mod continent;
pub mod error;
pub mod grid;
pub mod heightmap;
pub mod map;
pub mod noise;
pub mod persist;
pub mod polish;
pub mod random;
pub mod render;
pub mod rivers;

pub use biome::{TerrainClass, TerrainRaster, assign_plant, classify};
pub use config::{
    AltitudeParams, MapParams, PlantSettings, PolishSettings, RiverSpec, Thresholds,
};
pub use error::{MapError, Result};
pub use grid::Grid;
pub use heightmap::AltitudeMap;
pub use map::{MapSource, MapSummary, WorldMap};
pub use polish::TerrainMap;
pub use random::{ChaChaStream, RandomStream, ScriptedStream};
pub use rivers::River;

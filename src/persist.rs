//! Текстовое хранение растров и рек
//!
//! Сетки пишутся построчно, значения разделены `", "`. Растр сохраняется точными
//! целыми, высоты — кратчайшей десятичной записью, которая читается обратно без потерь.
//! Река — два ряда: координаты x и координаты y.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::biome::{TerrainRaster, check_raster};
use crate::error::{MapError, Result};
use crate::grid::Grid;
use crate::rivers::River;

const DELIMITER: &str = ", ";

fn write_rows<W: Write, T: Display>(
    out: &mut W,
    rows: usize,
    cols: usize,
    values: &[T],
) -> Result<()> {
    for i in 0..rows {
        let line = values[i * cols..(i + 1) * cols]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(DELIMITER);
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn parse_row<T: FromStr>(line: &str, line_no: usize) -> Result<Vec<T>>
where
    T::Err: Display,
{
    line.split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| {
            cell.parse::<T>().map_err(|e| MapError::Parse {
                line: line_no,
                message: format!("{cell:?}: {e}"),
            })
        })
        .collect()
}

/// Разбирает текстовую сетку; все строки должны быть одной длины
pub fn parse_grid<T: FromStr>(text: &str) -> Result<Grid<T>>
where
    T::Err: Display,
{
    let mut data = Vec::new();
    let mut rows = 0;
    let mut cols = None;
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row::<T>(line, idx + 1)?;
        match cols {
            None => cols = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(MapError::Parse {
                    line: idx + 1,
                    message: format!("expected {expected} values, got {}", row.len()),
                });
            }
            Some(_) => {}
        }
        data.extend(row);
        rows += 1;
    }
    Grid::from_vec(rows, cols.unwrap_or(0), data)
}

pub fn write_grid<T: Display>(path: impl AsRef<Path>, grid: &Grid<T>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_rows(&mut out, grid.rows, grid.cols, &grid.data)?;
    out.flush()?;
    Ok(())
}

pub fn write_raster(path: impl AsRef<Path>, raster: &TerrainRaster) -> Result<()> {
    write_grid(path, raster)
}

/// Читает растр; неизвестные коды классов — ошибка
pub fn read_raster(path: impl AsRef<Path>) -> Result<TerrainRaster> {
    let raster = parse_grid(&fs::read_to_string(path)?)?;
    check_raster(&raster)?;
    Ok(raster)
}

pub fn write_elevation(path: impl AsRef<Path>, elevation: &Grid<f64>) -> Result<()> {
    write_grid(path, elevation)
}

pub fn read_elevation(path: impl AsRef<Path>) -> Result<Grid<f64>> {
    parse_grid(&fs::read_to_string(path)?)
}

/// Сохраняет путь реки; реки короче трёх точек не пишутся
pub fn write_river(path: impl AsRef<Path>, river: &River) -> Result<bool> {
    if river.points.len() <= 2 {
        return Ok(false);
    }
    let mut out = BufWriter::new(File::create(path)?);
    let n = river.points.len();
    let mut values = river.xs();
    values.extend(river.ys());
    write_rows(&mut out, 2, n, &values)?;
    out.flush()?;
    Ok(true)
}

pub fn read_river(path: impl AsRef<Path>, name: impl Into<String>) -> Result<River> {
    let grid: Grid<f64> = parse_grid(&fs::read_to_string(path)?)?;
    if grid.rows != 2 {
        return Err(MapError::Parse {
            line: grid.rows.min(2) + 1,
            message: format!("river file needs exactly 2 rows, got {}", grid.rows),
        });
    }
    let points = grid.row(0).iter().zip(grid.row(1)).map(|(&x, &y)| [x, y]).collect();
    Ok(River::from_points(name, points))
}

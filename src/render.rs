use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::biome::{TerrainClass, TerrainRaster};
use crate::error::Result;
use crate::grid::Grid;
use crate::rivers::River;

pub const RIVER_COLOR: Rgb<u8> = Rgb([0x20, 0x5a, 0xa7]);

/// Цветное изображение растра по таблице цветов классов
pub fn raster_image(raster: &TerrainRaster) -> Result<RgbImage> {
    let mut img = RgbImage::new(raster.cols as u32, raster.rows as u32);
    for (idx, &code) in raster.data.iter().enumerate() {
        let rgb = TerrainClass::from_code(code)?.to_rgb();
        img.put_pixel((idx % raster.cols) as u32, (idx / raster.cols) as u32, Rgb(rgb));
    }
    Ok(img)
}

/// Рисует реки поверх изображения.
///
/// `extent` — протяжённость карты `(width, height)` в координатах рек; ось y
/// направлена вверх, как на исходном графике.
pub fn draw_rivers(img: &mut RgbImage, rivers: &[River], extent: (f64, f64)) {
    let sx = f64::from(img.width()) / extent.0;
    let sy = f64::from(img.height()) / extent.1;
    let to_pixel = |p: &[f64; 2]| ((p[0] * sx) as f32, ((extent.1 - p[1]) * sy) as f32);
    for river in rivers {
        for pair in river.points.windows(2) {
            draw_line_segment_mut(img, to_pixel(&pair[0]), to_pixel(&pair[1]), RIVER_COLOR);
        }
    }
}

pub fn save_map_png(
    path: &str,
    raster: &TerrainRaster,
    rivers: &[River],
    extent: (f64, f64),
) -> Result<()> {
    let mut img = raster_image(raster)?;
    draw_rivers(&mut img, rivers, extent);
    img.save(path)?;
    Ok(())
}

pub fn to_grayscale_image(elevation: &Grid<f64>) -> Vec<u8> {
    elevation
        .data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
        .collect()
}

pub fn save_elevation_png(path: &str, elevation: &Grid<f64>) -> Result<()> {
    let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(
        elevation.cols as u32,
        elevation.rows as u32,
        to_grayscale_image(elevation),
    )
    .ok_or_else(|| crate::error::MapError::ShapeMismatch {
        expected: elevation.shape(),
        actual: (elevation.data.len() / elevation.cols.max(1), elevation.cols),
    })?;
    img.save(path)?;
    Ok(())
}

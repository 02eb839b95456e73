use clap::Parser;
use mapmaker::{ChaChaStream, MapParams, WorldMap, render};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Генератор рельефа и рек для фэнтезийных карт
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Каталог для результатов (по умолчанию: ./output)
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Переопределить сид из конфигурации
    #[arg(short, long)]
    seed: Option<u32>,

    /// Переопределить число проходов полировки
    #[arg(short, long)]
    polish: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("🔍 Загрузка конфигурации...");
    let mut params = MapParams::from_toml_file(&cli.config)?;
    if let Some(seed) = cli.seed {
        params.seed = Some(seed);
    }
    if let Some(times) = cli.polish {
        params.polish.times = times;
    }

    let (rows, cols) = params.altitude.grid_size();
    println!("Генерация карты «{}» (размер: {rows}×{cols})...", params.name);
    let mut rng = ChaChaStream::default();
    let map = WorldMap::from_params(&params, &mut rng)?;

    println!("Сохранение в {:?}", cli.output);
    map.save_to_dir(&cli.output)?;

    let map_png = cli.output.join("map.png");
    render::save_map_png(
        &map_png.to_string_lossy(),
        &map.terrain.raster,
        &map.rivers,
        map.extent,
    )?;
    if let Some(elevation) = &map.elevation {
        let altitude_png = cli.output.join("altitude.png");
        render::save_elevation_png(&altitude_png.to_string_lossy(), elevation)?;
    }

    let summary = map.summary();
    fs::write(
        cli.output.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    println!(
        "\nГотово! Сид {}, растр {}×{}, рек: {}.",
        summary.seed,
        summary.rows,
        summary.cols,
        summary.rivers.len()
    );
    Ok(())
}

// terrain-demo: headless driver for the terrain map.
// Runs staged init to completion, then walks the view rings around a centre tile.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use log::{error, info};

use fractal_terrain::world::preview::{preview_image, PREVIEW_SEED};
use fractal_terrain::{load_settings, BufferOp, DisplayQuality, TerrainMap, TerrainSettings, TileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QualityArg {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl From<QualityArg> for DisplayQuality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Low => DisplayQuality::Low,
            QualityArg::Medium => DisplayQuality::Medium,
            QualityArg::High => DisplayQuality::High,
            QualityArg::VeryHigh => DisplayQuality::VeryHigh,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "terrain-demo", version, about = "Generate fractal terrain tiles headlessly")]
struct Args {
    /// TOML terrain settings; defaults are used when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Write a grayscale preview of the fractal config to this PNG.
    #[arg(long)]
    preview: Option<PathBuf>,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    center_x: i32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    center_z: i32,
    #[arg(long, value_enum, default_value_t = QualityArg::Medium)]
    quality: QualityArg,
    /// Give up after this many seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

const FRAME: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => TerrainSettings::default(),
    };

    if let Some(path) = &args.preview {
        match preview_image(&settings.fractal, PREVIEW_SEED) {
            Some(img) => {
                img.save(path)?;
                info!("preview written to {}", path.display());
            }
            None => error!("fractal config has no preview"),
        }
    }

    let mut map = TerrainMap::new(&settings)?;
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);

    let t0 = Instant::now();
    let mut last_pct = -20;
    while !map.init() {
        map.update();
        let pct = (map.init_progress() * 100.0) as i32;
        if pct / 20 != last_pct / 20 {
            info!("init {pct}%");
            last_pct = pct;
        }
        if Instant::now() > deadline {
            return Err("timed out during init".into());
        }
        thread::sleep(FRAME);
    }
    info!("init done in {:.2}s, {} tiles live", t0.elapsed().as_secs_f32(), map.tile_count());

    let center = TileKey::new(args.center_x, args.center_z);
    let quality = DisplayQuality::from(args.quality);
    let rings = map.visible_tiles(center, quality);

    let triangles = loop {
        map.update();
        let mut missing = 0;
        let mut triangles = 0usize;
        for &(key, level) in &rings {
            match map.render_quad(key.x, key.z, level) {
                Some(draw) => triangles += draw.triangle_count(),
                None => missing += 1,
            }
        }
        if missing == 0 {
            break triangles;
        }
        if Instant::now() > deadline {
            return Err(format!("timed out with {missing} tiles still missing").into());
        }
        thread::sleep(FRAME);
    };

    let (mut uploads, mut reuploads, mut releases) = (0, 0, 0);
    for op in map.take_buffer_ops() {
        match op {
            BufferOp::Upload { .. } => uploads += 1,
            BufferOp::Reupload { .. } => reuploads += 1,
            BufferOp::Release { .. } => releases += 1,
        }
    }

    let h = map.tile_value(center.x, center.z, 64, 64);
    info!("view around {center:?}: {} tiles, {triangles} triangles, ground at centre {h:.2}", rings.len());
    info!("buffer ops: {uploads} uploads, {reuploads} reuploads, {releases} releases");
    info!("{:?}", map.stats());
    Ok(())
}

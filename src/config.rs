// src/config.rs
// -------------
// Global knobs for tile generation + streaming, and the runtime settings document.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::generator::HeightFieldConfig;

// Tiles are always generated from a 2^7 fractal: 128x128 cells, 129x129 samples.
pub const DETAIL_HIGH_POW: u32 = 7;
pub const DETAIL_HIGH_COUNT: usize = 1 << DETAIL_HIGH_POW;
pub const DETAIL_MEDIUM_COUNT: usize = DETAIL_HIGH_COUNT / 2;
pub const DETAIL_LOW_COUNT: usize = DETAIL_HIGH_COUNT / 4;

// Samples per tile edge.
pub const TILE_SIDE: usize = DETAIL_HIGH_COUNT + 1;

// Upper bound on live tiles; oldest beyond this are evicted in `update()`.
pub const MAX_LIVE_TILES: usize = 100;

// How long the worker blocks on an empty queue before re-checking its stop flag.
pub const WORKER_POLL_MS: u64 = 50;

// RegenerateUntilInRange gives up after this many draws.
pub const REGENERATE_ATTEMPTS: u32 = 1000;

// Marker for "not computed yet" grid cells. Must stay outside [0, 1].
pub const UNSET_HEIGHT: f32 = -2.0;

pub const DEFAULT_SCALE: Vec3 = Vec3::new(10.0, 10.0, 10.0);

// Length of the staged init spiral (5x5 around the origin).
pub const INIT_STEPS: usize = 25;

/// Runtime settings for a terrain map, loadable from TOML.
///
/// Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerrainSettings {
    pub fractal: HeightFieldConfig,
    pub scale: [f32; 3],
    pub max_tiles: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            fractal: HeightFieldConfig::default(),
            scale: DEFAULT_SCALE.to_array(),
            max_tiles: MAX_LIVE_TILES,
        }
    }
}

impl TerrainSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: TerrainSettings = toml::from_str(raw)?;
        settings.fractal.validate()?;
        Ok(settings)
    }

    #[inline]
    pub fn scale_vec(&self) -> Vec3 {
        Vec3::from_array(self.scale)
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<TerrainSettings, ConfigError> {
    let raw = fs::read_to_string(path)?;
    TerrainSettings::from_toml_str(&raw)
}

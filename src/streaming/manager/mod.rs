
// src/streaming/manager/mod.rs
pub mod spiral;
mod schedule;
mod stats;
mod uploads;

pub use stats::MapStats;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use glam::Vec3;
use log::{debug, info};
use rustc_hash::FxHashSet as HashSet;

use crate::config::{self, TerrainSettings};
use crate::error::{ConfigError, TerrainError};
use crate::world::generator::HeightFieldConfig;

use crate::streaming::{
    cache::SharedCache,
    tile::Tile,
    types::*,
    workers::TileWorker,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InitState {
    NotStarted,
    // SPIRAL[step] is the tile being waited on
    Initializing { step: usize },
    Done,
}

/// Owner of the tile lattice: cache, pending tasks, eviction, staged init.
///
/// All methods are called from one thread (the frame loop). Generation runs on the
/// map's own worker thread, which is stopped and joined on drop.
pub struct TerrainMap {
    pub(crate) cache: SharedCache,
    pub(crate) pending: HashSet<TileKey>,
    pub(crate) buffer_ops: Vec<BufferOp>,

    pub(crate) epoch: Arc<AtomicU64>,

    pub(crate) config: HeightFieldConfig,
    pub(crate) scale: Vec3,
    pub(crate) max_tiles: usize,

    pub(crate) init: InitState,

    // declared last: dropped (stopped + joined) after the state above is gone
    pub(crate) worker: TileWorker,
}

impl TerrainMap {
    pub fn new(settings: &TerrainSettings) -> Result<Self, TerrainError> {
        let config = HeightFieldConfig { size: config::DETAIL_HIGH_POW, ..settings.fractal };
        config.validate().map_err(ConfigError::from)?;

        let cache = SharedCache::new();
        let epoch = Arc::new(AtomicU64::new(0));
        let worker = TileWorker::spawn(cache.clone(), Arc::clone(&epoch))?;

        Ok(Self {
            cache,
            pending: HashSet::default(),
            buffer_ops: Vec::new(),
            epoch,
            config,
            scale: settings.scale_vec(),
            max_tiles: settings.max_tiles.max(1),
            init: InitState::NotStarted,
            worker,
        })
    }

    /// Staged startup. Call once per frame (after `update()`) until it returns true.
    pub fn init(&mut self) -> bool {
        match self.init {
            InitState::NotStarted => {
                info!("initializing terrain map");
                self.clear();
                self.init = InitState::Initializing { step: 0 };
                if let Some(k) = spiral::spiral_key(0) {
                    self.schedule_task(k);
                }
                false
            }
            InitState::Initializing { step } => {
                let Some(target) = spiral::spiral_key(step) else {
                    self.init = InitState::Done;
                    return true;
                };

                if !self.cache.lock().contains(&target) {
                    // may have been refused earlier while a neighbour was pending
                    if !self.pending.contains(&target) {
                        self.schedule_task(target);
                    }
                    return false;
                }

                let next = step + 1;
                match spiral::spiral_key(next) {
                    Some(k) => {
                        self.init = InitState::Initializing { step: next };
                        self.schedule_task(k);
                        false
                    }
                    None => {
                        info!("terrain map initialized");
                        self.init = InitState::Done;
                        true
                    }
                }
            }
            InitState::Done => true,
        }
    }

    /// Completed init steps over `INIT_STEPS`, in [0, 1].
    pub fn init_progress(&self) -> f32 {
        match self.init {
            InitState::NotStarted => 0.0,
            InitState::Initializing { step } => step as f32 / config::INIT_STEPS as f32,
            InitState::Done => 1.0,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init == InitState::Done
    }

    /// Per-frame maintenance: harvest finished tiles, evict beyond capacity.
    /// Never blocks on the worker. Returns how many tiles became live.
    pub fn update(&mut self) -> usize {
        schedule::harvest_done(self)
    }

    /// Requests generation of `key` unless it, or a side neighbour, is already in flight.
    pub fn schedule_task(&mut self, key: TileKey) -> bool {
        schedule::schedule_task(self, key)
    }

    /// The tile at (x, z) at `level`, or `None` (and a scheduled task) if it is not live yet.
    pub fn render_quad(&mut self, x: i32, z: i32, level: DetailLevel) -> Option<TileDraw> {
        let key = TileKey::new(x, z);
        match self.cache.get(&key) {
            Some(tile) => Some(TileDraw { tile, level }),
            None => {
                self.schedule_task(key);
                None
            }
        }
    }

    /// Mean of the 4 corners of cell (tile_x, tile_z), in world units. 0.0 if the tile is not live.
    pub fn tile_value(&self, quad_x: i32, quad_z: i32, tile_x: i32, tile_z: i32) -> f32 {
        let Some(q) = self.cache.get(&TileKey::new(quad_x, quad_z)) else {
            return 0.0;
        };
        let sy = self.scale.y;
        let v1 = sy * q.value(tile_x, tile_z);
        let v2 = sy * q.value(tile_x + 1, tile_z);
        let v3 = sy * q.value(tile_x + 1, tile_z + 1);
        let v4 = sy * q.value(tile_x, tile_z + 1);
        (v1 + v2 + v3 + v4) / 4.0
    }

    /// Ground height under a position given relative to the centre of tile (quad_x, quad_z).
    pub fn ground_height(&self, quad_x: i32, quad_z: i32, local: Vec3) -> f32 {
        let qs = self.quad_size();
        let ts = self.quad_tile_size();
        let tile_x = ((local.x + 0.5 * qs.x) / ts.x) as i32;
        let tile_z = ((local.z + 0.5 * qs.z) / ts.z) as i32;
        self.tile_value(quad_x, quad_z, tile_x, tile_z)
    }

    /// Drops every tile and in-flight task; the next `init()` starts over.
    pub fn clear(&mut self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;

        let released = self.cache.lock().clear();
        for key in released {
            uploads::record(&mut self.buffer_ops, BufferOp::Release { key });
        }

        self.pending.clear();
        let discarded = self.worker.discard_completed();
        self.init = InitState::NotStarted;

        debug!("terrain map cleared (epoch {epoch}, {discarded} finished tiles discarded)");
    }

    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Applies to tiles generated from now on; `clear()` to rebuild the live ones.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// World-space extent of one tile. Height extent is twice the vertical scale.
    #[inline]
    pub fn quad_size(&self) -> Vec3 {
        let h = config::DETAIL_HIGH_COUNT as f32;
        Vec3::new(self.scale.x * h, 2.0 * self.scale.y, self.scale.z * h)
    }

    /// World-space extent of one grid cell.
    #[inline]
    pub fn quad_tile_size(&self) -> Vec3 {
        self.scale
    }

    #[inline]
    pub fn fractal_config(&self) -> &HeightFieldConfig {
        &self.config
    }

    /// Validates and stores a new generator config (size is always forced to the tile size).
    /// Applies to tiles generated from now on. Returns false and keeps the old one if invalid.
    pub fn set_fractal_config(&mut self, config: HeightFieldConfig) -> bool {
        let config = HeightFieldConfig { size: config::DETAIL_HIGH_POW, ..config };
        if let Err(why) = config.validate() {
            debug!("fractal config rejected: {why}");
            return false;
        }
        self.config = config;
        true
    }

    #[inline]
    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    pub fn tile(&self, key: TileKey) -> Option<Arc<Tile>> {
        self.cache.get(&key)
    }

    pub fn tile_count(&self) -> usize {
        self.cache.lock().len()
    }

    #[inline]
    pub fn is_pending(&self, key: TileKey) -> bool {
        self.pending.contains(&key)
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Buffer work recorded since the last call, oldest first. Drain once per frame.
    /// Ops for one key are coalesced; an Upload for a tile evicted before it was taken is dropped.
    pub fn take_buffer_ops(&mut self) -> Vec<BufferOp> {
        std::mem::take(&mut self.buffer_ops)
    }

    pub fn stats(&self) -> MapStats {
        stats::stats(self)
    }

    pub fn visible_tiles(&self, center: TileKey, quality: DisplayQuality) -> Vec<(TileKey, DetailLevel)> {
        spiral::visible_tiles(center, quality)
    }
}

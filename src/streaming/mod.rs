// src/streaming/mod.rs
// Tile generation, caching, and the map that ties them together.

pub mod manager;
pub mod tile;

mod cache;
mod types;
mod workers;

pub use cache::{SharedCache, TileCache};
pub use manager::{spiral, MapStats, TerrainMap};
pub use tile::{DetailBuffers, Tile};
pub use types::{BufferOp, DetailLevel, DisplayQuality, Neighbors, Refresh, Side, TileDone, TileDraw, TileKey, TileTask};
pub use workers::TileWorker;

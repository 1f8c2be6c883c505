//! Procedural terrain made of fractal height tiles, generated in the background
//! and kept in a bounded cache around the viewer.

pub mod config;
pub mod error;
pub mod streaming;
pub mod world;

pub use config::{load_settings, TerrainSettings};
pub use error::{ConfigError, InvalidConfig, TerrainError};
pub use streaming::{BufferOp, DetailLevel, DisplayQuality, TerrainMap, Tile, TileDraw, TileKey};
pub use world::{Fractal, HeightFieldConfig};

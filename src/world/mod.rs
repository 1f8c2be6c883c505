
pub mod generator;
pub mod grid;
pub mod hash;
pub mod preview;

pub use generator::{ClampingMode, DistributionKind, Fractal, HeightFieldConfig, MixingMode};
pub use grid::HeightGrid;
pub use hash::tile_seed;

// src/streaming/types.rs
use std::sync::Arc;

use glam::Vec3;

use crate::config::{DETAIL_HIGH_COUNT, DETAIL_LOW_COUNT, DETAIL_MEDIUM_COUNT};
use crate::world::generator::HeightFieldConfig;
use crate::world::hash::tile_seed;

use super::tile::Tile;

/// Integer lattice position of one tile. Ordered lexicographically by (x, z).
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct TileKey {
    pub x: i32,
    pub z: i32,
}

impl TileKey {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn seed(self) -> i32 {
        tile_seed(self.x, self.z)
    }

    #[inline]
    pub fn neighbor(self, side: Side) -> Self {
        let (dx, dz) = side.offset();
        Self { x: self.x + dx, z: self.z + dz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }
}

/// Tile edges, in neighbour-slot order.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    /// Lattice step towards the neighbour on this side. North is -z.
    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Side::North => (0, -1),
            Side::East => (1, 0),
            Side::South => (0, 1),
            Side::West => (-1, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Up to one tile per side, indexed by `Side::index()`. `None` = not generated yet.
pub type Neighbors = [Option<Arc<Tile>>; 4];

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum DetailLevel {
    High,
    Medium,
    Low,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [DetailLevel::High, DetailLevel::Medium, DetailLevel::Low];

    /// Cells per tile edge at this level.
    #[inline]
    pub fn cells(self) -> usize {
        match self {
            DetailLevel::High => DETAIL_HIGH_COUNT,
            DetailLevel::Medium => DETAIL_MEDIUM_COUNT,
            DetailLevel::Low => DETAIL_LOW_COUNT,
        }
    }

    /// High-detail cells folded into one cell of this level.
    #[inline]
    pub fn step(self) -> usize {
        DETAIL_HIGH_COUNT / self.cells()
    }

    #[inline]
    pub fn triangle_count(self) -> usize {
        2 * self.cells() * self.cells()
    }
}

/// User-facing render quality; picks the detail level per view ring.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Default)]
pub enum DisplayQuality {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

#[derive(Clone, Copy, Debug)]
pub struct TileTask {
    pub key: TileKey,
    pub epoch: u64,
    pub config: HeightFieldConfig,
    pub scale: Vec3,
}

/// Worker result. `tile` is `None` when generation failed; the key still leaves `pending`.
pub struct TileDone {
    pub key: TileKey,
    pub epoch: u64,
    pub tile: Option<Arc<Tile>>,
    // neighbour snapshots whose boundary normals now include `tile`
    pub refreshed: Vec<Refresh>,
}

/// A neighbour snapshot with new normals, and the neighbours they were computed from.
pub struct Refresh {
    pub tile: Arc<Tile>,
    pub around: Neighbors,
    pub scale: Vec3,
}

impl Refresh {
    /// True if `current` holds the same generations, side for side, as `around`.
    pub fn saw(&self, current: &Neighbors) -> bool {
        self.around.iter().zip(current.iter()).all(|(a, b)| match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_heights(b),
            _ => false,
        })
    }
}

/// Render-buffer work for the GPU layer, in the order it was recorded.
#[derive(Clone, Debug)]
pub enum BufferOp {
    Upload { key: TileKey, tile: Arc<Tile> },
    Reupload { key: TileKey, tile: Arc<Tile> },
    Release { key: TileKey },
}

impl BufferOp {
    #[inline]
    pub fn key(&self) -> TileKey {
        match self {
            BufferOp::Upload { key, .. } | BufferOp::Reupload { key, .. } | BufferOp::Release { key } => *key,
        }
    }
}

/// One tile at one detail level, ready to draw.
#[derive(Clone, Debug)]
pub struct TileDraw {
    pub tile: Arc<Tile>,
    pub level: DetailLevel,
}

impl TileDraw {
    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        self.tile.vertices(self.level)
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        self.tile.normals(self.level)
    }

    #[inline]
    pub fn vertex_bytes(&self) -> &[u8] {
        self.tile.vertex_bytes(self.level)
    }

    #[inline]
    pub fn normal_bytes(&self) -> &[u8] {
        self.tile.normal_bytes(self.level)
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.level.triangle_count()
    }
}

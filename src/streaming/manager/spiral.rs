// src/streaming/manager/spiral.rs
//
// Fixed 5x5 spiral around the origin: staged init order, and the render ring table.

use crate::config::INIT_STEPS;
use crate::streaming::types::{DetailLevel, DisplayQuality, TileKey};

pub const SPIRAL: [(i32, i32); INIT_STEPS] = [
    (0, 0),

    (1, 0), (1, 1), (0, 1), (-1, 1),
    (-1, 0), (-1, -1), (0, -1), (1, -1),

    (2, 0), (2, 1), (2, 2), (1, 2),
    (0, 2), (-1, 2), (-2, 2), (-2, 1),
    (-2, 0), (-2, -1), (-2, -2), (-1, -2),
    (0, -2), (1, -2), (2, -2), (2, -1),
];

// SPIRAL[RING_STARTS[r]..RING_STARTS[r + 1]] is ring r.
const RING_STARTS: [usize; 4] = [0, 1, 9, INIT_STEPS];

#[inline]
pub fn spiral_key(step: usize) -> Option<TileKey> {
    SPIRAL.get(step).map(|&(x, z)| TileKey::new(x, z))
}

/// Chebyshev ring of a spiral step (0, 1 or 2).
#[inline]
pub fn ring_of(step: usize) -> usize {
    RING_STARTS.iter().rposition(|&s| s <= step).unwrap_or(0).min(2)
}

pub fn detail_for_ring(ring: usize, quality: DisplayQuality) -> DetailLevel {
    use DisplayQuality::*;
    match (ring, quality) {
        (0, Low) => DetailLevel::Medium,
        (0, _) => DetailLevel::High,
        (1, High | VeryHigh) => DetailLevel::High,
        (1, _) => DetailLevel::Medium,
        (_, VeryHigh) => DetailLevel::High,
        _ => DetailLevel::Low,
    }
}

/// Tiles to draw around `center`, nearest ring first, each with its detail level.
pub fn visible_tiles(center: TileKey, quality: DisplayQuality) -> Vec<(TileKey, DetailLevel)> {
    SPIRAL
        .iter()
        .enumerate()
        .map(|(step, &(dx, dz))| (center.offset(dx, dz), detail_for_ring(ring_of(step), quality)))
        .collect()
}

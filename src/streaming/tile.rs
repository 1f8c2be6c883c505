// src/streaming/tile.rs
//
// One terrain tile: 129x129 heights, plus flat triangle buffers at three detail levels.
//
// Buffers are laid out per cell, x-major: cell (x, z) owns 6 vertices at 6 * (x * cells + z),
// two triangles (v1 v2 v3) (v3 v4 v1) over corners
//   v1 = (x, z)   v2 = (x+1, z)   v3 = (x+1, z+1)   v4 = (x, z+1)
//
// Neighbour edges (H = 128):
//   north tile row z = H  <->  our row z = 0
//   east  tile col x = 0  <->  our col x = H
//   south tile row z = 0  <->  our row z = H
//   west  tile col x = H  <->  our col x = 0

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::config::{DETAIL_HIGH_COUNT, TILE_SIDE};
use crate::error::TerrainError;
use crate::world::generator::Fractal;

use super::types::{DetailLevel, Neighbors, Side, TileKey};

const H: usize = DETAIL_HIGH_COUNT;

#[inline(always)]
fn idx(x: usize, z: usize) -> usize {
    z * TILE_SIDE + x
}

/// Per-level flat vertex attribute buffers (positions or normals).
#[derive(Clone, Debug, PartialEq)]
pub struct DetailBuffers {
    high: Vec<Vec3>,
    medium: Vec<Vec3>,
    low: Vec<Vec3>,
}

impl DetailBuffers {
    /// Builds the high buffer from per-corner values, then decimates it.
    fn from_corners(corner: impl Fn(usize, usize) -> Vec3) -> Self {
        let mut high = Vec::with_capacity(6 * H * H);
        for x in 0..H {
            for z in 0..H {
                let v1 = corner(x, z);
                let v2 = corner(x + 1, z);
                let v3 = corner(x + 1, z + 1);
                let v4 = corner(x, z + 1);
                high.extend_from_slice(&[v1, v2, v3, v3, v4, v1]);
            }
        }
        let medium = decimate(&high, DetailLevel::Medium);
        let low = decimate(&high, DetailLevel::Low);
        Self { high, medium, low }
    }

    #[inline]
    pub fn get(&self, level: DetailLevel) -> &[Vec3] {
        match level {
            DetailLevel::High => &self.high,
            DetailLevel::Medium => &self.medium,
            DetailLevel::Low => &self.low,
        }
    }
}

// A coarse cell spans `step` high cells; each corner is taken from the high cell
// that owns that corner.
fn decimate(high: &[Vec3], level: DetailLevel) -> Vec<Vec3> {
    let n = level.cells();
    let step = level.step();
    let at = |cx: usize, cz: usize, k: usize| high[6 * (cx * H + cz) + k];

    let mut out = Vec::with_capacity(6 * n * n);
    for x in 0..n {
        for z in 0..n {
            let (bx, bz) = (step * x, step * z);
            let (tx, tz) = (bx + step - 1, bz + step - 1);
            out.extend_from_slice(&[
                at(bx, bz, 0),
                at(tx, bz, 1),
                at(tx, tz, 2),
                at(tx, tz, 3),
                at(bx, tz, 4),
                at(bx, bz, 5),
            ]);
        }
    }
    out
}

#[derive(Clone)]
pub struct Tile {
    key: TileKey,
    heights: Arc<[f32]>,
    vertices: Arc<DetailBuffers>,
    normals: Arc<DetailBuffers>,
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile").field("key", &self.key).finish_non_exhaustive()
    }
}

impl Tile {
    /// Generates the tile at `key`, pre-seeding shared edges from `neighbors`.
    ///
    /// `fractal` must be configured with a `TILE_SIDE` grid.
    pub fn generate(
        key: TileKey,
        neighbors: &Neighbors,
        scale: Vec3,
        fractal: &mut Fractal,
    ) -> Result<Tile, TerrainError> {
        if fractal.size() != TILE_SIDE {
            return Err(TerrainError::GridSizeMismatch { expected: TILE_SIDE, found: fractal.size() });
        }

        fractal.clear();
        for side in Side::ALL {
            let Some(n) = &neighbors[side.index()] else { continue };
            for i in 0..TILE_SIDE {
                let (ours, theirs) = edge_cells(side, i);
                let (x, z) = (ours.0 as i32, ours.1 as i32);
                // a corner shared with an earlier side keeps that side's value
                let corner = i == 0 || i == H;
                if corner && !fractal.grid().is_unset(x, z) {
                    continue;
                }
                fractal.set_value(x, z, n.heights[idx(theirs.0, theirs.1)]);
            }
        }

        fractal.generate(key.seed());

        let mut heights = fractal.grid().values().to_vec();
        for side in Side::ALL {
            if neighbors[side.index()].is_none() {
                smooth_free_edge(&mut heights, side);
            }
        }

        let dx = -0.5 * scale.x * H as f32;
        let dz = -0.5 * scale.z * H as f32;
        let vertices = DetailBuffers::from_corners(|x, z| {
            Vec3::new(dx + scale.x * x as f32, scale.y * heights[idx(x, z)], dz + scale.z * z as f32)
        });

        let normals = compute_normals(&heights, &edge_view(neighbors), scale);

        Ok(Tile {
            key,
            heights: heights.into(),
            vertices: Arc::new(vertices),
            normals: Arc::new(normals),
        })
    }

    /// Smooth per-vertex normals given the current set of neighbours.
    pub fn calculate_normals(&self, neighbors: &Neighbors, scale: Vec3) -> DetailBuffers {
        compute_normals(&self.heights, &edge_view(neighbors), scale)
    }

    /// Same heights and vertices, new normals.
    pub fn with_normals(&self, normals: DetailBuffers) -> Tile {
        Tile {
            key: self.key,
            heights: Arc::clone(&self.heights),
            vertices: Arc::clone(&self.vertices),
            normals: Arc::new(normals),
        }
    }

    #[inline]
    pub fn key(&self) -> TileKey {
        self.key
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.key.seed()
    }

    /// Height sample at grid point (x, z), 0..=128 on both axes. Out of range is 0.0.
    #[inline]
    pub fn value(&self, x: i32, z: i32) -> f32 {
        if x < 0 || z < 0 || x as usize >= TILE_SIDE || z as usize >= TILE_SIDE {
            return 0.0;
        }
        self.heights[idx(x as usize, z as usize)]
    }

    /// True when both snapshots come from the same generation run.
    #[inline]
    pub fn same_heights(&self, other: &Tile) -> bool {
        Arc::ptr_eq(&self.heights, &other.heights)
    }

    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    pub fn vertices(&self, level: DetailLevel) -> &[Vec3] {
        self.vertices.get(level)
    }

    #[inline]
    pub fn normals(&self, level: DetailLevel) -> &[Vec3] {
        self.normals.get(level)
    }

    #[inline]
    pub fn vertex_bytes(&self, level: DetailLevel) -> &[u8] {
        bytemuck::cast_slice(self.vertices(level))
    }

    #[inline]
    pub fn normal_bytes(&self, level: DetailLevel) -> &[u8] {
        bytemuck::cast_slice(self.normals(level))
    }

    #[inline]
    pub fn triangle_count(&self, level: DetailLevel) -> usize {
        level.triangle_count()
    }
}

// i-th sample along `side`: (our cell, matching cell in the neighbour on that side).
#[inline]
fn edge_cells(side: Side, i: usize) -> ((usize, usize), (usize, usize)) {
    match side {
        Side::North => ((i, 0), (i, H)),
        Side::East => ((H, i), (0, i)),
        Side::South => ((i, H), (i, 0)),
        Side::West => ((0, i), (H, i)),
    }
}

// Every 4 samples along a free edge, the 3 inner ones are put on the line between the outer two.
fn smooth_free_edge(heights: &mut [f32], side: Side) {
    let at = |i: usize| {
        let (cell, _) = edge_cells(side, i);
        idx(cell.0, cell.1)
    };
    for i in (0..TILE_SIDE - 4).step_by(4) {
        let v0 = heights[at(i)];
        let v4 = heights[at(i + 4)];
        for k in 1..4 {
            heights[at(i + k)] = v0 + 0.25 * k as f32 * (v4 - v0);
        }
    }
}

type EdgeHeights<'a> = [Option<&'a [f32]>; 4];

fn edge_view(neighbors: &Neighbors) -> EdgeHeights<'_> {
    [0, 1, 2, 3].map(|i| neighbors[i].as_deref().map(|t| &t.heights[..]))
}

// Face normals (n1, n2) of the two triangles of cell (x, z).
#[inline]
fn face_normals(heights: &[f32], x: usize, z: usize, scale: Vec3) -> (Vec3, Vec3) {
    let p = |cx: usize, cz: usize| {
        Vec3::new(scale.x * cx as f32, scale.y * heights[idx(cx, cz)], scale.z * cz as f32)
    };
    let (v1, v2, v3, v4) = (p(x, z), p(x + 1, z), p(x + 1, z + 1), p(x, z + 1));
    ((v1 - v2).cross(v3 - v2), (v3 - v4).cross(v1 - v4))
}

fn compute_normals(heights: &[f32], neighbors: &EdgeHeights<'_>, scale: Vec3) -> DetailBuffers {
    let mut table = vec![Vec3::ZERO; TILE_SIDE * TILE_SIDE];

    for x in 0..H {
        for z in 0..H {
            let (n1, n2) = face_normals(heights, x, z, scale);
            table[idx(x, z)] += n1 + n2;
            table[idx(x + 1, z)] += n1;
            table[idx(x + 1, z + 1)] += n1 + n2;
            table[idx(x, z + 1)] += n2;
        }
    }

    // One ring of cells from each neighbour, touching our border vertices.
    if let Some(n) = neighbors[Side::North.index()] {
        for x in 0..H {
            let (n1, n2) = face_normals(n, x, H - 1, scale);
            table[idx(x, 0)] += n2;
            table[idx(x + 1, 0)] += n1 + n2;
        }
    }
    if let Some(n) = neighbors[Side::East.index()] {
        for z in 0..H {
            let (n1, n2) = face_normals(n, 0, z, scale);
            table[idx(H, z)] += n1 + n2;
            table[idx(H, z + 1)] += n2;
        }
    }
    if let Some(n) = neighbors[Side::South.index()] {
        for x in 0..H {
            let (n1, n2) = face_normals(n, x, 0, scale);
            table[idx(x, H)] += n1 + n2;
            table[idx(x + 1, H)] += n1;
        }
    }
    if let Some(n) = neighbors[Side::West.index()] {
        for z in 0..H {
            let (n1, n2) = face_normals(n, H - 1, z, scale);
            table[idx(0, z)] += n1;
            table[idx(0, z + 1)] += n1 + n2;
        }
    }

    for n in table.iter_mut() {
        *n = n.normalize_or_zero();
    }

    DetailBuffers::from_corners(|x, z| table[idx(x, z)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractal() -> Fractal {
        Fractal::new()
    }

    fn none() -> Neighbors {
        [None, None, None, None]
    }

    #[test]
    fn buffers_have_six_vertices_per_cell() {
        let t = Tile::generate(TileKey::new(0, 0), &none(), Vec3::splat(10.0), &mut fractal()).expect("tile");
        for level in DetailLevel::ALL {
            let n = level.cells();
            assert_eq!(t.vertices(level).len(), 6 * n * n);
            assert_eq!(t.normals(level).len(), 6 * n * n);
            assert_eq!(t.vertex_bytes(level).len(), 6 * n * n * 12);
            assert_eq!(t.triangle_count(level), 2 * n * n);
        }
    }

    #[test]
    fn vertices_are_centered_and_scaled() {
        let scale = Vec3::new(2.0, 50.0, 3.0);
        let t = Tile::generate(TileKey::new(1, 2), &none(), scale, &mut fractal()).expect("tile");
        let high = t.vertices(DetailLevel::High);

        let first = high[0];
        assert_eq!(first.x, -0.5 * 2.0 * 128.0);
        assert_eq!(first.z, -0.5 * 3.0 * 128.0);
        assert_eq!(first.y, 50.0 * t.value(0, 0));

        // last cell's v3 is the far corner
        let last = high[6 * (127 * 128 + 127) + 2];
        assert_eq!(last.x, 0.5 * 2.0 * 128.0);
        assert_eq!(last.z, 0.5 * 3.0 * 128.0);
        assert_eq!(last.y, 50.0 * t.value(128, 128));
    }

    #[test]
    fn medium_cell_spans_two_high_cells() {
        let t = Tile::generate(TileKey::new(0, 0), &none(), Vec3::ONE, &mut fractal()).expect("tile");
        let med = t.vertices(DetailLevel::Medium);
        let low = t.vertices(DetailLevel::Low);
        // cell (1, 0) at medium covers high corners (2, 0) .. (4, 2)
        let c = 6 * 64;
        assert_eq!(med[c].x, -64.0 + 2.0);
        assert_eq!(med[c + 2].x, -64.0 + 4.0);
        assert_eq!(med[c + 2].z, -64.0 + 2.0);
        // low cells are 4 wide
        assert_eq!(low[2].x - low[0].x, 4.0);
    }

    #[test]
    fn flat_tile_normals_point_up() {
        let heights = vec![0.5; TILE_SIDE * TILE_SIDE];
        let n = compute_normals(&heights, &[None; 4], Vec3::splat(10.0));
        for level in DetailLevel::ALL {
            for v in n.get(level) {
                assert!((*v - Vec3::Y).length() < 1e-5, "{v:?}");
            }
        }
    }

    #[test]
    fn neighbour_edge_is_copied() {
        let mut f = fractal();
        let west = Arc::new(Tile::generate(TileKey::new(0, 0), &none(), Vec3::ONE, &mut f).expect("west"));
        let mut n = none();
        n[Side::West.index()] = Some(Arc::clone(&west));
        let east = Tile::generate(TileKey::new(1, 0), &n, Vec3::ONE, &mut f).expect("east");
        for i in 0..=128 {
            assert_eq!(east.value(0, i), west.value(128, i));
        }
    }

    #[test]
    fn shared_corner_keeps_the_first_seeded_edge() {
        let mut f = fractal();
        // generated apart, so they disagree at the corner they both touch
        let north = Arc::new(Tile::generate(TileKey::new(0, -1), &none(), Vec3::ONE, &mut f).expect("north"));
        let west = Arc::new(Tile::generate(TileKey::new(-1, 0), &none(), Vec3::ONE, &mut f).expect("west"));
        let mut n = none();
        n[Side::North.index()] = Some(Arc::clone(&north));
        n[Side::West.index()] = Some(Arc::clone(&west));
        let t = Tile::generate(TileKey::new(0, 0), &n, Vec3::ONE, &mut f).expect("tile");

        for i in 0..=128 {
            assert_eq!(t.value(i, 0), north.value(i, 128), "north column {i}");
        }
        for i in 1..=128 {
            assert_eq!(t.value(0, i), west.value(128, i), "west row {i}");
        }
    }

    #[test]
    fn free_edges_are_piecewise_linear() {
        let t = Tile::generate(TileKey::new(-3, 5), &none(), Vec3::ONE, &mut fractal()).expect("tile");
        for i in (0..124).step_by(4) {
            let (a, b) = (t.value(i, 0), t.value(i + 4, 0));
            let mid = t.value(i + 2, 0);
            assert!((mid - (a + 0.5 * (b - a))).abs() < 1e-6);
        }
    }

    #[test]
    fn value_bounds() {
        let t = Tile::generate(TileKey::new(0, 0), &none(), Vec3::ONE, &mut fractal()).expect("tile");
        assert_eq!(t.value(-1, 0), 0.0);
        assert_eq!(t.value(0, 129), 0.0);
        assert!((0.0..=1.0).contains(&t.value(128, 128)));
    }

    #[test]
    fn refreshed_normals_keep_heights() {
        let mut f = fractal();
        let a = Tile::generate(TileKey::new(0, 0), &none(), Vec3::ONE, &mut f).expect("a");
        let mut n = none();
        n[Side::West.index()] = Some(Arc::new(a.clone()));
        let b = Arc::new(Tile::generate(TileKey::new(1, 0), &n, Vec3::ONE, &mut f).expect("b"));

        let mut an = none();
        an[Side::East.index()] = Some(b);
        let refreshed = a.with_normals(a.calculate_normals(&an, Vec3::ONE));
        assert!(refreshed.same_heights(&a));
        assert_ne!(refreshed.normals(DetailLevel::High), a.normals(DetailLevel::High));
    }

    #[test]
    fn wrong_grid_size_is_reported() {
        let mut f = fractal();
        let cfg = crate::world::generator::HeightFieldConfig { size: 4, ..*f.config() };
        assert!(f.set_config(cfg));
        let err = Tile::generate(TileKey::new(0, 0), &none(), Vec3::ONE, &mut f).unwrap_err();
        assert!(matches!(err, TerrainError::GridSizeMismatch { expected: 129, found: 17 }));
    }
}

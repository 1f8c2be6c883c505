// src/streaming/cache.rs
//
// Live tiles keyed by lattice position, plus insertion order for eviction.
// Shared between the map (writes) and the worker (neighbour reads) behind one mutex.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap as HashMap;

use super::tile::Tile;
use super::types::{Neighbors, Side, TileKey};

struct CachedTile {
    tile: Arc<Tile>,
    stamp: u64,
}

pub struct TileCache {
    map: HashMap<TileKey, CachedTile>,
    // (key, stamp) in insertion order; entries whose stamp no longer matches are stale
    order: VecDeque<(TileKey, u64)>,
    stamp: u64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache {
    pub fn new() -> Self {
        Self { map: HashMap::default(), order: VecDeque::new(), stamp: 1 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn get(&self, key: &TileKey) -> Option<&Arc<Tile>> {
        self.map.get(key).map(|e| &e.tile)
    }

    #[inline]
    pub fn contains(&self, key: &TileKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn neighbors(&self, key: TileKey) -> Neighbors {
        Side::ALL.map(|side| self.get(&key.neighbor(side)).cloned())
    }

    /// Inserts `tile` as the newest entry. Returns the snapshot it replaced, if any.
    pub fn insert(&mut self, tile: Arc<Tile>) -> Option<Arc<Tile>> {
        let key = tile.key();
        self.stamp = self.stamp.wrapping_add(1).max(1);
        let stamp = self.stamp;

        let old = self.map.insert(key, CachedTile { tile, stamp }).map(|e| e.tile);
        self.order.push_back((key, stamp));
        self.maybe_compact_order();
        old
    }

    /// Swaps in a new snapshot of an existing tile without touching its eviction age.
    ///
    /// Refused unless `tile` was derived from the cached snapshot (same heights).
    pub fn refresh(&mut self, tile: Arc<Tile>) -> bool {
        match self.map.get_mut(&tile.key()) {
            Some(e) if e.tile.same_heights(&tile) => {
                e.tile = tile;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, key: &TileKey) -> Option<Arc<Tile>> {
        self.map.remove(key).map(|e| e.tile)
    }

    /// Evicts oldest entries until at most `cap` remain. Returns evicted keys, oldest first.
    pub fn evict_over(&mut self, cap: usize) -> Vec<TileKey> {
        let mut evicted = Vec::new();
        while self.map.len() > cap {
            let Some((k, stamp)) = self.order.pop_front() else { break; };

            let current = self.map.get(&k).map(|e| e.stamp == stamp).unwrap_or(false);
            if !current { continue; }

            self.map.remove(&k);
            evicted.push(k);
        }
        evicted
    }

    /// Drops everything. Returns the keys that were live.
    pub fn clear(&mut self) -> Vec<TileKey> {
        let keys: Vec<TileKey> = self.map.keys().copied().collect();
        self.map.clear();
        self.order.clear();
        keys
    }

    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.map.keys().copied()
    }

    #[inline]
    pub fn order_len(&self) -> usize {
        self.order.len()
    }

    fn maybe_compact_order(&mut self) {
        let max = self.map.len().saturating_mul(8).max(1024);
        if self.order.len() <= max { return; }

        let mut live: Vec<(TileKey, u64)> = self.map.iter().map(|(k, e)| (*k, e.stamp)).collect();
        live.sort_by_key(|&(_, stamp)| stamp);
        self.order = live.into();
    }
}

/// Cloneable handle to the cache shared with the worker.
#[derive(Clone, Default)]
pub struct SharedCache(Arc<Mutex<TileCache>>);

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are immutable snapshots, so a panic elsewhere cannot leave them half-written.
    pub fn lock(&self) -> MutexGuard<'_, TileCache> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &TileKey) -> Option<Arc<Tile>> {
        self.lock().get(key).cloned()
    }

    /// All four neighbours of `key`, gathered under one lock.
    pub fn neighbors(&self, key: TileKey) -> Neighbors {
        self.lock().neighbors(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::generator::Fractal;
    use glam::Vec3;

    fn tiles(keys: &[(i32, i32)]) -> Vec<Arc<Tile>> {
        let mut f = Fractal::new();
        keys.iter()
            .map(|&(x, z)| {
                let none = [None, None, None, None];
                Arc::new(Tile::generate(TileKey::new(x, z), &none, Vec3::ONE, &mut f).expect("tile"))
            })
            .collect()
    }

    #[test]
    fn evicts_oldest_first() {
        let mut c = TileCache::new();
        for t in tiles(&[(0, 0), (2, 0), (4, 0), (6, 0)]) {
            c.insert(t);
        }
        let gone = c.evict_over(2);
        assert_eq!(gone, vec![TileKey::new(0, 0), TileKey::new(2, 0)]);
        assert_eq!(c.len(), 2);
        assert!(c.contains(&TileKey::new(6, 0)));
    }

    #[test]
    fn reinsert_moves_to_back() {
        let mut c = TileCache::new();
        let ts = tiles(&[(0, 0), (2, 0)]);
        c.insert(Arc::clone(&ts[0]));
        c.insert(Arc::clone(&ts[1]));
        c.insert(Arc::clone(&ts[0]));
        assert_eq!(c.evict_over(1), vec![TileKey::new(2, 0)]);
        assert!(c.contains(&TileKey::new(0, 0)));
    }

    #[test]
    fn refresh_keeps_age_and_checks_origin() {
        let mut c = TileCache::new();
        let ts = tiles(&[(0, 0), (2, 0), (0, 0)]);
        c.insert(Arc::clone(&ts[0]));
        c.insert(Arc::clone(&ts[1]));

        let renormaled = Arc::new(ts[0].with_normals(ts[0].calculate_normals(&[None, None, None, None], Vec3::ONE)));
        assert!(c.refresh(renormaled));
        // a fresh generation of the same key is a different snapshot
        assert!(!c.refresh(Arc::clone(&ts[2])));

        assert_eq!(c.evict_over(1), vec![TileKey::new(0, 0)]);
    }

    #[test]
    fn neighbors_match_sides() {
        let mut c = TileCache::new();
        for t in tiles(&[(0, -1), (-1, 0)]) {
            c.insert(t);
        }
        let n = c.neighbors(TileKey::new(0, 0));
        assert_eq!(n[Side::North.index()].as_ref().map(|t| t.key()), Some(TileKey::new(0, -1)));
        assert!(n[Side::East.index()].is_none());
        assert!(n[Side::South.index()].is_none());
        assert_eq!(n[Side::West.index()].as_ref().map(|t| t.key()), Some(TileKey::new(-1, 0)));
    }

    #[test]
    fn clear_reports_live_keys() {
        let mut c = TileCache::new();
        for t in tiles(&[(0, 0), (3, 3)]) {
            c.insert(t);
        }
        let mut keys = c.clear();
        keys.sort();
        assert_eq!(keys, vec![TileKey::new(0, 0), TileKey::new(3, 3)]);
        assert!(c.is_empty());
        assert_eq!(c.order_len(), 0);
    }
}

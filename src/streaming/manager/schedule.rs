// src/streaming/manager/schedule.rs
//
// Task dispatch and harvesting of finished tiles.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, warn};
use rustc_hash::FxHashSet as HashSet;

use crate::streaming::cache::TileCache;
use crate::streaming::types::*;

use super::{uploads, TerrainMap};

/// A tile is worth scheduling only if neither it nor any side neighbour is in flight.
#[inline]
pub fn can_schedule(pending: &HashSet<TileKey>, cache: &TileCache, key: TileKey) -> bool {
    if cache.contains(&key) || pending.contains(&key) {
        return false;
    }
    !Side::ALL.iter().any(|&s| pending.contains(&key.neighbor(s)))
}

pub fn schedule_task(map: &mut TerrainMap, key: TileKey) -> bool {
    if !can_schedule(&map.pending, &map.cache.lock(), key) {
        return false;
    }

    let task = TileTask {
        key,
        epoch: map.epoch.load(Ordering::Acquire),
        config: map.config,
        scale: map.scale,
    };
    if !map.worker.schedule_task(task) {
        warn!("tile worker is gone, {key:?} not scheduled");
        return false;
    }

    map.pending.insert(key);
    debug!("scheduled tile {key:?}");
    true
}

/// Drains finished tiles into the cache, applies neighbour refreshes, then evicts down
/// to capacity. Returns how many tiles were inserted.
pub fn harvest_done(map: &mut TerrainMap) -> usize {
    let epoch = map.epoch.load(Ordering::Acquire);
    let mut inserted = 0;
    let mut refreshes = Vec::new();

    let mut cache = map.cache.lock();

    while let Some(done) = map.worker.poll_completed() {
        if done.epoch != epoch {
            debug!("discarding stale tile {:?} (epoch {})", done.key, done.epoch);
            continue;
        }

        map.pending.remove(&done.key);
        let Some(tile) = done.tile else {
            warn!("tile {:?} failed, free to schedule again", done.key);
            continue;
        };

        cache.insert(Arc::clone(&tile));
        uploads::record(&mut map.buffer_ops, BufferOp::Upload { key: done.key, tile });
        inserted += 1;
        refreshes.extend(done.refreshed);

        debug!("tile {:?} ready ({} live)", done.key, cache.len());
    }

    // Newest first, one per neighbour. Each was computed against the cache as the worker
    // saw it; if a side has changed since, recompute against what is live now.
    let mut refreshed = HashSet::default();
    for r in refreshes.into_iter().rev() {
        let key = r.tile.key();
        if !refreshed.insert(key) {
            continue;
        }
        // evicted or regenerated since: the live snapshot keeps its own normals
        let Some(live) = cache.get(&key).cloned() else { continue };
        if !live.same_heights(&r.tile) {
            continue;
        }

        let around = cache.neighbors(key);
        let tile = if r.saw(&around) {
            r.tile
        } else {
            Arc::new(live.with_normals(live.calculate_normals(&around, r.scale)))
        };
        if cache.refresh(Arc::clone(&tile)) {
            uploads::record(&mut map.buffer_ops, BufferOp::Reupload { key, tile });
        }
    }

    for key in cache.evict_over(map.max_tiles) {
        debug!("evicted tile {key:?}");
        uploads::record(&mut map.buffer_ops, BufferOp::Release { key });
    }

    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_neighbour_blocks_scheduling() {
        let cache = TileCache::new();
        let mut pending = HashSet::default();
        pending.insert(TileKey::new(0, 0));

        assert!(!can_schedule(&pending, &cache, TileKey::new(0, 0)));
        assert!(!can_schedule(&pending, &cache, TileKey::new(1, 0)));
        assert!(!can_schedule(&pending, &cache, TileKey::new(0, -1)));
        // diagonals do not share an edge
        assert!(can_schedule(&pending, &cache, TileKey::new(1, 1)));
        assert!(can_schedule(&pending, &cache, TileKey::new(2, 0)));
    }
}

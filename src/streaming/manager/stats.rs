// src/streaming/manager/stats.rs
use std::sync::atomic::Ordering;

use super::TerrainMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapStats {
    pub live_tiles: u32,
    pub pending: u32,

    // worker side
    pub queued_tasks: u32,
    pub done_backlog: u32,

    pub buffer_ops: u32,
    pub order_len: u32,

    pub epoch: u64,
    pub init_progress: f32,
}

pub fn stats(map: &TerrainMap) -> MapStats {
    let (live, order) = {
        let c = map.cache.lock();
        (c.len(), c.order_len())
    };

    MapStats {
        live_tiles: live as u32,
        pending: map.pending.len() as u32,
        queued_tasks: map.worker.queued() as u32,
        done_backlog: map.worker.completed_backlog() as u32,
        buffer_ops: map.buffer_ops.len() as u32,
        order_len: order as u32,
        epoch: map.epoch.load(Ordering::Acquire),
        init_progress: map.init_progress(),
    }
}

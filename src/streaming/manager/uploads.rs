// src/streaming/manager/uploads.rs
//
// Buffer-op queue. Ops for one key are coalesced so the queue holds at most a
// Release followed by one Upload/Reupload per key, and never an Upload for a tile
// that has already left the cache.

use crate::streaming::types::BufferOp;

pub fn record(ops: &mut Vec<BufferOp>, op: BufferOp) {
    let key = op.key();
    let Some(at) = ops.iter().rposition(|o| o.key() == key) else {
        ops.push(op);
        return;
    };

    let last_is_release = matches!(ops[at], BufferOp::Release { .. });
    match (last_is_release, op) {
        (true, BufferOp::Release { .. }) => {}
        (true, op) => ops.push(op),
        (false, BufferOp::Release { key }) => {
            // an upload that never reached the GPU needs no release
            if !matches!(ops.remove(at), BufferOp::Upload { .. }) {
                ops.push(BufferOp::Release { key });
            }
        }
        // newer snapshot of the same buffer: keep the kind, swap the tile
        (false, BufferOp::Upload { tile, .. } | BufferOp::Reupload { tile, .. }) => {
            if let BufferOp::Upload { tile: old, .. } | BufferOp::Reupload { tile: old, .. } = &mut ops[at] {
                *old = tile;
            }
        }
    }
}

// src/streaming/workers.rs
//
// Single background thread that turns TileTasks into finished tiles.
// It owns its own Fractal; the only shared state it touches is the tile cache (read-only)
// and the map epoch.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::config::{DETAIL_HIGH_POW, WORKER_POLL_MS};
use crate::error::{ConfigError, TerrainError};
use crate::world::generator::{Fractal, HeightFieldConfig};

use super::cache::SharedCache;
use super::tile::Tile;
use super::types::{Refresh, Side, TileDone, TileTask};

pub struct TileWorker {
    tx_task: Sender<TileTask>,
    rx_done: Receiver<TileDone>,
    stop: Arc<AtomicBool>,
    exit_code: Arc<AtomicI32>,
    handle: Option<JoinHandle<i32>>,
}

impl TileWorker {
    pub fn spawn(cache: SharedCache, epoch: Arc<AtomicU64>) -> Result<Self, TerrainError> {
        let (tx_task, rx_task) = unbounded::<TileTask>();
        let (tx_done, rx_done) = unbounded::<TileDone>();
        let stop = Arc::new(AtomicBool::new(false));
        let exit_code = Arc::new(AtomicI32::new(0));

        let ctx = WorkerCtx {
            rx_task,
            tx_done,
            cache,
            epoch,
            stop: Arc::clone(&stop),
            exit_code: Arc::clone(&exit_code),
        };

        let handle = std::thread::Builder::new()
            .name("tile-worker".into())
            .spawn(move || ctx.run())
            .map_err(TerrainError::WorkerSpawn)?;

        Ok(Self { tx_task, rx_done, stop, exit_code, handle: Some(handle) })
    }

    /// Queues a task. Returns false once the worker has exited.
    pub fn schedule_task(&self, task: TileTask) -> bool {
        self.tx_task.send(task).is_ok()
    }

    /// Non-blocking pop of one finished tile.
    pub fn poll_completed(&self) -> Option<TileDone> {
        self.rx_done.try_recv().ok()
    }

    /// Drops everything already finished. Returns how many results were discarded.
    pub fn discard_completed(&self) -> usize {
        self.rx_done.try_iter().count()
    }

    #[inline]
    pub fn queued(&self) -> usize {
        self.tx_task.len()
    }

    #[inline]
    pub fn completed_backlog(&self) -> usize {
        self.rx_done.len()
    }

    /// Asks the loop to exit after its current task.
    pub fn request_stop(&self, exit_code: i32) {
        self.exit_code.store(exit_code, Ordering::Relaxed);
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Waits for the thread to exit and returns its exit code.
    pub fn join(&mut self) -> Result<i32, TerrainError> {
        match self.handle.take() {
            Some(h) => h.join().map_err(|_| TerrainError::WorkerPanicked),
            None => Ok(self.exit_code.load(Ordering::Relaxed)),
        }
    }
}

impl Drop for TileWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.request_stop(0);
            if let Err(e) = self.join() {
                warn!("{e}");
            }
        }
    }
}

struct WorkerCtx {
    rx_task: Receiver<TileTask>,
    tx_done: Sender<TileDone>,
    cache: SharedCache,
    epoch: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    exit_code: Arc<AtomicI32>,
}

impl WorkerCtx {
    fn run(self) -> i32 {
        info!("tile worker started");
        let mut fractal = Fractal::new();
        let poll = Duration::from_millis(WORKER_POLL_MS);

        while !self.stop.load(Ordering::Acquire) {
            let task = match self.rx_task.recv_timeout(poll) {
                Ok(t) => t,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            if task.epoch != self.epoch.load(Ordering::Acquire) {
                debug!("skipping stale task {:?} (epoch {})", task.key, task.epoch);
                continue;
            }

            let done = build(&task, &self.cache, &mut fractal).unwrap_or_else(|e| {
                warn!("tile {:?} failed: {e}", task.key);
                TileDone { key: task.key, epoch: task.epoch, tile: None, refreshed: Vec::new() }
            });
            if self.tx_done.send(done).is_err() {
                break;
            }
        }

        let code = self.exit_code.load(Ordering::Relaxed);
        info!("tile worker exiting with code {code}");
        code
    }
}

fn build(task: &TileTask, cache: &SharedCache, fractal: &mut Fractal) -> Result<TileDone, TerrainError> {
    let config = HeightFieldConfig { size: DETAIL_HIGH_POW, ..task.config };
    if *fractal.config() != config {
        config.validate().map_err(ConfigError::from)?;
        fractal.set_config(config);
    }

    let neighbors = cache.neighbors(task.key);
    let tile = Arc::new(Tile::generate(task.key, &neighbors, task.scale, fractal)?);

    // Each existing neighbour gets new boundary normals that account for this tile.
    let mut refreshed = Vec::new();
    for side in Side::ALL {
        let Some(n) = &neighbors[side.index()] else { continue };
        let mut around = cache.neighbors(n.key());
        around[side.opposite().index()] = Some(Arc::clone(&tile));
        let normals = n.calculate_normals(&around, task.scale);
        refreshed.push(Refresh { tile: Arc::new(n.with_normals(normals)), around, scale: task.scale });
    }

    Ok(TileDone { key: task.key, epoch: task.epoch, tile: Some(tile), refreshed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::types::TileKey;
    use glam::Vec3;
    use std::time::Instant;

    fn task(key: TileKey, epoch: u64) -> TileTask {
        TileTask { key, epoch, config: HeightFieldConfig::default(), scale: Vec3::ONE }
    }

    fn wait(worker: &TileWorker) -> Option<TileDone> {
        let deadline = Instant::now() + Duration::from_secs(20);
        while Instant::now() < deadline {
            if let Some(d) = worker.poll_completed() {
                return Some(d);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn produces_tile_and_stops_with_code() {
        let cache = SharedCache::new();
        let epoch = Arc::new(AtomicU64::new(0));
        let mut w = TileWorker::spawn(cache, epoch).expect("spawn");

        assert!(w.schedule_task(task(TileKey::new(2, 3), 0)));
        let done = wait(&w).expect("tile in time");
        assert_eq!(done.key, TileKey::new(2, 3));
        assert_eq!(done.tile.as_ref().map(|t| t.key()), Some(TileKey::new(2, 3)));
        assert!(done.refreshed.is_empty());

        w.request_stop(7);
        assert_eq!(w.join().expect("join"), 7);
        assert!(!w.is_running());
    }

    #[test]
    fn stale_epoch_is_skipped() {
        let cache = SharedCache::new();
        let epoch = Arc::new(AtomicU64::new(1));
        let w = TileWorker::spawn(cache, epoch).expect("spawn");

        w.schedule_task(task(TileKey::new(0, 0), 0));
        w.schedule_task(task(TileKey::new(5, 5), 1));
        let done = wait(&w).expect("tile in time");
        assert_eq!(done.key, TileKey::new(5, 5));
        assert!(w.poll_completed().is_none());
    }

    #[test]
    fn existing_neighbours_are_refreshed() {
        let cache = SharedCache::new();
        let epoch = Arc::new(AtomicU64::new(0));
        let w = TileWorker::spawn(cache.clone(), epoch).expect("spawn");

        w.schedule_task(task(TileKey::new(0, 0), 0));
        let first = wait(&w).expect("first");
        let first = first.tile.expect("first tile");
        cache.lock().insert(Arc::clone(&first));

        w.schedule_task(task(TileKey::new(1, 0), 0));
        let second = wait(&w).expect("second");
        assert_eq!(second.refreshed.len(), 1);
        let r = &second.refreshed[0];
        assert_eq!(r.tile.key(), TileKey::new(0, 0));
        assert!(r.tile.same_heights(&first));
        // (0,0) saw the new tile to its east and nothing else
        let east = r.around[Side::East.index()].as_ref().expect("east");
        assert!(east.same_heights(second.tile.as_ref().expect("second tile")));
        assert!(r.saw(&r.around.clone()));
        assert!(!r.saw(&[None, None, None, None]));
        assert!(cache.lock().refresh(Arc::clone(&r.tile)));
    }

    #[test]
    fn failed_build_still_reports() {
        let cache = SharedCache::new();
        let epoch = Arc::new(AtomicU64::new(0));
        let w = TileWorker::spawn(cache, epoch).expect("spawn");

        let bad = HeightFieldConfig { normal_variance: 0.0, ..HeightFieldConfig::default() };
        w.schedule_task(TileTask { config: bad, ..task(TileKey::new(4, 4), 0) });
        let done = wait(&w).expect("failure result in time");
        assert_eq!(done.key, TileKey::new(4, 4));
        assert!(done.tile.is_none());
        assert!(done.refreshed.is_empty());

        // the worker keeps serving
        w.schedule_task(task(TileKey::new(4, 5), 0));
        assert!(wait(&w).expect("next").tile.is_some());
    }
}

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fractal_terrain::{TerrainMap, TerrainSettings, Tile, TileKey};

pub const DEADLINE: Duration = Duration::from_secs(120);

pub fn map() -> TerrainMap {
    TerrainMap::new(&TerrainSettings::default()).expect("terrain map")
}

/// Calls `update()` until `done` holds or the deadline passes.
pub fn pump_until(map: &mut TerrainMap, mut done: impl FnMut(&mut TerrainMap) -> bool) -> bool {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        map.update();
        if done(map) {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Schedules `key` and waits until it is live.
pub fn generate(map: &mut TerrainMap, key: TileKey) -> Arc<Tile> {
    assert!(map.schedule_task(key), "{key:?} not schedulable");
    assert!(pump_until(map, |m| m.tile(key).is_some()), "{key:?} never arrived");
    map.tile(key).expect("live tile")
}

pub fn init(map: &mut TerrainMap) {
    assert!(
        pump_until(map, |m| m.init()),
        "init stuck at {}",
        map.init_progress()
    );
}

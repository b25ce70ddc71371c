use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use log::error;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Name of the snapshot file inside the cache directory.
pub const SNAPSHOT_FILE_NAME: &str = "index.gob";

/// Plain copy of the index contents: key → deletion time in unix seconds.
pub type Snapshot = HashMap<String, u64>;

/// Concurrent map of live cache keys to their scheduled deletion times.
///
/// Every operation is safe under arbitrary concurrent callers, but
/// observations are point-in-time only: no check-then-act atomicity is
/// promised across calls. Callers needing write exclusion rely on the
/// filesystem (exclusive create), not on this map.
#[derive(Default)]
pub struct Index {
    entries: RwLock<FxHashMap<String, u64>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn store(&self, key: String, deletion_time: u64) {
        self.entries.write().insert(key, deletion_time);
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.entries.read().iter().map(|(key, time)| (key.clone(), *time)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the snapshot to `<cache_dir>/index.gob` via a temp file and
    /// rename. Errors are logged, never propagated.
    pub fn persist(&self, cache_dir: &Path) {
        if let Err(cause) = write_snapshot(self.snapshot(), cache_dir) {
            error!("index.persist: {cause}");
        }
    }
}

fn write_snapshot(snapshot: Snapshot, cache_dir: &Path) -> io::Result<()> {
    let tmp_path = cache_dir.join(format!("{SNAPSHOT_FILE_NAME}.tmp"));
    let mut file = fs::File::create(&tmp_path)?;
    bincode::encode_into_std_write(snapshot, &mut file, bincode::config::standard())
        .map_err(|cause| io::Error::new(io::ErrorKind::InvalidData, cause))?;
    fs::rename(&tmp_path, cache_dir.join(SNAPSHOT_FILE_NAME))
}

/// Reads the snapshot file back. The container only needs to round-trip
/// across runs of the same build.
pub fn read_snapshot(cache_dir: &Path) -> io::Result<Snapshot> {
    let mut file = fs::File::open(cache_dir.join(SNAPSHOT_FILE_NAME))?;
    bincode::decode_from_std_read(&mut file, bincode::config::standard())
        .map_err(|cause| io::Error::new(io::ErrorKind::InvalidData, cause))
}

//! Disk cache: lifespan evaluation, entry codec, entry files, the live
//! index and the store/retrieve facade tying them together.
//!
//! Liveness and storage are deliberately separate: the index says which
//! keys exist, the filesystem holds the bytes and serializes concurrent
//! writers through exclusive create. A crash can leave orphan files; they
//! are invisible (the index is authoritative) and get overwritten by a
//! later store for the same key.

pub mod entry;
pub mod file;
pub mod index;
pub mod key;
pub mod lifespan;
pub mod timestamp;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};

use crate::response::{CacheableResponse, CachedResponse};
use entry::EntryWriter;
use file::EntryFile;
use index::Index;

/// Store/retrieve facade over one cache directory. Cheap to clone; all
/// clones share the same index.
#[derive(Clone)]
pub struct Cache {
    shared: Arc<Shared>,
}

struct Shared {
    dir: PathBuf,
    index: Index,
}

impl Cache {
    pub fn new(dir: PathBuf) -> Self {
        Self { shared: Arc::new(Shared { dir, index: Index::new() }) }
    }

    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    pub fn index(&self) -> &Index {
        &self.shared.index
    }

    /// Caches `response` under `key` if its headers allow it. Losing the
    /// exclusive-create race is a silent skip; a failed write deletes the
    /// partial file and leaves the index untouched.
    pub async fn store(&self, response: CacheableResponse, key: &str) {
        let lifespan = lifespan::cache_lifespan(&response.headers);
        if lifespan.is_zero() {
            return;
        }
        let entry_file = EntryFile::new(self.dir(), key);
        let open_file = match entry_file.create().await {
            Ok(file) => file,
            Err(cause) => {
                debug!("file.create: {cause}");
                return;
            }
        };
        let mut writer = EntryWriter::new(open_file);
        if let Err(cause) = writer.write_entry(&response).await {
            error!("cache.store: {cause}");
            drop(writer);
            entry_file.delete().await;
            return;
        }
        drop(writer);
        self.index().store(key.to_owned(), deletion_time(lifespan));
        self.schedule_deletion(key.to_owned(), lifespan);
    }

    /// Serves `key` from disk. Keys absent from the index are absent, full
    /// stop, even when a file of that name exists. A malformed entry is
    /// evicted and reported absent; the next request refetches it.
    pub async fn retrieve(&self, key: &str) -> Option<CachedResponse> {
        if !self.index().contains(key) {
            return None;
        }
        let entry_file = EntryFile::new(self.dir(), key);
        let open_file = entry_file.open().await.ok()?;
        match entry::read_entry(open_file).await {
            Ok(response) => Some(response),
            Err(cause) => {
                warn!("cache.retrieve: {cause}");
                self.index().remove(key);
                entry_file.delete().await;
                None
            }
        }
    }

    /// Arms the one-shot deletion timer for `key`. On fire the key leaves
    /// the index first, then the file is unlinked; a reader that already
    /// holds an open handle keeps streaming, new opens see a miss. Timers
    /// are process-local and are rebuilt from the snapshot on boot.
    pub fn schedule_deletion(&self, key: String, delay: Duration) {
        let cache = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cache.index().remove(&key);
            EntryFile::new(cache.dir(), &key).delete().await;
        });
    }

    /// Rebuilds the index and its timers from the snapshot file, consuming
    /// it. Entries whose deletion time has passed are unlinked instead of
    /// restored. Errors are logged and leave the cache empty but serving.
    pub async fn restore(&self) {
        let loaded = index::read_snapshot(self.dir());
        let snapshot_path = self.dir().join(index::SNAPSHOT_FILE_NAME);
        if snapshot_path.exists() {
            if let Err(cause) = std::fs::remove_file(&snapshot_path) {
                warn!("index.load: {cause}");
            }
        }
        let snapshot = match loaded {
            Ok(snapshot) => snapshot,
            Err(cause) if cause.kind() == io::ErrorKind::NotFound => return,
            Err(cause) => {
                warn!("index.load: {cause}");
                return;
            }
        };
        let now = unix_now();
        for (key, deletion_time) in snapshot {
            if deletion_time <= now {
                EntryFile::new(self.dir(), &key).delete().await;
            } else {
                self.index().store(key.clone(), deletion_time);
                self.schedule_deletion(key, Duration::from_secs(deletion_time - now));
            }
        }
        info!("index.load: restored {} live entries", self.index().len());
    }

    /// Writes the index snapshot; called once, on graceful shutdown.
    pub fn persist(&self) {
        self.index().persist(self.dir());
    }
}

fn deletion_time(lifespan: Duration) -> u64 {
    unix_now() + lifespan.as_secs()
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

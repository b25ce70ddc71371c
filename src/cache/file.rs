use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use tokio::fs::{File, OpenOptions};

/// A single entry file at `<cache dir>/<key>`.
pub struct EntryFile {
    path: PathBuf,
}

impl EntryFile {
    pub fn new(cache_dir: &Path, key: &str) -> Self {
        Self { path: cache_dir.join(key) }
    }

    /// Exclusive create: fails if the file already exists, which serializes
    /// concurrent stores for the same key without an in-process lock. The
    /// loser simply does not cache.
    pub async fn create(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o666);
        options.open(&self.path).await
    }

    pub async fn open(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Unlinks the file. A missing file is logged and otherwise ignored;
    /// readers holding an open handle are unaffected.
    pub async fn delete(&self) {
        if let Err(cause) = tokio::fs::remove_file(&self.path).await {
            warn!("file.delete: {cause}");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

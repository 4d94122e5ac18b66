//! Snapshot store for persisting scraped tables to disk
//!
//! Provides a `SnapshotStore` that keeps the last snapshot as a JSON file,
//! written atomically so a later load never observes a partial write.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::Snapshot;

/// File name of the persisted snapshot inside the cache directory
const SNAPSHOT_FILE: &str = "enrollment_snapshot.json";

/// Bumped whenever the on-disk layout changes
const FORMAT_VERSION: u32 = 1;

/// Errors that can occur when saving a snapshot
#[derive(Debug, Error)]
pub enum StoreError {
    /// Directory creation or file write failed
    #[error("Failed to write snapshot: {0}")]
    Io(#[from] io::Error),

    /// Snapshot could not be encoded
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Envelope written to disk around the snapshot
#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot<T> {
    /// Layout version of this file
    format_version: u32,
    /// When the file was written
    saved_at: DateTime<Utc>,
    /// The snapshot itself
    snapshot: T,
}

/// Reads and writes the cached snapshot
///
/// The store keeps a single file in an XDG-compliant cache directory
/// (`~/.cache/enrollq/` on Linux). A missing or unreadable file loads as an
/// empty snapshot, which is stale and forces a refresh on the first query.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Directory where the snapshot file is stored
    cache_dir: PathBuf,
}

impl SnapshotStore {
    /// Creates a store in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "enrollq")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SNAPSHOT_FILE)
    }

    /// Loads the last persisted snapshot
    ///
    /// A missing file is the normal first-run case. A corrupt file, or one
    /// written with another format version, is treated the same way.
    pub fn load(&self) -> Snapshot {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no saved snapshot, starting empty");
                return Snapshot::empty();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable snapshot, starting empty");
                return Snapshot::empty();
            }
        };

        match serde_json::from_str::<StoredSnapshot<Snapshot>>(&content) {
            Ok(stored) if stored.format_version == FORMAT_VERSION => {
                info!(
                    departments = stored.snapshot.departments.len(),
                    last_update = ?stored.snapshot.last_update,
                    "loaded saved snapshot"
                );
                stored.snapshot
            }
            Ok(stored) => {
                warn!(
                    found = stored.format_version,
                    expected = FORMAT_VERSION,
                    "snapshot format version mismatch, starting empty"
                );
                Snapshot::empty()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt snapshot, starting empty");
                Snapshot::empty()
            }
        }
    }

    /// Persists the snapshot, replacing any previous one
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.cache_dir)?;

        let stored = StoredSnapshot {
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            snapshot,
        };
        let json = serde_json::to_string_pretty(&stored)?;

        write_atomic(&self.path(), json.as_bytes())?;
        debug!(path = %self.path().display(), "snapshot saved");
        Ok(())
    }
}

/// Writes via a temp file and rename so readers see old or new, never half
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)
}

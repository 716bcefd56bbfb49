//! Snapshot persistence.

use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::Snapshot;
use crate::error::WatchError;
use crate::fsx::{self as fs, item_key};

/// Loads and saves snapshots by tracked-item identifier.
///
/// Implementations must return an empty snapshot when none exists yet or when the stored
/// one cannot be read back, so the next check starts over instead of failing forever.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, item_id: &str) -> Result<Snapshot, WatchError>;
    fn save(&self, item_id: &str, snapshot: &Snapshot) -> Result<(), WatchError>;
}

/// Stores one pretty-printed JSON document per item under a directory.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, item_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", item_key(item_id)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self, item_id: &str) -> Result<Snapshot, WatchError> {
        let path = self.path_for(item_id);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "snapshot not found, starting empty");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(WatchError::io(&path)(e)),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot corrupted, starting empty");
                Ok(Snapshot::default())
            }
        }
    }

    fn save(&self, item_id: &str, snapshot: &Snapshot) -> Result<(), WatchError> {
        fs::create_dir_all(&self.dir).map_err(WatchError::io(&self.dir))?;
        let path = self.path_for(item_id);

        // Write beside the target and rename over it so readers never see half a file.
        let tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(WatchError::io(&self.dir))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush().map_err(WatchError::io(tmp.path()))?;
        }
        tmp.persist(&path).map_err(|e| WatchError::io(&path)(e.error))?;
        Ok(())
    }
}

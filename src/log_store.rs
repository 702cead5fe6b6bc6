use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::record::LogRecord;

const LOG_FILE_NAME: &str = "log.json";
const CORRUPT_SUFFIX: &str = "corrupt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The stored log exists but is not a valid record list.
    /// `backup` is where the unreadable data was moved. `None` means the data
    /// is still in the store.
    #[error("stored log is malformed: {source}")]
    Malformed {
        backup: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize log: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Durable home of the log: read once at startup, rewritten in full on each change,
/// removed on clear.
pub trait LogStore: Send {
    /// Returns the stored records, or an empty list when nothing is stored.
    fn load(&self) -> Result<Vec<LogRecord>, StoreError>;
    fn save(&self, records: &[LogRecord]) -> Result<(), StoreError>;
    /// Removes the stored entry entirely.
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileLogStore {
    path: PathBuf,
}

impl JsonFileLogStore {
    pub fn new() -> Self {
        let path = AppDirs::data_dir()
            .map(|dir| dir.join(LOG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First free name among `<path>.corrupt`, `<path>.corrupt.1`, `<path>.corrupt.2`...
    fn backup_path(&self) -> PathBuf {
        let candidate = |n: u32| {
            let mut name = self.path.as_os_str().to_owned();
            name.push(".");
            name.push(CORRUPT_SUFFIX);
            if n > 0 {
                name.push(format!(".{n}"));
            }
            PathBuf::from(name)
        };
        (0..)
            .map(candidate)
            .find(|p| fs::symlink_metadata(p).is_err())
            .unwrap_or_else(|| candidate(0))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Default for JsonFileLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore for JsonFileLogStore {
    fn load(&self) -> Result<Vec<LogRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored log");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_slice::<Vec<LogRecord>>(&bytes) {
            Ok(records) => {
                debug!(path = %self.path.display(), count = records.len(), "loaded log");
                Ok(records)
            }
            Err(source) => {
                // The unreadable file must be out of the way before anything is saved.
                let backup = self.backup_path();
                if let Err(e) = fs::rename(&self.path, &backup) {
                    warn!(error = %e, backup = %backup.display(), "could not move malformed log aside");
                    return Err(StoreError::Io { path: backup, source: e });
                }
                Err(StoreError::Malformed {
                    backup: Some(backup),
                    source,
                })
            }
        }
    }

    fn save(&self, records: &[LogRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let data = serde_json::to_vec(records).map_err(StoreError::Serialize)?;
        fs::write(&self.path, data).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), count = records.len(), "saved log");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory store holding the serialized text, so the json round trip is still
/// exercised. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The stored text, `None` when nothing is stored.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LogStore for MemoryLogStore {
    fn load(&self) -> Result<Vec<LogRecord>, StoreError> {
        match self.raw() {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|source| StoreError::Malformed { backup: None, source }),
        }
    }

    fn save(&self, records: &[LogRecord]) -> Result<(), StoreError> {
        let data = serde_json::to_string(records).map_err(StoreError::Serialize)?;
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(data);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

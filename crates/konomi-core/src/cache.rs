//! Durable local settings cache
//!
//! Keeps the last known settings document on disk so it survives restarts.
//! The snapshot is the full document, local-only fields included; only the
//! server transfer filters fields.
//!
//! Storage location: `<data_dir>/KonomiTV-Settings.json`
//!
//! Writes are atomic (write to temp file, then rename) so a crash never
//! leaves a half-written snapshot behind. Each write gets its own temp file,
//! and writes through one cache (or its clones) are serialized.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::settings::SettingsDocument;

/// File-backed settings cache
///
/// Last write wins; there is no versioning or merging. Clones share the
/// write lock.
#[derive(Debug, Clone)]
pub struct SettingsCache {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SettingsCache {
    /// Create a cache at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a cache at the configured location
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.settings_cache_path())
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a snapshot exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist a snapshot of the document
    pub fn write(&self, doc: &SettingsDocument) -> SyncResult<()> {
        let _lock = self.lock();
        self.write_locked(doc)
    }

    /// Persist whatever `current` returns, taken while holding the write lock
    ///
    /// Concurrent callers that read the same live document can finish in
    /// any order; the last write to land still reflects the latest state.
    pub fn write_current<F>(&self, current: F) -> SyncResult<()>
    where
        F: FnOnce() -> SettingsDocument,
    {
        let _lock = self.lock();
        let doc = current();
        self.write_locked(&doc)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_locked(&self, doc: &SettingsDocument) -> SyncResult<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;

        atomic_write(&self.path, &bytes).map_err(|source| SyncError::Cache {
            path: self.path.clone(),
            source,
        })?;

        debug!("Settings cached to {:?}", self.path);
        Ok(())
    }

    /// Read the last written snapshot
    ///
    /// Returns the default document when nothing has been written yet or
    /// the snapshot can't be read. Keys missing from an older snapshot are
    /// filled with defaults.
    pub fn read(&self) -> SettingsDocument {
        if !self.path.exists() {
            return SettingsDocument::default();
        }

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read settings cache {:?}: {}", self.path, e);
                return SettingsDocument::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Settings cache {:?} is unreadable, using defaults: {}",
                    self.path, e
                );
                SettingsDocument::default()
            }
        }
    }

    /// Remove the snapshot
    pub fn clear(&self) -> SyncResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SyncError::Cache {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Same directory so the rename stays atomic
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

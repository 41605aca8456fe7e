//! Persisted sync state
//!
//! [`JsonFileState`] stores the snapshot as a JSON file; a missing or
//! corrupted file loads as "no prior state" so the engine falls back to a
//! full resync instead of refusing to start.
//!
//! [`SyncStateStore`] owns the in-memory snapshot: all reads and writes go
//! through it, writes set a dirty flag, and [`flush`](SyncStateStore::flush)
//! persists only when something actually changed. The orchestrator calls
//! flush on a coalescing timer and on clean shutdown.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use scribesync_core::domain::newtypes::{ContentHash, VaultPath};
use scribesync_core::domain::record::{SyncStateSnapshot, SyncedFileRecord};
use scribesync_core::ports::state_store::StatePersistence;
use tracing::{debug, info, warn};

// ============================================================================
// JsonFileState
// ============================================================================

/// Snapshot persistence backed by a JSON file
pub struct JsonFileState {
    path: PathBuf,
}

impl JsonFileState {
    /// Creates a persistence adapter writing to the given file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl StatePersistence for JsonFileState {
    async fn load(&self) -> Result<Option<SyncStateSnapshot>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to read state file: {}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                // A corrupt snapshot only costs a full resync.
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file is malformed; starting from empty state"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, snapshot: &SyncStateSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create state directory")?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;
        debug!(files = snapshot.files.len(), "Persisted sync state");
        Ok(())
    }
}

// ============================================================================
// SyncStateStore
// ============================================================================

struct StateInner {
    snapshot: SyncStateSnapshot,
    dirty: bool,
}

/// In-memory owner of the sync state snapshot
pub struct SyncStateStore {
    inner: Mutex<StateInner>,
    persistence: Box<dyn StatePersistence>,
}

impl SyncStateStore {
    /// Creates a store over the given persistence adapter, starting empty
    pub fn new(persistence: Box<dyn StatePersistence>) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                snapshot: SyncStateSnapshot::default(),
                dirty: false,
            }),
            persistence,
        }
    }

    /// Loads the persisted snapshot into memory
    pub async fn load(&self) -> Result<()> {
        let loaded = self.persistence.load().await?;
        let mut inner = self.lock();
        match loaded {
            Some(snapshot) => {
                info!(files = snapshot.files.len(), "Loaded sync state");
                inner.snapshot = snapshot;
            }
            None => {
                info!("No prior sync state; all files will be treated as new");
                inner.snapshot = SyncStateSnapshot::default();
            }
        }
        inner.dirty = false;
        Ok(())
    }

    /// Returns the record for a path, if it was ever synced
    pub fn get(&self, path: &VaultPath) -> Option<SyncedFileRecord> {
        self.lock().snapshot.files.get(path).cloned()
    }

    /// Records a successful sync of `path`
    pub fn record(&self, path: &VaultPath, mtime: i64, hash: ContentHash) {
        let mut inner = self.lock();
        inner
            .snapshot
            .files
            .insert(path.clone(), SyncedFileRecord { mtime, hash });
        inner.dirty = true;
    }

    /// Updates only the stored mtime, after a hash check proved content
    /// unchanged despite a newer timestamp
    pub fn touch(&self, path: &VaultPath, mtime: i64) {
        let mut inner = self.lock();
        if let Some(record) = inner.snapshot.files.get_mut(path) {
            record.mtime = mtime;
            inner.dirty = true;
        }
    }

    /// Removes a path's record (file deleted or renamed away)
    pub fn forget(&self, path: &VaultPath) {
        let mut inner = self.lock();
        if inner.snapshot.files.remove(path).is_some() {
            inner.dirty = true;
        }
    }

    /// Moves a record from one path to another
    pub fn rename(&self, from: &VaultPath, to: &VaultPath) {
        let mut inner = self.lock();
        if let Some(record) = inner.snapshot.files.remove(from) {
            inner.snapshot.files.insert(to.clone(), record);
            inner.dirty = true;
        }
    }

    /// Stamps the completion time of a successful full pass
    pub fn mark_pass_complete(&self, completed_at_ms: i64) {
        let mut inner = self.lock();
        inner.snapshot.last_sync_time = completed_at_ms;
        inner.dirty = true;
    }

    /// Returns every path the store knows about
    pub fn known_paths(&self) -> Vec<VaultPath> {
        self.lock().snapshot.files.keys().cloned().collect()
    }

    /// Completion time of the last full pass, in epoch milliseconds
    ///
    /// Zero when no pass has ever completed.
    pub fn last_sync_time(&self) -> i64 {
        self.lock().snapshot.last_sync_time
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.lock().snapshot.files.len()
    }

    /// Returns true when no files are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persists the snapshot if anything changed since the last flush
    pub async fn flush(&self) -> Result<()> {
        let snapshot = {
            let mut inner = self.lock();
            if !inner.dirty {
                return Ok(());
            }
            inner.dirty = false;
            inner.snapshot.clone()
        };

        if let Err(e) = self.persistence.save(&snapshot).await {
            // Keep the dirty flag so the next flush retries.
            self.lock().dirty = true;
            return Err(e);
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

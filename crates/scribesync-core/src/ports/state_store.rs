//! Sync state persistence port (driven/secondary port)
//!
//! The engine owns the `SyncStateSnapshot` in memory; this port persists it
//! opaquely. Implementations must treat a missing or corrupted stored
//! snapshot as "no prior state" (the engine then performs a full resync),
//! never as a fatal startup error.

use crate::domain::record::SyncStateSnapshot;

/// Port trait for opaque load/save of the sync state snapshot
#[async_trait::async_trait]
pub trait StatePersistence: Send + Sync {
    /// Loads the stored snapshot
    ///
    /// Returns `Ok(None)` when no usable snapshot exists (missing file,
    /// malformed content).
    async fn load(&self) -> anyhow::Result<Option<SyncStateSnapshot>>;

    /// Persists the snapshot, replacing any previous one
    async fn save(&self, snapshot: &SyncStateSnapshot) -> anyhow::Result<()>;
}

//! Sync queue items, per-file records, and the persisted state snapshot
//!
//! The snapshot is owned exclusively by the sync engine and persisted opaquely
//! through the `StatePersistence` port. Its JSON shape is stable:
//!
//! ```json
//! {
//!   "lastSyncTime": 1733000000000,
//!   "files": {
//!     "Journal/2026-01-23.md": { "mtime": 1733000001000, "hash": "e3b0c4..." }
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, VaultPath};

// ============================================================================
// SyncAction
// ============================================================================

/// The logical action a path needs against the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A brand-new remote object should be created
    Create,
    /// An existing remote object should be updated
    ///
    /// `previous_path` is set when a create was reclassified as a rename:
    /// the remote object is looked up by the old path and moved to this one.
    Update {
        /// The pre-rename path whose remote object this update targets
        previous_path: Option<VaultPath>,
    },
    /// The remote object for this path should be deleted
    Delete,
}

impl SyncAction {
    /// Shorthand for an update that is not a rename
    #[must_use]
    pub fn update() -> Self {
        SyncAction::Update {
            previous_path: None,
        }
    }

    /// Returns the action name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update { .. } => "update",
            SyncAction::Delete => "delete",
        }
    }
}

// ============================================================================
// SyncQueueItem
// ============================================================================

/// A pending action in the sync queue
///
/// Invariant: at most one item per path exists in the queue at any time;
/// a new event for a path replaces any existing item.
#[derive(Debug, Clone)]
pub struct SyncQueueItem {
    /// The vault path this action applies to
    pub path: VaultPath,
    /// The action to perform
    pub action: SyncAction,
    /// When the item entered the queue (epoch milliseconds)
    pub enqueued_at: i64,
    /// How many times this item has failed and been re-queued
    pub retry_count: u32,
}

// ============================================================================
// SyncedFileRecord / SyncStateSnapshot
// ============================================================================

/// The last successfully synchronized state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedFileRecord {
    /// Modification time at last sync (epoch milliseconds)
    pub mtime: i64,
    /// Content hash at last sync
    pub hash: ContentHash,
}

/// The persisted sync state, loaded once at startup and flushed on a
/// coalescing timer plus clean shutdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateSnapshot {
    /// When the last successful full pass completed (epoch milliseconds)
    #[serde(default)]
    pub last_sync_time: i64,
    /// One record per path ever successfully synchronized
    #[serde(default)]
    pub files: HashMap<VaultPath, SyncedFileRecord>,
}

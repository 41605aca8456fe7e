//! Event debouncing and rename resolution
//!
//! Raw vault events are noisy: editors fire bursts of writes for one save,
//! and most platforms report a rename as an unpaired delete followed by a
//! create. [`DebouncedActionQueue`] absorbs both:
//!
//! - Events for the same path coalesce, and each new event restarts that
//!   path's quiet window; an action is emitted only once the path has been
//!   quiet for the full debounce interval.
//! - A delete is never emitted immediately. It is parked for the rename
//!   window first; if a create with a similar name arrives in the same
//!   folder within that window, the pair collapses into a single rename
//!   (an update carrying the previous path) and the delete is cancelled.
//!
//! Timing uses `tokio::time::Instant`, so tests drive the windows with a
//! paused clock instead of real sleeps.

use std::collections::HashMap;

use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::domain::record::SyncAction;
use tokio::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// VaultEvent
// ============================================================================

/// A filesystem change inside the vault, already root-relative and filtered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    /// A new file appeared
    Created(VaultPath),
    /// An existing file's content changed
    Modified(VaultPath),
    /// A file disappeared
    Deleted(VaultPath),
    /// The platform reported a paired rename directly
    Renamed {
        /// Path before the rename
        old: VaultPath,
        /// Path after the rename
        new: VaultPath,
    },
}

/// An action that survived debouncing and is ready to sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledAction {
    /// The vault path the action applies to
    pub path: VaultPath,
    /// What to do against the remote store
    pub action: SyncAction,
}

// ============================================================================
// DebouncedActionQueue
// ============================================================================

/// Coalesces raw vault events into settled sync actions
pub struct DebouncedActionQueue {
    /// Latest pending action per path, with the time of its last event
    pending: HashMap<VaultPath, (SyncAction, Instant)>,
    /// Deletes parked while a matching create may still arrive
    pending_deletes: Vec<(VaultPath, Instant)>,
    /// Quiet period before an action is considered settled
    debounce: Duration,
    /// How long a delete waits for its create half before becoming real
    rename_window: Duration,
}

impl DebouncedActionQueue {
    /// Creates a queue with the given debounce and rename windows
    pub fn new(debounce: Duration, rename_window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            pending_deletes: Vec::new(),
            debounce,
            rename_window,
        }
    }

    /// Feeds one raw event into the queue
    pub fn push(&mut self, event: VaultEvent) {
        let now = Instant::now();
        match event {
            VaultEvent::Created(path) => self.push_created(path, now),
            VaultEvent::Modified(path) => self.push_modified(path, now),
            VaultEvent::Deleted(path) => self.push_deleted(path, now),
            VaultEvent::Renamed { old, new } => self.push_renamed(old, new, now),
        }
    }

    fn push_created(&mut self, path: VaultPath, now: Instant) {
        if let Some(old) = self.take_matching_delete(&path) {
            if old == path {
                // Delete-then-recreate of the same file is a plain change.
                debug!(path = %path.as_str(), "Recreate collapsed to update");
                self.pending.insert(path, (SyncAction::update(), now));
            } else {
                debug!(
                    old = %old.as_str(),
                    new = %path.as_str(),
                    "Delete/create pair resolved as rename"
                );
                self.pending.insert(
                    path,
                    (
                        SyncAction::Update {
                            previous_path: Some(old),
                        },
                        now,
                    ),
                );
            }
            return;
        }

        // A create following a pending update for the same path still means
        // the file is new content to sync; keep whichever rename context the
        // pending action already carries.
        let action = match self.pending.remove(&path) {
            Some((action @ SyncAction::Update { .. }, _)) => action,
            _ => SyncAction::Create,
        };
        self.pending.insert(path, (action, now));
    }

    fn push_modified(&mut self, path: VaultPath, now: Instant) {
        let action = match self.pending.remove(&path) {
            // A modify does not demote a pending create or rename.
            Some((action @ SyncAction::Create, _))
            | Some((action @ SyncAction::Update { .. }, _)) => action,
            _ => SyncAction::update(),
        };
        self.pending.insert(path, (action, now));
    }

    fn push_deleted(&mut self, path: VaultPath, now: Instant) {
        match self.pending.remove(&path) {
            // Created and deleted before ever settling: net nothing.
            Some((SyncAction::Create, _)) => {
                debug!(path = %path.as_str(), "Create/delete pair cancelled");
            }
            _ => {
                self.pending_deletes.retain(|(p, _)| p != &path);
                self.pending_deletes.push((path, now));
            }
        }
    }

    fn push_renamed(&mut self, old: VaultPath, new: VaultPath, now: Instant) {
        self.pending.remove(&old);
        self.pending_deletes.retain(|(p, _)| p != &old);
        self.pending.insert(
            new,
            (
                SyncAction::Update {
                    previous_path: Some(old),
                },
                now,
            ),
        );
    }

    /// Removes and returns a parked delete that looks like the other half of
    /// a rename to `created`
    fn take_matching_delete(&mut self, created: &VaultPath) -> Option<VaultPath> {
        let idx = self
            .pending_deletes
            .iter()
            .position(|(deleted, _)| is_rename_candidate(deleted, created))?;
        Some(self.pending_deletes.remove(idx).0)
    }

    /// Returns every action whose window has fully elapsed
    ///
    /// Settled creates and updates come out first, then deletes whose rename
    /// window expired without a matching create.
    pub fn poll(&mut self) -> Vec<SettledAction> {
        let now = Instant::now();
        let mut settled = Vec::new();

        let ready: Vec<VaultPath> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| now.duration_since(*at) >= self.debounce)
            .map(|(path, _)| path.clone())
            .collect();
        for path in ready {
            if let Some((action, _)) = self.pending.remove(&path) {
                settled.push(SettledAction { path, action });
            }
        }

        let window = self.rename_window;
        let mut expired = Vec::new();
        self.pending_deletes.retain(|(path, at)| {
            if now.duration_since(*at) >= window {
                expired.push(path.clone());
                false
            } else {
                true
            }
        });
        for path in expired {
            settled.push(SettledAction {
                path,
                action: SyncAction::Delete,
            });
        }

        if !settled.is_empty() {
            debug!(count = settled.len(), "Settled debounced actions");
        }
        settled
    }

    /// Number of events still inside a window
    pub fn pending_count(&self) -> usize {
        self.pending.len() + self.pending_deletes.len()
    }

    /// Returns true when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.pending_deletes.is_empty()
    }
}

// ============================================================================
// Rename matching
// ============================================================================

/// Decides whether a parked delete plus a fresh create look like one rename
///
/// Both files must sit in the same folder, and their normalized stems must
/// match exactly or by containment. Normalization lowercases and strips a
/// trailing `_N` duplicate suffix, so `Alice.md` pairs with `Alice_2.md`.
fn is_rename_candidate(deleted: &VaultPath, created: &VaultPath) -> bool {
    if deleted.parent() != created.parent() {
        return false;
    }
    let a = normalize_stem(deleted);
    let b = normalize_stem(created);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

fn normalize_stem(path: &VaultPath) -> String {
    strip_copy_suffix(path.file_stem()).to_lowercase()
}

/// Strips a trailing `_N` numeric suffix, as appended to duplicate names
fn strip_copy_suffix(stem: &str) -> &str {
    if let Some(idx) = stem.rfind('_') {
        let suffix = &stem[idx + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return &stem[..idx];
        }
    }
    stem
}

//! Filesystem watching for the vault directory
//!
//! Wraps the `notify` crate to monitor the vault recursively, converting
//! raw OS events into [`RawEvent`] values sent through an mpsc channel.
//! A second step, [`translate`], maps absolute paths back into the vault
//! and drops anything outside it or with an unsupported extension; the
//! debounced queue then coalesces what remains.
//!
//! ```text
//! inotify
//!    │
//!    ▼
//! VaultWatcher ──→ mpsc::channel ──→ translate ──→ DebouncedActionQueue
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::debounce::VaultEvent;
use crate::vault::LocalVault;

/// A filesystem change with absolute paths, before vault mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// A new file or directory appeared
    Created(PathBuf),
    /// An existing file changed (content or metadata)
    Modified(PathBuf),
    /// A file or directory disappeared
    Deleted(PathBuf),
    /// A file or directory moved
    Renamed {
        /// Path before the move
        old: PathBuf,
        /// Path after the move
        new: PathBuf,
    },
}

/// Watches the vault directory using the OS-native mechanism
///
/// On Linux this typically uses inotify. Dropping the watcher stops the
/// underlying watch and closes the event channel.
pub struct VaultWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl VaultWatcher {
    /// Starts a recursive watch on `root`
    ///
    /// Returns the watcher and a receiver yielding [`RawEvent`] values as
    /// filesystem changes occur.
    ///
    /// # Errors
    /// Fails if the OS watcher cannot be created or the root cannot be
    /// watched (missing directory, inotify watch limit).
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<RawEvent>)> {
        let (tx, rx) = mpsc::channel::<RawEvent>(1024);

        info!(root = %root.display(), "Starting vault watch");

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(raw) = map_notify_event(&event) {
                        if let Err(e) = tx.blocking_send(raw) {
                            warn!(error = %e, "Dropping change event (receiver closed)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "Vault watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create the vault watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch vault root: {}", root.display()))?;

        Ok((
            Self {
                watcher,
                root: root.to_path_buf(),
            },
            rx,
        ))
    }

    /// Stops the watch explicitly
    pub fn stop(&mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            debug!(error = %e, "Unwatch on shutdown failed");
        }
    }
}

/// Maps a raw event into the vault's coordinate space
///
/// Paths outside the vault root or with unsupported extensions are
/// dropped. A rename where only one side stays inside the syncable set
/// degrades to a plain create or delete of the side that does.
pub fn translate(vault: &LocalVault, raw: RawEvent) -> Option<VaultEvent> {
    let map = |p: &Path| {
        vault
            .relativize(p)
            .filter(|candidate| vault.accepts(candidate))
    };

    match raw {
        RawEvent::Created(p) => map(&p).map(VaultEvent::Created),
        RawEvent::Modified(p) => map(&p).map(VaultEvent::Modified),
        RawEvent::Deleted(p) => map(&p).map(VaultEvent::Deleted),
        RawEvent::Renamed { old, new } => match (map(&old), map(&new)) {
            (Some(old), Some(new)) => Some(VaultEvent::Renamed { old, new }),
            (None, Some(new)) => Some(VaultEvent::Created(new)),
            (Some(old), None) => Some(VaultEvent::Deleted(old)),
            (None, None) => None,
        },
    }
}

/// Converts a `notify::Event` into a [`RawEvent`]
///
/// - `Create(*)` becomes `Created`
/// - `Modify(Data(*))` and other `Modify(*)` kinds become `Modified`
/// - `Modify(Name(Both))` with two paths becomes `Renamed`
/// - `Remove(*)` becomes `Deleted`
///
/// Access events and events without paths are ignored.
fn map_notify_event(event: &notify::Event) -> Option<RawEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Create event");
            Some(RawEvent::Created(path.clone()))
        }

        EventKind::Modify(ModifyKind::Data(_)) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Modify(Data) event");
            Some(RawEvent::Modified(path.clone()))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if paths.len() >= 2 {
                let old = paths[0].clone();
                let new = paths[1].clone();
                debug!(old = %old.display(), new = %new.display(), "Mapped Rename event");
                Some(RawEvent::Renamed { old, new })
            } else {
                let path = paths.first()?;
                debug!(path = %path.display(), "Rename with single path, treating as Modified");
                Some(RawEvent::Modified(path.clone()))
            }
        }

        EventKind::Remove(_) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Remove event");
            Some(RawEvent::Deleted(path.clone()))
        }

        EventKind::Modify(_) => {
            let path = paths.first()?;
            debug!(path = %path.display(), kind = ?event.kind, "Mapped other Modify event");
            Some(RawEvent::Modified(path.clone()))
        }

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}

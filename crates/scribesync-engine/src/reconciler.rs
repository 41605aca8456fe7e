//! Mirror deletion of remote objects whose source file is gone
//!
//! After a full pass has pushed local changes, the reconciler walks the
//! remote listings and removes objects that were created from a vault file
//! which no longer exists locally. Objects without a `sourcePath` were
//! created through other channels (web UI, API imports) and are never
//! touched, regardless of local state.

use std::collections::HashSet;

use scribesync_core::classify::CollectionKind;
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::ports::remote_store::{RemoteError, RemoteStore};
use tracing::{debug, info, warn};

/// Counts from one reconciliation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Remote objects deleted because their source file is gone
    pub deleted: usize,
    /// Objects that should have been deleted but the delete call failed
    pub failed: usize,
}

/// Deletes remote objects orphaned by local file removals
pub struct Reconciler<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Sweeps both collections against the set of paths present locally
    ///
    /// A paging failure propagates; an individual delete failure is logged
    /// and counted, and the sweep continues with the remaining objects.
    pub async fn sweep(
        &self,
        local_paths: &HashSet<VaultPath>,
    ) -> Result<ReconcileOutcome, RemoteError> {
        let mut outcome = ReconcileOutcome::default();
        for collection in [CollectionKind::Entry, CollectionKind::Person] {
            self.sweep_collection(collection, local_paths, &mut outcome)
                .await?;
        }
        if outcome.deleted > 0 || outcome.failed > 0 {
            info!(
                deleted = outcome.deleted,
                failed = outcome.failed,
                "Reconciled remote objects against local files"
            );
        }
        Ok(outcome)
    }

    async fn sweep_collection(
        &self,
        collection: CollectionKind,
        local_paths: &HashSet<VaultPath>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), RemoteError> {
        let mut page = 1u32;
        loop {
            let listing = self.store.list_notes(collection, page).await?;
            debug!(
                collection = collection.as_str(),
                page,
                notes = listing.notes.len(),
                "Fetched remote page"
            );

            for note in &listing.notes {
                let Some(source) = note.source_path.as_deref() else {
                    continue;
                };
                let Ok(path) = VaultPath::new(source) else {
                    warn!(
                        id = note.id.as_str(),
                        source, "Remote object carries an unusable source path"
                    );
                    continue;
                };
                if local_paths.contains(&path) {
                    continue;
                }

                match self.store.delete_note(collection, &note.id).await {
                    Ok(()) => {
                        debug!(
                            id = note.id.as_str(),
                            path = path.as_str(),
                            "Deleted remote object with no local source file"
                        );
                        outcome.deleted += 1;
                    }
                    Err(e) => {
                        warn!(
                            id = note.id.as_str(),
                            path = path.as_str(),
                            error = %e,
                            "Failed to delete orphaned remote object"
                        );
                        outcome.failed += 1;
                    }
                }
            }

            match listing.next_page {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(())
    }
}

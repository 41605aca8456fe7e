//! Sync orchestration
//!
//! [`SyncOrchestrator`] ties the engine together: it walks the vault,
//! runs two-tier change detection against the persisted sync state,
//! pushes changed documents through the bulk batcher, reconciles remote
//! orphans, and optionally keeps a filesystem watch running that feeds
//! the debounced queue and drains single-document operations.
//!
//! Every entry point checks the authentication gate first. A pass never
//! makes a network call while the credential is missing or invalidated.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scribesync_core::classify::Classifier;
use scribesync_core::domain::credential::AuthState;
use scribesync_core::domain::newtypes::{ContentHash, VaultPath};
use scribesync_core::domain::record::SyncAction;
use scribesync_core::ports::auth::AuthGate;
use scribesync_core::ports::remote_store::{NoteUpsert, RemoteError, RemoteStore};
use scribesync_core::ports::vault::Vault;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batcher::Batcher;
use crate::debounce::DebouncedActionQueue;
use crate::detector::{hash_check, quick_check, ChangeCheck, QuickCheck};
use crate::hasher::hash_content;
use crate::queue::{RetryOutcome, SyncQueue};
use crate::reconciler::Reconciler;
use crate::state::SyncStateStore;
use crate::vault::LocalVault;
use crate::watcher::{translate, VaultWatcher};
use crate::EngineError;

/// How often the watch loop polls the debounced queue
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Tunables for a sync pass and the watch loop
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Quiet period before a filesystem event is considered settled
    pub debounce_ms: u64,
    /// How long a delete waits for a matching create before it is final
    pub rename_window_ms: u64,
    /// Items per bulk chunk
    pub batch_size: usize,
    /// Retry ceiling for transient failures in the watch queue
    pub max_retries: u32,
    /// Largest document accepted for upload, in bytes
    pub max_note_bytes: u64,
    /// Delete remote objects whose source file is gone
    ///
    /// Destructive, so a full pass only reconciles when this is enabled.
    pub mirror_delete: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            // A rename's create can trail its delete by much more than the
            // debounce, so the hold-back window sits well above it.
            rename_window_ms: 5000,
            batch_size: 50,
            max_retries: 3,
            max_note_bytes: 1024 * 1024,
            mirror_delete: false,
        }
    }
}

/// Counts from one full sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files examined
    pub scanned: usize,
    /// Remote objects created
    pub created: u32,
    /// Remote objects updated
    pub updated: u32,
    /// Remote objects deleted by reconciliation
    pub deleted: usize,
    /// Files that needed no work (unchanged or touch-only)
    pub skipped: usize,
    /// Items that could not be synced this pass
    pub failed: usize,
}

/// Result of pushing a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Created,
    Updated,
    Deleted,
    /// Nothing to do (unchanged content, or a delete of an unknown object)
    Skipped,
}

struct WatchTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives full passes and the continuous watch loop
pub struct SyncOrchestrator {
    vault: Arc<LocalVault>,
    store: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthGate>,
    state: Arc<SyncStateStore>,
    classifier: Classifier,
    options: SyncOptions,
    pass_running: AtomicBool,
    watch: Mutex<Option<WatchTask>>,
}

impl SyncOrchestrator {
    pub fn new(
        vault: Arc<LocalVault>,
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthGate>,
        state: Arc<SyncStateStore>,
        classifier: Classifier,
        options: SyncOptions,
    ) -> Self {
        Self {
            vault,
            store,
            auth,
            state,
            classifier,
            options,
            pass_running: AtomicBool::new(false),
            watch: Mutex::new(None),
        }
    }

    /// Loads the persisted sync state into memory
    pub async fn load_state(&self) -> Result<(), EngineError> {
        self.state.load().await?;
        Ok(())
    }

    /// Maps the auth gate onto pass admission
    ///
    /// `RefreshInFlight` is admitted: the token manager blocks callers on
    /// the in-flight refresh rather than failing them.
    fn check_auth(&self) -> Result<(), EngineError> {
        match self.auth.auth_state() {
            AuthState::Active | AuthState::RefreshInFlight => Ok(()),
            AuthState::Uninitialized => Err(EngineError::NotAuthenticated),
            AuthState::Invalidated => Err(EngineError::AuthInvalidated),
        }
    }

    /// Runs one full sync pass over the whole vault
    ///
    /// Scans every file, pushes changed documents in bulk, reconciles
    /// remote objects whose source file is gone (when mirror delete is
    /// enabled), and persists the updated sync state. Partial progress
    /// survives failures: files the server acknowledged are recorded even
    /// when siblings fail or a later chunk dies mid-pass, so the next pass
    /// retries only what is still out of date. `force` bypasses change
    /// detection and re-pushes every document.
    pub async fn sync_all(&self, force: bool) -> Result<SyncReport, EngineError> {
        self.check_auth()?;

        if self.pass_running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        let _guard = PassGuard(&self.pass_running);

        let files = self.vault.list_files().await?;
        let mut report = SyncReport {
            scanned: files.len(),
            ..SyncReport::default()
        };

        let mut local_paths: HashSet<VaultPath> = HashSet::with_capacity(files.len());
        let mut outgoing: Vec<(VaultPath, i64, ContentHash, NoteUpsert)> = Vec::new();

        for (path, stat) in files {
            local_paths.insert(path.clone());
            let stored = self.state.get(&path);

            if !force {
                match quick_check(stored.as_ref(), stat.mtime_ms) {
                    QuickCheck::Unchanged => {
                        report.skipped += 1;
                        continue;
                    }
                    QuickCheck::New | QuickCheck::NeedsHash => {}
                }
            }

            let bytes = match self.vault.read_file(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.as_str(), error = %e, "Skipping unreadable file");
                    report.failed += 1;
                    continue;
                }
            };
            let hash = hash_content(&bytes);

            if !force {
                if let Some(stored) = &stored {
                    if hash_check(stored, &hash) == ChangeCheck::TouchedOnly {
                        self.state.touch(&path, stat.mtime_ms);
                        report.skipped += 1;
                        continue;
                    }
                }
            }

            let upsert = self.build_upsert(&path, &bytes, &hash, stat.created_ms);
            outgoing.push((path, stat.mtime_ms, hash, upsert));
        }

        if !outgoing.is_empty() {
            let batcher = Batcher::new(self.options.batch_size, self.options.max_note_bytes);
            let upserts = outgoing.iter().map(|(_, _, _, u)| u.clone()).collect();
            let summary = batcher.run(self.store.as_ref(), upserts).await;

            let failed_paths: HashSet<&str> =
                summary.errors.iter().map(|e| e.path.as_str()).collect();
            let acknowledged: HashSet<&str> =
                summary.acknowledged.iter().map(|p| p.as_str()).collect();
            for (path, mtime, hash, _) in &outgoing {
                if acknowledged.contains(path.as_str()) && !failed_paths.contains(path.as_str()) {
                    self.state.record(path, *mtime, hash.clone());
                }
            }

            report.created = summary.created;
            report.updated = summary.updated;
            report.failed += summary.errors.len();
            for item in &summary.errors {
                warn!(path = %item.path, error = %item.error, "Item failed to sync");
            }

            // A chunk-level failure ends the pass, but what already landed
            // is persisted first so the next pass does not re-upload it.
            if let Some(err) = summary.aborted {
                self.state.flush().await?;
                return Err(err.into());
            }
        }

        for path in self.state.known_paths() {
            if !local_paths.contains(&path) {
                self.state.forget(&path);
            }
        }

        if self.options.mirror_delete {
            let outcome = Reconciler::new(self.store.as_ref())
                .sweep(&local_paths)
                .await?;
            report.deleted = outcome.deleted;
            report.failed += outcome.failed;
        }

        self.state.mark_pass_complete(Utc::now().timestamp_millis());
        self.state.flush().await?;

        info!(
            scanned = report.scanned,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            "Sync pass finished"
        );
        Ok(report)
    }

    /// Syncs a single vault path
    ///
    /// A missing file is treated as a local deletion and mirrored to the
    /// remote; anything else goes through the same two-tier change check
    /// as a full pass. `force` bypasses the change check and pushes the
    /// document regardless.
    pub async fn sync_one(
        &self,
        path: &VaultPath,
        force: bool,
    ) -> Result<ItemOutcome, EngineError> {
        self.check_auth()?;

        let outcome = if self.vault.exists(path).await {
            let action = match self.state.get(path) {
                Some(_) => SyncAction::update(),
                None => SyncAction::Create,
            };
            self.push_item(path, &action, force).await?
        } else {
            self.push_item(path, &SyncAction::Delete, force).await?
        };
        self.state.flush().await?;
        Ok(outcome)
    }

    /// Starts the continuous watch loop
    ///
    /// Filesystem events flow through the debounced queue into the sync
    /// queue and are drained as single-document operations. Stops when
    /// [`stop_watching`](Self::stop_watching) is called.
    pub async fn start_watching(self: &Arc<Self>) -> Result<(), EngineError> {
        let mut slot = self.watch.lock().await;
        if slot.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let (watcher, rx) = VaultWatcher::start(self.vault.root())?;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::watch_loop(
            Arc::clone(self),
            watcher,
            rx,
            cancel.clone(),
        ));

        *slot = Some(WatchTask { cancel, handle });
        Ok(())
    }

    /// Stops the watch loop and waits for it to drain
    pub async fn stop_watching(&self) {
        let task = self.watch.lock().await.take();
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Watch task ended abnormally");
            }
        }
    }

    /// Returns true while the watch loop is running
    pub async fn is_watching(&self) -> bool {
        self.watch.lock().await.is_some()
    }

    async fn watch_loop(
        self: Arc<Self>,
        mut watcher: VaultWatcher,
        mut rx: tokio::sync::mpsc::Receiver<crate::watcher::RawEvent>,
        cancel: CancellationToken,
    ) {
        let mut debounced = DebouncedActionQueue::new(
            Duration::from_millis(self.options.debounce_ms),
            Duration::from_millis(self.options.rename_window_ms),
        );
        let mut queue = SyncQueue::new(self.options.max_retries);
        let mut interval = tokio::time::interval(WATCH_POLL_INTERVAL);

        info!("Watch loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                raw = rx.recv() => {
                    match raw {
                        Some(raw) => {
                            if let Some(event) = translate(&self.vault, raw) {
                                debounced.push(event);
                            }
                        }
                        None => {
                            warn!("Watcher channel closed, stopping watch loop");
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    for settled in debounced.poll() {
                        queue.enqueue(settled.path, settled.action);
                    }
                    self.drain_queue(&mut queue).await;
                }
            }
        }

        watcher.stop();
        if let Err(e) = self.state.flush().await {
            warn!(error = %e, "Failed to persist sync state on shutdown");
        }
        info!("Watch loop stopped");
    }

    /// Drains the sync queue one item at a time
    ///
    /// Stops draining (leaving the rest queued) when the auth gate closes,
    /// so no network call happens against a dead credential.
    async fn drain_queue(&self, queue: &mut SyncQueue) {
        let mut processed = false;
        while let Some(item) = queue.pop() {
            if self.check_auth().is_err() {
                debug!("Auth gate closed, re-queueing pending item");
                queue.enqueue(item.path, item.action);
                break;
            }

            match self.push_item(&item.path, &item.action, false).await {
                Ok(_) => processed = true,
                Err(e) => {
                    let outcome = queue.handle_failure(item, &e);
                    if outcome == RetryOutcome::DroppedTerminal && e.is_auth() {
                        break;
                    }
                }
            }
        }
        if processed {
            if let Err(e) = self.state.flush().await {
                warn!(error = %e, "Failed to persist sync state");
            }
        }
    }

    /// Pushes one document operation to the remote store
    async fn push_item(
        &self,
        path: &VaultPath,
        action: &SyncAction,
        force: bool,
    ) -> Result<ItemOutcome, RemoteError> {
        match action {
            SyncAction::Delete => self.push_delete(path).await,
            SyncAction::Create | SyncAction::Update { previous_path: None } => {
                self.push_upsert(path, None, force).await
            }
            SyncAction::Update {
                previous_path: Some(old),
            } => self.push_upsert(path, Some(old), force).await,
        }
    }

    async fn push_upsert(
        &self,
        path: &VaultPath,
        previous_path: Option<&VaultPath>,
        force: bool,
    ) -> Result<ItemOutcome, RemoteError> {
        let stat = match self.vault.stat(path).await {
            Ok(stat) => stat,
            Err(e) => {
                // The file vanished between the event and the push
                debug!(path = %path.as_str(), error = %e, "File gone before push");
                return self.push_delete(path).await;
            }
        };
        let stored = self.state.get(path);
        if !force && quick_check(stored.as_ref(), stat.mtime_ms) == QuickCheck::Unchanged {
            return Ok(ItemOutcome::Skipped);
        }

        let bytes = self
            .vault
            .read_file(path)
            .await
            .map_err(|e| RemoteError::Validation(format!("unreadable file: {e}")))?;
        if bytes.len() as u64 > self.options.max_note_bytes {
            return Err(RemoteError::Validation(format!(
                "document exceeds the maximum size of {} bytes",
                self.options.max_note_bytes
            )));
        }
        let hash = hash_content(&bytes);
        if !force {
            if let Some(stored) = &stored {
                if hash_check(stored, &hash) == ChangeCheck::TouchedOnly {
                    self.state.touch(path, stat.mtime_ms);
                    return Ok(ItemOutcome::Skipped);
                }
            }
        }

        let upsert = self.build_upsert(path, &bytes, &hash, stat.created_ms);
        let collection = upsert.collection;

        // For a rename, the old object is updated in place when it stayed
        // in the same collection, and replaced when it moved across.
        if let Some(old) = previous_path {
            let old_collection = self.classifier.classify(old);
            if old_collection == collection {
                if let Some(existing) = self.store.find_by_path(old_collection, old).await? {
                    self.store.update_note(&existing.id, &upsert).await?;
                    self.state.rename(old, path);
                    self.state.record(path, stat.mtime_ms, hash);
                    return Ok(ItemOutcome::Updated);
                }
            } else {
                self.push_delete(old).await?;
            }
            self.state.forget(old);
        }

        let outcome = match self.store.find_by_path(collection, path).await? {
            Some(existing) => {
                self.store.update_note(&existing.id, &upsert).await?;
                ItemOutcome::Updated
            }
            None => {
                self.store.create_note(&upsert).await?;
                ItemOutcome::Created
            }
        };
        self.state.record(path, stat.mtime_ms, hash);
        Ok(outcome)
    }

    async fn push_delete(&self, path: &VaultPath) -> Result<ItemOutcome, RemoteError> {
        let collection = self.classifier.classify(path);
        let outcome = match self.store.find_by_path(collection, path).await? {
            Some(existing) => {
                self.store.delete_note(collection, &existing.id).await?;
                ItemOutcome::Deleted
            }
            None => ItemOutcome::Skipped,
        };
        self.state.forget(path);
        Ok(outcome)
    }

    fn build_upsert(
        &self,
        path: &VaultPath,
        bytes: &[u8],
        hash: &ContentHash,
        created_ms: i64,
    ) -> NoteUpsert {
        let content = String::from_utf8_lossy(bytes).into_owned();
        let meta = self.classifier.extract_meta(path, &content, created_ms);
        let collection = meta.kind.unwrap_or_else(|| self.classifier.classify(path));
        NoteUpsert {
            path: path.clone(),
            collection,
            title: meta.title,
            date: meta.date.format("%Y-%m-%d").to_string(),
            content,
            content_hash: hash.as_str().to_string(),
        }
    }
}

/// Clears the pass-running flag on every exit path
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

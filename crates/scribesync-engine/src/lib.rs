//! ScribeSync Engine - change detection and sync orchestration
//!
//! Provides:
//! - Content hashing and two-tier change detection (mtime fast path, hash
//!   fallback)
//! - Debounced filesystem events with rename resolution
//! - A per-path-deduplicated FIFO queue with a bounded retry policy
//! - Chunked bulk upload and mirror-delete reconciliation
//!
//! ## Modules
//!
//! - [`engine`] - Sync orchestrator tying the pieces together
//! - [`debounce`] - Event debouncing and delete/create rename pairing
//! - [`batcher`] - Chunked submission to the bulk endpoint
//! - [`reconciler`] - Mirror deletes for files removed locally

pub mod batcher;
pub mod debounce;
pub mod detector;
pub mod engine;
pub mod hasher;
pub mod queue;
pub mod reconciler;
pub mod state;
pub mod vault;
pub mod watcher;

use scribesync_core::ports::remote_store::RemoteError;
use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// No credential is available; the user has not signed in
    #[error("Not authenticated; sign in before syncing")]
    NotAuthenticated,

    /// The credential was invalidated; no network calls are permitted
    #[error("Credentials invalidated; re-authentication required")]
    AuthInvalidated,

    /// A sync pass is already running
    #[error("A sync pass is already in progress")]
    AlreadyRunning,

    /// A remote operation failed and the pass could not continue
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The pass ran to completion but some items failed
    #[error("Sync completed with {failed} failed item(s)")]
    Incomplete {
        /// Number of items that could not be synced
        failed: usize,
    },

    /// A local I/O or state persistence failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

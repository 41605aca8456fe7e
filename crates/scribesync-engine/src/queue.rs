//! Per-path-deduplicated FIFO sync queue
//!
//! At most one item per path exists at a time: a newer action replaces the
//! queued one in place, keeping the original queue position. Failed items
//! re-enter at the back with an incremented retry count, up to the ceiling;
//! auth and conflict failures are dropped immediately since replaying the
//! identical request cannot succeed.

use std::collections::VecDeque;

use chrono::Utc;
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::domain::record::{SyncAction, SyncQueueItem};
use scribesync_core::ports::remote_store::RemoteError;
use tracing::{debug, warn};

/// What became of a failed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The item was put back at the queue tail
    Requeued,
    /// The failure cannot succeed on replay; the item was dropped
    DroppedTerminal,
    /// The retry ceiling was reached; the item was dropped
    DroppedExhausted,
}

/// FIFO queue of pending sync actions, one per path
pub struct SyncQueue {
    items: VecDeque<SyncQueueItem>,
    /// Attempts per item before it is abandoned
    max_retries: u32,
}

impl SyncQueue {
    /// Creates a queue with the given retry ceiling
    pub fn new(max_retries: u32) -> Self {
        Self {
            items: VecDeque::new(),
            max_retries,
        }
    }

    /// Enqueues an action, replacing any queued item for the same path
    ///
    /// Replacement keeps the existing position and resets the retry count:
    /// the new action describes a different change, so earlier failures do
    /// not count against it.
    pub fn enqueue(&mut self, path: VaultPath, action: SyncAction) {
        let now = Utc::now().timestamp_millis();
        if let Some(existing) = self.items.iter_mut().find(|item| item.path == path) {
            debug!(
                path = %path.as_str(),
                old = existing.action.name(),
                new = action.name(),
                "Replacing queued action"
            );
            existing.action = action;
            existing.retry_count = 0;
            existing.enqueued_at = now;
            return;
        }

        self.items.push_back(SyncQueueItem {
            path,
            action,
            enqueued_at: now,
            retry_count: 0,
        });
    }

    /// Takes the oldest item
    pub fn pop(&mut self) -> Option<SyncQueueItem> {
        self.items.pop_front()
    }

    /// Decides what to do with an item whose attempt failed
    ///
    /// Retryable failures re-enter at the tail until the ceiling; terminal
    /// failures (auth, conflict, validation) are dropped at once.
    pub fn handle_failure(&mut self, mut item: SyncQueueItem, error: &RemoteError) -> RetryOutcome {
        if !error.is_retryable() {
            warn!(
                path = %item.path.as_str(),
                error = %error,
                "Dropping item after terminal failure"
            );
            return RetryOutcome::DroppedTerminal;
        }

        item.retry_count += 1;
        if item.retry_count >= self.max_retries {
            warn!(
                path = %item.path.as_str(),
                attempts = item.retry_count,
                "Retry ceiling reached; dropping item"
            );
            return RetryOutcome::DroppedExhausted;
        }

        debug!(
            path = %item.path.as_str(),
            attempt = item.retry_count,
            "Re-queueing failed item"
        );
        // The path cannot still be queued: pop removed its only slot, and
        // dedup holds one item per path.
        self.items.push_back(item);
        RetryOutcome::Requeued
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops everything (shutdown)
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> VaultPath {
        VaultPath::new(s).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        q.enqueue(path("b.md"), SyncAction::update());
        q.enqueue(path("c.md"), SyncAction::Delete);

        assert_eq!(q.pop().unwrap().path, path("a.md"));
        assert_eq!(q.pop().unwrap().path, path("b.md"));
        assert_eq!(q.pop().unwrap().path, path("c.md"));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_enqueue_dedupes_by_path_keeping_position() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        q.enqueue(path("b.md"), SyncAction::Create);
        q.enqueue(path("a.md"), SyncAction::update());

        assert_eq!(q.len(), 2);
        let first = q.pop().unwrap();
        assert_eq!(first.path, path("a.md"));
        assert_eq!(first.action, SyncAction::update());
    }

    #[test]
    fn test_replacement_resets_retry_count() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        let item = q.pop().unwrap();
        assert_eq!(
            q.handle_failure(item, &RemoteError::Timeout),
            RetryOutcome::Requeued
        );

        q.enqueue(path("a.md"), SyncAction::Delete);
        let item = q.pop().unwrap();
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.action, SyncAction::Delete);
    }

    #[test]
    fn test_retry_ceiling() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);

        let item = q.pop().unwrap();
        assert_eq!(
            q.handle_failure(item, &RemoteError::Timeout),
            RetryOutcome::Requeued
        );
        let item = q.pop().unwrap();
        assert_eq!(item.retry_count, 1);
        assert_eq!(
            q.handle_failure(item, &RemoteError::Timeout),
            RetryOutcome::Requeued
        );
        let item = q.pop().unwrap();
        assert_eq!(item.retry_count, 2);
        // Third failure hits the ceiling.
        assert_eq!(
            q.handle_failure(item, &RemoteError::Timeout),
            RetryOutcome::DroppedExhausted
        );
        assert!(q.is_empty());
    }

    #[test]
    fn test_auth_failure_is_never_retried() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        let item = q.pop().unwrap();
        assert_eq!(
            q.handle_failure(item, &RemoteError::Unauthorized("expired".into())),
            RetryOutcome::DroppedTerminal
        );
        assert!(q.is_empty());
    }

    #[test]
    fn test_conflict_is_never_retried() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        let item = q.pop().unwrap();
        assert_eq!(
            q.handle_failure(item, &RemoteError::Conflict("duplicate".into())),
            RetryOutcome::DroppedTerminal
        );
        assert!(q.is_empty());
    }

    #[test]
    fn test_server_error_is_retried() {
        let mut q = SyncQueue::new(3);
        q.enqueue(path("a.md"), SyncAction::Create);
        let item = q.pop().unwrap();
        let outcome = q.handle_failure(
            item,
            &RemoteError::Server {
                status: 503,
                message: "overloaded".into(),
            },
        );
        assert_eq!(outcome, RetryOutcome::Requeued);
        assert_eq!(q.len(), 1);
    }
}

//! Notification port (driven/secondary port)
//!
//! The engine has exactly two user-facing notices worth interrupting for:
//! the terminal auth-invalidation event (delivered exactly once) and the
//! insecure credential-storage fallback. Implementations may print to the
//! terminal, use a desktop notification daemon, or discard entirely.
//!
//! ## Design Notes
//!
//! - Notifications are fire-and-forget; the caller never waits for user
//!   interaction, and delivery failures must not propagate into sync flow.

/// Port trait for user-facing notices
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a one-shot notice to the user
    async fn notify(&self, title: &str, body: &str);
}

/// Notifier that silently discards every notice
///
/// Useful as a default in tests and headless runs.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait::async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _title: &str, _body: &str) {}
}

//! Token lifecycle management and credential storage
//!
//! Implements the authentication state machine around the access/refresh
//! token pair:
//!
//! - [`KeyringCredentialStore`] - secure storage in the OS keyring
//! - [`FileCredentialStore`] - plaintext fallback for hosts without a keyring
//! - [`TokenManager`] - owns the single live [`Credential`], schedules
//!   proactive refresh ahead of expiry, collapses concurrent refresh attempts
//!   into one network call, and enters a terminal `Invalidated` state when the
//!   refresh token itself is rejected
//!
//! `Invalidated` is sticky: every subsequent token request fails locally until
//! the user re-authenticates, and the invalidation notice is delivered to the
//! user exactly once.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use scribesync_core::domain::credential::{AuthState, Credential};
use scribesync_core::ports::auth::AuthGate;
use scribesync_core::ports::notification::Notifier;
use scribesync_core::ports::remote_store::{RemoteError, TokenRefresher};
use scribesync_core::ports::secure_store::CredentialStore;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keyring account name under which the credential pair is stored
const KEYRING_ACCOUNT: &str = "sync-credentials";

/// Poll interval for the background refresh task while no credential is held
const IDLE_POLL: std::time::Duration = std::time::Duration::from_secs(60);

/// Back-off before retrying a failed (but non-terminal) background refresh
const RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_secs(60);

// ============================================================================
// AuthError
// ============================================================================

/// Failures surfaced by the token lifecycle manager
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential has been supplied yet
    #[error("Not authenticated; run the auth command first")]
    NotAuthenticated,

    /// The refresh token was rejected; re-authentication is required
    #[error("Credentials invalidated; re-authentication required")]
    Invalidated,

    /// The refresh call itself failed for a non-auth reason
    #[error("Token refresh failed: {0}")]
    Refresh(RemoteError),
}

impl From<AuthError> for RemoteError {
    fn from(err: AuthError) -> Self {
        match err {
            // A failed refresh keeps its transport category so the queue's
            // retry policy still sees transient failures as transient.
            AuthError::Refresh(inner) => inner,
            other => RemoteError::Unauthorized(other.to_string()),
        }
    }
}

// ============================================================================
// KeyringCredentialStore
// ============================================================================

/// Stores the credential pair in the OS keyring
///
/// Uses the `keyring` crate to reach the platform credential store
/// (e.g., GNOME Keyring, KDE Wallet, macOS Keychain). The pair is
/// serialized as JSON under a fixed account name.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    /// Creates a store using the given keyring service name
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, KEYRING_ACCOUNT)
            .context("Failed to create keyring entry")
    }

    /// Checks whether the platform keyring is reachable
    ///
    /// A missing entry counts as reachable; only a backend failure (no
    /// secret service on the bus, locked keyring) is an error.
    pub async fn probe(&self) -> Result<()> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Keyring unavailable")),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(json) => {
                let credential: Credential = serde_json::from_str(&json)
                    .context("Failed to deserialize credential from keyring")?;
                debug!("Loaded credential from keyring");
                Ok(Some(credential))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No credential found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    async fn store(&self, credential: &Credential) -> Result<()> {
        let entry = self.entry()?;
        let json = serde_json::to_string(credential).context("Failed to serialize credential")?;
        entry
            .set_password(&json)
            .context("Failed to store credential in keyring")?;
        debug!("Stored credential in keyring");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared credential from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// Plaintext file fallback for hosts without a usable keyring
///
/// The adapter that selects this store over the keyring is responsible for
/// warning the user about the weaker storage.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by the given file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => {
                let credential: Credential = serde_json::from_str(&json)
                    .context("Failed to deserialize credential file")?;
                Ok(Some(credential))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read credential file")),
        }
    }

    async fn store(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create credential directory")?;
        }
        let json = serde_json::to_string_pretty(credential)?;
        tokio::fs::write(&self.path, json)
            .await
            .context("Failed to write credential file")?;
        warn!(path = %self.path.display(), "Stored credential in a plaintext file");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove credential file")),
        }
    }
}

// ============================================================================
// TokenManager
// ============================================================================

/// Mutable authentication state, guarded by a plain mutex
struct AuthInner {
    state: AuthState,
    credential: Option<Credential>,
    /// Set once the terminal-invalidation notice has been delivered
    invalid_notified: bool,
}

/// Owns the credential pair and drives the refresh state machine
///
/// All consumers go through [`TokenManager::access_token`]; nothing else in
/// the process holds a token. Concurrent refresh attempts are collapsed
/// into a single network call behind an async gate with a double-checked
/// credential comparison.
pub struct TokenManager {
    inner: StdMutex<AuthInner>,
    /// Single-flight gate: at most one refresh call is outstanding
    refresh_gate: tokio::sync::Mutex<()>,
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    notifier: Arc<dyn Notifier>,
    /// How far ahead of expiry the proactive refresh fires
    refresh_lead: Duration,
}

impl TokenManager {
    /// Creates a manager in the `Uninitialized` state
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        notifier: Arc<dyn Notifier>,
        refresh_lead_secs: u64,
    ) -> Self {
        Self {
            inner: StdMutex::new(AuthInner {
                state: AuthState::Uninitialized,
                credential: None,
                invalid_notified: false,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
            store,
            refresher,
            notifier,
            refresh_lead: Duration::seconds(refresh_lead_secs as i64),
        }
    }

    /// Loads any persisted credential and enters the matching state
    pub async fn initialize(&self) -> Result<AuthState> {
        let credential = self.store.load().await?;
        let mut inner = self.lock();
        match credential {
            Some(c) => {
                debug!(expires_at = %c.expires_at, "Loaded persisted credential");
                inner.credential = Some(c);
                inner.state = AuthState::Active;
            }
            None => {
                inner.state = AuthState::Uninitialized;
            }
        }
        Ok(inner.state)
    }

    /// Installs a freshly obtained credential (login or re-authentication)
    ///
    /// Clears a previous terminal invalidation.
    pub async fn install(&self, credential: Credential) -> Result<()> {
        self.store.store(&credential).await?;
        let mut inner = self.lock();
        inner.credential = Some(credential);
        inner.state = AuthState::Active;
        inner.invalid_notified = false;
        info!("Credential installed");
        Ok(())
    }

    /// Clears the credential and returns to `Uninitialized`
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        let mut inner = self.lock();
        inner.credential = None;
        inner.state = AuthState::Uninitialized;
        info!("Logged out");
        Ok(())
    }

    /// Returns the current access token, refreshing first when it has expired
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let needs_refresh = {
            let inner = self.lock();
            match (&inner.state, &inner.credential) {
                (AuthState::Invalidated, _) => return Err(AuthError::Invalidated),
                (_, None) => return Err(AuthError::NotAuthenticated),
                (_, Some(c)) => c.is_expired(),
            }
        };

        if needs_refresh {
            self.refresh().await?;
        }

        self.current_token()
    }

    /// Returns the held access token without triggering a refresh
    pub fn current_token(&self) -> Result<String, AuthError> {
        let inner = self.lock();
        match (&inner.state, &inner.credential) {
            (AuthState::Invalidated, _) => Err(AuthError::Invalidated),
            (_, Some(c)) => Ok(c.access_token.clone()),
            (_, None) => Err(AuthError::NotAuthenticated),
        }
    }

    /// Expiry timestamp of the held credential, if any
    pub fn credential_expiry(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lock().credential.as_ref().map(|c| c.expires_at)
    }

    /// Exchanges the refresh token for a fresh credential
    ///
    /// Safe to call from many tasks at once: callers that arrive while a
    /// refresh is in flight wait on the gate and then observe the already
    /// rotated credential instead of issuing a second network call. A 401
    /// from the refresh endpoint is terminal.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let before = {
            let inner = self.lock();
            if inner.state == AuthState::Invalidated {
                return Err(AuthError::Invalidated);
            }
            inner
                .credential
                .as_ref()
                .ok_or(AuthError::NotAuthenticated)?
                .access_token
                .clone()
        };

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have rotated the credential while we waited.
        let refresh_token = {
            let mut inner = self.lock();
            if inner.state == AuthState::Invalidated {
                return Err(AuthError::Invalidated);
            }
            let credential = inner.credential.as_ref().ok_or(AuthError::NotAuthenticated)?;
            if credential.access_token != before {
                debug!("Credential already rotated by a concurrent refresh");
                return Ok(());
            }
            let refresh_token = credential.refresh_token.clone();
            inner.state = AuthState::RefreshInFlight;
            refresh_token
        };

        debug!("Refreshing access token");
        match self.refresher.refresh(&refresh_token).await {
            Ok(credential) => {
                if let Err(e) = self.store.store(&credential).await {
                    warn!(error = %e, "Failed to persist refreshed credential");
                }
                let mut inner = self.lock();
                inner.credential = Some(credential);
                inner.state = AuthState::Active;
                info!("Access token refreshed");
                Ok(())
            }
            Err(e) if e.is_auth() => {
                warn!(error = %e, "Refresh token rejected; invalidating credentials");
                self.invalidate().await;
                Err(AuthError::Invalidated)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                let mut inner = self.lock();
                inner.state = AuthState::Active;
                Err(AuthError::Refresh(e))
            }
        }
    }

    /// Runs one proactive refresh when the credential is near expiry
    pub async fn refresh_if_due(&self) -> Result<(), AuthError> {
        let due = {
            let inner = self.lock();
            matches!(
                (&inner.state, &inner.credential),
                (AuthState::Active, Some(c)) if c.expires_within(self.refresh_lead)
            )
        };
        if due {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    /// Spawns the background task that refreshes ahead of expiry
    ///
    /// The task exits once the manager enters the terminal `Invalidated`
    /// state; abort the handle to stop it earlier.
    pub fn spawn_refresh_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = {
                    let inner = self.lock();
                    match (&inner.state, &inner.credential) {
                        (AuthState::Invalidated, _) => return,
                        (_, Some(c)) => refresh_delay(c.expires_at, self.refresh_lead, Utc::now()),
                        (_, None) => IDLE_POLL,
                    }
                };
                tokio::time::sleep(delay).await;

                match self.refresh_if_due().await {
                    Ok(()) => {}
                    Err(AuthError::Invalidated) => {
                        debug!("Background refresh task stopping: credentials invalidated");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "Background refresh failed; retrying later");
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        })
    }

    /// Enters the terminal `Invalidated` state: clears persisted credentials
    /// and delivers the re-authentication notice exactly once
    async fn invalidate(&self) {
        let notify = {
            let mut inner = self.lock();
            inner.state = AuthState::Invalidated;
            inner.credential = None;
            let first = !inner.invalid_notified;
            inner.invalid_notified = true;
            first
        };

        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear stored credentials");
        }

        if notify {
            self.notifier
                .notify(
                    "Sync paused",
                    "Your session has expired. Please sign in again to resume syncing.",
                )
                .await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthInner> {
        // A poisoned lock means a panic mid-update; propagating the panic
        // is the only sane continuation.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AuthGate for TokenManager {
    fn auth_state(&self) -> AuthState {
        self.lock().state
    }
}

/// Time until the proactive refresh for a token expiring at `expires_at`
///
/// Fires `lead` ahead of expiry; immediately when already inside the lead
/// window.
fn refresh_delay(
    expires_at: DateTime<Utc>,
    lead: Duration,
    now: DateTime<Utc>,
) -> std::time::Duration {
    (expires_at - lead - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

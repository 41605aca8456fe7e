//! Shared wiring for CLI commands
//!
//! Every command needs the same stack: config, HTTP client, credential
//! store, token manager, and usually the sync orchestrator. [`AppContext`]
//! builds it once so the commands stay thin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scribesync_api::auth::{FileCredentialStore, KeyringCredentialStore, TokenManager};
use scribesync_api::client::ApiClient;
use scribesync_api::provider::{HttpRemoteStore, HttpTokenRefresher};
use scribesync_core::classify::Classifier;
use scribesync_core::config::Config;
use scribesync_core::ports::notification::Notifier;
use scribesync_core::ports::secure_store::CredentialStore;
use scribesync_engine::engine::{SyncOptions, SyncOrchestrator};
use scribesync_engine::state::{JsonFileState, SyncStateStore};
use scribesync_engine::vault::LocalVault;
use tracing::warn;

/// Notifier that surfaces notices on the terminal
pub struct ConsoleNotifier;

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, body: &str) {
        warn!(title, "{body}");
        eprintln!("\u{26a0} {title}: {body}");
    }
}

/// Everything a command needs, wired from one config file
pub struct AppContext {
    pub config: Config,
    pub client: ApiClient,
    pub tokens: Arc<TokenManager>,
    /// True when credentials live in the plaintext fallback file
    pub insecure_store: bool,
}

impl AppContext {
    /// Loads config and builds the auth stack
    ///
    /// Does not require the vault to exist; `auth` commands work before
    /// the first sync. Validation problems are logged, not fatal here.
    pub async fn build(config_override: Option<&str>) -> Result<Self> {
        let config_path = config_override
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&config_path);

        for problem in config.validate() {
            warn!(field = %problem.field, "{}", problem.message);
        }

        let client = ApiClient::with_timeout(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.timeout_secs),
        );

        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let (store, insecure_store) = select_credential_store(&config, notifier.as_ref()).await;

        let refresher = Arc::new(HttpTokenRefresher::new(client.clone()));
        let tokens = Arc::new(TokenManager::new(
            store,
            refresher,
            notifier,
            config.auth.refresh_lead_secs,
        ));
        tokens
            .initialize()
            .await
            .context("Failed to load stored credentials")?;

        Ok(Self {
            config,
            client,
            tokens,
            insecure_store,
        })
    }

    /// Builds the full sync stack on top of the auth stack
    pub async fn orchestrator(&self) -> Result<Arc<SyncOrchestrator>> {
        if !self.config.vault.root.exists() {
            anyhow::bail!(
                "Vault directory does not exist: {}",
                self.config.vault.root.display()
            );
        }

        let vault = Arc::new(LocalVault::new(
            self.config.vault.root.clone(),
            self.config.vault.extensions.clone(),
        ));
        let state = Arc::new(SyncStateStore::new(Box::new(JsonFileState::new(
            self.config.sync.state_file.clone(),
        ))));
        let remote = Arc::new(HttpRemoteStore::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
        ));
        let classifier = Classifier::new(self.config.vault.people_folders.clone());

        let orchestrator = Arc::new(SyncOrchestrator::new(
            vault,
            remote,
            Arc::clone(&self.tokens) as _,
            state,
            classifier,
            SyncOptions {
                debounce_ms: self.config.sync.debounce_ms,
                rename_window_ms: self.config.sync.rename_window_ms,
                batch_size: self.config.sync.batch_size,
                max_retries: self.config.sync.max_retries,
                max_note_bytes: self.config.sync.max_note_bytes,
                mirror_delete: self.config.sync.mirror_delete,
            },
        ));
        orchestrator.load_state().await?;
        Ok(orchestrator)
    }
}

/// Picks the keyring when it works, falling back to the plaintext file
///
/// The fallback is surfaced through the notifier so the user knows their
/// refresh token sits on disk unprotected.
async fn select_credential_store(
    config: &Config,
    notifier: &dyn Notifier,
) -> (Arc<dyn CredentialStore>, bool) {
    let keyring = KeyringCredentialStore::new(config.auth.keyring_service.clone());
    match keyring.probe().await {
        Ok(()) => (Arc::new(keyring), false),
        Err(e) => {
            warn!(error = %e, "OS keyring unavailable, using file fallback");
            notifier
                .notify(
                    "Insecure credential storage",
                    "The OS keyring is unavailable. Credentials will be stored in a plaintext file.",
                )
                .await;
            (
                Arc::new(FileCredentialStore::new(config.auth.fallback_file.clone())),
                true,
            )
        }
    }
}

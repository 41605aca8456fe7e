//! Shared test helpers for note-server integration tests
//!
//! Provides wiremock-based mock server setup and returns a configured
//! [`HttpRemoteStore`] pointing at the mock server, together with the
//! [`TokenManager`] backing it.

use std::sync::{Arc, Mutex};

use wiremock::MockServer;

use scribesync_api::auth::TokenManager;
use scribesync_api::client::ApiClient;
use scribesync_api::provider::{HttpRemoteStore, HttpTokenRefresher};
use scribesync_core::domain::credential::Credential;
use scribesync_core::ports::notification::{Notifier, NullNotifier};
use scribesync_core::ports::secure_store::CredentialStore;

/// In-memory credential store, so tests never touch the OS keyring
pub struct MemoryStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            credential: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> anyhow::Result<Option<Credential>> {
        Ok(self.credential.lock().unwrap().clone())
    }

    async fn store(&self, credential: &Credential) -> anyhow::Result<()> {
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.credential.lock().unwrap() = None;
        Ok(())
    }
}

/// Notifier that records every delivered notice
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            notices: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, _body: &str) {
        self.notices.lock().unwrap().push(title.to_string());
    }
}

/// Starts a mock server and builds a remote store authenticated with the
/// credential `("test-token", "test-refresh")`, expiring `expires_in` seconds
/// from now.
pub async fn setup_remote_store(
    expires_in: i64,
) -> (MockServer, HttpRemoteStore, Arc<TokenManager>) {
    setup_with_notifier(expires_in, Arc::new(NullNotifier)).await
}

/// Same as [`setup_remote_store`], with a caller-supplied notifier
pub async fn setup_with_notifier(
    expires_in: i64,
    notifier: Arc<dyn Notifier>,
) -> (MockServer, HttpRemoteStore, Arc<TokenManager>) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri());

    let refresher = Arc::new(HttpTokenRefresher::new(client.clone()));
    let tokens = Arc::new(TokenManager::new(
        MemoryStore::new(),
        refresher,
        notifier,
        3600,
    ));
    tokens
        .install(Credential::new("test-token", "test-refresh", expires_in))
        .await
        .expect("install credential");

    let store = HttpRemoteStore::new(client, tokens.clone());
    (server, store, tokens)
}

/// A note object as the server would return it
pub fn note_json(id: &str, collection: &str, source_path: Option<&str>, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "collection": collection,
        "sourcePath": source_path,
        "title": title
    })
}

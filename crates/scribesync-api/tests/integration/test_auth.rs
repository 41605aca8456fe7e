//! Integration tests for the token refresh flow
//!
//! Covers the dedicated refresh endpoint, the reactive refresh-and-retry-once
//! on 401, and the terminal invalidation when the refresh token itself is
//! rejected.

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use scribesync_api::client::ApiClient;
use scribesync_api::provider::HttpTokenRefresher;
use scribesync_core::classify::CollectionKind;
use scribesync_core::ports::AuthGate;
use scribesync_core::domain::credential::AuthState;
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::ports::remote_store::{RemoteError, RemoteStore, TokenRefresher};

use crate::common;

#[tokio::test]
async fn test_refresh_endpoint_returns_credential() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_partial_json(serde_json::json!({
            "refreshToken": "old-refresh"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "new-access",
            "refreshToken": "new-refresh",
            "expiresIn": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let refresher = HttpTokenRefresher::new(ApiClient::new(server.uri()));
    let credential = refresher.refresh("old-refresh").await.expect("refresh failed");
    assert_eq!(credential.access_token, "new-access");
    assert_eq!(credential.refresh_token, "new-refresh");
    assert!(!credential.is_expired());
}

#[tokio::test]
async fn test_request_401_triggers_refresh_and_single_retry() {
    let (server, store, tokens) = common::setup_remote_store(3600).await;

    // The stale token is rejected...
    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // ...the refresh endpoint rotates it...
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "rotated-token",
            "refreshToken": "rotated-refresh",
            "expiresIn": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    // ...and the retried request succeeds with the new bearer.
    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .and(header("authorization", "Bearer rotated-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::note_json(
            "note-1",
            "entry",
            Some("Journal/a.md"),
            "A",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let found = store
        .find_by_path(
            CollectionKind::Entry,
            &VaultPath::new("Journal/a.md").unwrap(),
        )
        .await
        .expect("request should succeed after refresh");
    assert!(found.is_some());
    assert_eq!(tokens.current_token().unwrap(), "rotated-token");
    assert_eq!(tokens.auth_state(), AuthState::Active);
}

#[tokio::test]
async fn test_refresh_rejection_invalidates_credentials() {
    let notifier = common::RecordingNotifier::new();
    let (server, store, tokens) = common::setup_with_notifier(3600, notifier.clone()).await;

    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The refresh token itself is rejected: terminal.
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let journal_path = VaultPath::new("Journal/a.md").unwrap();
    let err = store
        .find_by_path(CollectionKind::Entry, &journal_path)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
    assert_eq!(tokens.auth_state(), AuthState::Invalidated);
    assert_eq!(notifier.count(), 1);

    // A second call fails locally: the expect(1) counters above verify that
    // neither endpoint is hit again.
    let err = store
        .find_by_path(CollectionKind::Entry, &journal_path)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn test_transient_refresh_failure_is_not_terminal() {
    let (server, store, tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "token expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
            "error": "bad gateway"
        })))
        .mount(&server)
        .await;

    let err = store
        .find_by_path(
            CollectionKind::Entry,
            &VaultPath::new("Journal/a.md").unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Server { status: 502, .. }));
    assert!(err.is_retryable());
    assert_eq!(tokens.auth_state(), AuthState::Active);
}

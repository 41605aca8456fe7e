//! HTTP implementation of the remote store port
//!
//! [`HttpRemoteStore`] maps the [`RemoteStore`] operations onto the note
//! server's REST endpoints:
//!
//! - `GET    /api/{collection}/by-path?path=...` - path lookup
//! - `GET    /api/{collection}?page=N`           - paged listing
//! - `POST   /api/{collection}`                  - create
//! - `PUT    /api/{collection}/{id}`             - update
//! - `DELETE /api/{collection}/{id}`             - delete
//! - `POST   /api/sync/bulk`                     - idempotent bulk upsert
//!
//! Every request carries the bearer token from the [`TokenManager`]. On a
//! 401 the request is retried exactly once after a refresh; a second 401
//! propagates as [`RemoteError::Unauthorized`].

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use scribesync_core::classify::CollectionKind;
use scribesync_core::domain::credential::Credential;
use scribesync_core::domain::newtypes::{RemoteId, VaultPath};
use scribesync_core::ports::remote_store::{
    BulkSyncRequest, BulkSyncResponse, NoteUpsert, RemoteError, RemoteNote, RemoteNotePage,
    RemoteStore, TokenRefresher,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::TokenManager;
use crate::client::ApiClient;

// ============================================================================
// Wire types
// ============================================================================

/// One page of a listing as the server sends it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageWire {
    notes: Vec<RemoteNote>,
    #[serde(default)]
    next_page: Option<u32>,
}

/// Response from the token refresh endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshWire {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

// ============================================================================
// HttpTokenRefresher
// ============================================================================

/// Calls the dedicated refresh endpoint with a bare refresh token
///
/// Deliberately independent of [`TokenManager`]: refresh must keep working
/// while every token-bearing request is failing with 401.
pub struct HttpTokenRefresher {
    client: ApiClient,
}

impl HttpTokenRefresher {
    /// Creates a refresher against the given server
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RemoteError> {
        let response = self
            .client
            .request(Method::POST, "/api/auth/refresh")
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(ApiClient::map_transport_error)?;

        if !response.status().is_success() {
            return Err(ApiClient::map_status_error(response).await);
        }

        let wire: RefreshWire = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        Ok(Credential::new(
            wire.access_token,
            wire.refresh_token,
            wire.expires_in,
        ))
    }
}

/// Exchanges a username and password for an initial credential pair
///
/// `POST /api/auth/login` is the only call made without a bearer token;
/// the returned credential is handed to the token manager, which owns it
/// from then on.
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<Credential, RemoteError> {
    let response = client
        .request(Method::POST, "/api/auth/login")
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .map_err(ApiClient::map_transport_error)?;

    if !response.status().is_success() {
        return Err(ApiClient::map_status_error(response).await);
    }

    let wire: RefreshWire = response
        .json()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

    Ok(Credential::new(
        wire.access_token,
        wire.refresh_token,
        wire.expires_in,
    ))
}

// ============================================================================
// HttpRemoteStore
// ============================================================================

/// The remote store port backed by the note server's REST API
pub struct HttpRemoteStore {
    client: ApiClient,
    tokens: Arc<TokenManager>,
}

impl HttpRemoteStore {
    /// Creates a store using the given client and token manager
    pub fn new(client: ApiClient, tokens: Arc<TokenManager>) -> Self {
        Self { client, tokens }
    }

    /// Sends an authenticated request, refreshing and retrying once on 401
    ///
    /// The request is rebuilt per attempt so the retry carries the rotated
    /// token.
    async fn send_authed(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, RemoteError> {
        let token = self.tokens.access_token().await?;
        let response = self.send_once(&method, path, query, body, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path, "Request returned 401; refreshing token and retrying once");
        self.tokens.refresh().await?;
        let token = self.tokens.current_token()?;
        let response = self.send_once(&method, path, query, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Request still unauthorized after refresh");
        }
        Ok(response)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<Response, RemoteError> {
        let mut request = self.client.request(method.clone(), path).bearer_auth(token);
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(ApiClient::map_transport_error)
    }

    /// Deserializes a successful response body, or maps the error status
    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, RemoteError> {
        if !response.status().is_success() {
            return Err(ApiClient::map_status_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn find_by_path(
        &self,
        collection: CollectionKind,
        path: &VaultPath,
    ) -> Result<Option<RemoteNote>, RemoteError> {
        let endpoint = format!("/api/{}/by-path", collection.as_str());
        let query = [("path", path.as_str().to_string())];
        let response = self
            .send_authed(Method::GET, &endpoint, Some(&query), None)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse(response).await?))
    }

    async fn create_note(&self, note: &NoteUpsert) -> Result<RemoteNote, RemoteError> {
        let endpoint = format!("/api/{}", note.collection.as_str());
        let body = serde_json::to_value(note)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::POST, &endpoint, None, Some(&body))
            .await?;
        Self::parse(response).await
    }

    async fn update_note(
        &self,
        id: &RemoteId,
        note: &NoteUpsert,
    ) -> Result<RemoteNote, RemoteError> {
        let endpoint = format!("/api/{}/{}", note.collection.as_str(), id.as_str());
        let body = serde_json::to_value(note)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::PUT, &endpoint, None, Some(&body))
            .await?;
        Self::parse(response).await
    }

    async fn delete_note(
        &self,
        collection: CollectionKind,
        id: &RemoteId,
    ) -> Result<(), RemoteError> {
        let endpoint = format!("/api/{}/{}", collection.as_str(), id.as_str());
        let response = self
            .send_authed(Method::DELETE, &endpoint, None, None)
            .await?;

        // Deleting an already-gone object is a success for the mirror.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(ApiClient::map_status_error(response).await)
        }
    }

    async fn list_notes(
        &self,
        collection: CollectionKind,
        page: u32,
    ) -> Result<RemoteNotePage, RemoteError> {
        let endpoint = format!("/api/{}", collection.as_str());
        let query = [("page", page.to_string())];
        let response = self
            .send_authed(Method::GET, &endpoint, Some(&query), None)
            .await?;
        let wire: PageWire = Self::parse(response).await?;
        Ok(RemoteNotePage {
            notes: wire.notes,
            next_page: wire.next_page,
        })
    }

    async fn bulk_upsert(
        &self,
        request: &BulkSyncRequest,
    ) -> Result<BulkSyncResponse, RemoteError> {
        let body = serde_json::to_value(request)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::POST, "/api/sync/bulk", None, Some(&body))
            .await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_wire_deserialization() {
        let json = r#"{
            "notes": [
                {"id": "n1", "collection": "entry", "sourcePath": "Journal/a.md", "title": "A"},
                {"id": "n2", "collection": "person", "sourcePath": null, "title": "B"}
            ],
            "nextPage": 2
        }"#;
        let page: PageWire = serde_json::from_str(json).unwrap();
        assert_eq!(page.notes.len(), 2);
        assert_eq!(page.notes[0].source_path.as_deref(), Some("Journal/a.md"));
        assert!(page.notes[1].source_path.is_none());
        assert_eq!(page.next_page, Some(2));
    }

    #[test]
    fn test_page_wire_last_page() {
        let json = r#"{"notes": []}"#;
        let page: PageWire = serde_json::from_str(json).unwrap();
        assert!(page.notes.is_empty());
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_refresh_wire_deserialization() {
        let json = r#"{"accessToken": "a", "refreshToken": "r", "expiresIn": 3600}"#;
        let wire: RefreshWire = serde_json::from_str(json).unwrap();
        assert_eq!(wire.access_token, "a");
        assert_eq!(wire.refresh_token, "r");
        assert_eq!(wire.expires_in, 3600);
    }
}

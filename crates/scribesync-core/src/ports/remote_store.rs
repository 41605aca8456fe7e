//! Remote store port (driven/secondary port)
//!
//! This module defines the interface to the remote document store, together
//! with the typed error taxonomy that drives every retry decision in the
//! engine, and the DTOs for the bulk-sync contract.
//!
//! ## Design Notes
//!
//! - Unlike the other ports, this one returns a typed [`RemoteError`] rather
//!   than `anyhow::Result`: the sync queue's retry policy needs to classify
//!   failures (transient vs. auth vs. conflict), so the categories are part
//!   of the port contract.
//! - The bulk upsert endpoint is idempotent server-side: resubmitting an
//!   already-synced item is a safe no-op. This is what lets full passes
//!   always encode actions as upserts instead of tracking create-vs-update.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::CollectionKind;
use crate::domain::newtypes::{RemoteId, VaultPath};

// ============================================================================
// RemoteError taxonomy
// ============================================================================

/// Errors from the remote store, categorized for retry decisions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A network-level failure (connection refused, DNS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The transport-level timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// The access token was rejected (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the operation (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conflicting concurrent change or duplicate key (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payload was rejected as invalid, or exceeded the size limit
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A server-side failure (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Server-provided error message, if any
        message: String,
    },

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Returns true for failures worth retrying (network, timeout, 5xx)
    ///
    /// Authentication and conflict failures are never retried by the queue:
    /// a blind retry would re-trigger the same failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Network(_) | RemoteError::Timeout | RemoteError::Server { .. }
        )
    }

    /// Returns true for authentication failures
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }
}

// ============================================================================
// DTOs
// ============================================================================

/// A document as known to the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNote {
    /// Remote object identifier
    pub id: RemoteId,
    /// Which collection the object lives in
    pub collection: CollectionKind,
    /// The local vault path this object originated from
    ///
    /// `None` for objects created through channels other than file sync;
    /// the mirror-delete reconciler must never touch those.
    pub source_path: Option<String>,
    /// Object title
    pub title: String,
}

/// One page of a remote listing
#[derive(Debug, Clone)]
pub struct RemoteNotePage {
    /// The objects on this page
    pub notes: Vec<RemoteNote>,
    /// The next page number, if more results exist
    pub next_page: Option<u32>,
}

/// An outgoing create-or-update payload for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpsert {
    /// Vault path, used as the remote upsert key
    pub path: VaultPath,
    /// Target collection
    pub collection: CollectionKind,
    /// Document title
    pub title: String,
    /// Document date (ISO `YYYY-MM-DD`)
    pub date: String,
    /// Full document content
    pub content: String,
    /// SHA-256 content digest, comparable with the remote's canonical hash
    pub content_hash: String,
}

/// The bulk-sync request body: items pre-grouped by target collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSyncRequest {
    /// Journal entries
    pub entries: Vec<NoteUpsert>,
    /// Relationship notes
    pub people: Vec<NoteUpsert>,
}

impl BulkSyncRequest {
    /// Total number of items across both collections
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.people.len()
    }

    /// Returns true if the request carries no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.people.is_empty()
    }
}

/// A per-item failure reported inside a bulk response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    /// Vault path of the failed item
    pub path: String,
    /// Server-provided error description
    pub error: String,
}

/// Per-collection counts from a bulk call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkReport {
    /// Objects created by this call
    pub created: u32,
    /// Objects updated by this call
    pub updated: u32,
    /// Objects deleted by this call
    pub deleted: u32,
    /// Per-item failures; never aborts the sibling items
    #[serde(default)]
    pub errors: Vec<BulkItemError>,
}

/// The bulk-sync response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSyncResponse {
    /// Counts for the entries collection
    pub entries: BulkReport,
    /// Counts for the people collection
    pub people: BulkReport,
    /// Server-side elapsed time for the whole call
    #[serde(default)]
    pub duration_ms: u64,
}

// ============================================================================
// RemoteStore trait
// ============================================================================

/// Port trait for the remote document store
///
/// Implementations handle transport, bearer authentication (including the
/// reactive refresh-and-retry-once on 401), and mapping HTTP failures onto
/// the [`RemoteError`] taxonomy.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Looks up an object by its originating vault path
    ///
    /// Returns `Ok(None)` when no object with that path exists.
    async fn find_by_path(
        &self,
        collection: CollectionKind,
        path: &VaultPath,
    ) -> Result<Option<RemoteNote>, RemoteError>;

    /// Creates a new object
    async fn create_note(&self, note: &NoteUpsert) -> Result<RemoteNote, RemoteError>;

    /// Updates an existing object by remote ID
    async fn update_note(
        &self,
        id: &RemoteId,
        note: &NoteUpsert,
    ) -> Result<RemoteNote, RemoteError>;

    /// Deletes an object by remote ID
    async fn delete_note(
        &self,
        collection: CollectionKind,
        id: &RemoteId,
    ) -> Result<(), RemoteError>;

    /// Lists one page of a collection
    async fn list_notes(
        &self,
        collection: CollectionKind,
        page: u32,
    ) -> Result<RemoteNotePage, RemoteError>;

    /// Submits one size-bounded chunk to the idempotent bulk upsert endpoint
    async fn bulk_upsert(&self, request: &BulkSyncRequest)
        -> Result<BulkSyncResponse, RemoteError>;
}

// ============================================================================
// TokenRefresher trait
// ============================================================================

/// Port trait for the dedicated token refresh endpoint
///
/// Kept separate from [`RemoteStore`] because the token lifecycle manager is
/// the only caller, and refresh must work even while normal requests are
/// failing with 401.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges a refresh token for a fresh credential
    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<crate::domain::credential::Credential, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(RemoteError::Network("reset".into()).is_retryable());
        assert!(RemoteError::Timeout.is_retryable());
        assert!(RemoteError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_terminal_categories() {
        assert!(!RemoteError::Unauthorized("bad token".into()).is_retryable());
        assert!(!RemoteError::Conflict("duplicate".into()).is_retryable());
        assert!(!RemoteError::Validation("too large".into()).is_retryable());
        assert!(!RemoteError::NotFound("gone".into()).is_retryable());
    }

    #[test]
    fn test_is_auth() {
        assert!(RemoteError::Unauthorized("x".into()).is_auth());
        assert!(!RemoteError::Forbidden("x".into()).is_auth());
    }

    #[test]
    fn test_bulk_request_len() {
        let req = BulkSyncRequest::default();
        assert!(req.is_empty());
        assert_eq!(req.len(), 0);
    }

    #[test]
    fn test_bulk_response_deserialization() {
        let json = r#"{
            "entries": {"created": 3, "updated": 1, "deleted": 0,
                        "errors": [{"path": "Journal/bad.md", "error": "invalid date"}]},
            "people": {"created": 0, "updated": 2, "deleted": 0, "errors": []},
            "durationMs": 180
        }"#;

        let resp: BulkSyncResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.entries.created, 3);
        assert_eq!(resp.entries.errors.len(), 1);
        assert_eq!(resp.entries.errors[0].path, "Journal/bad.md");
        assert_eq!(resp.people.updated, 2);
        assert_eq!(resp.duration_ms, 180);
    }
}

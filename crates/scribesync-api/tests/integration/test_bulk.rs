//! Integration tests for the bulk-sync endpoint

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use scribesync_core::classify::CollectionKind;
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::ports::remote_store::{
    BulkSyncRequest, NoteUpsert, RemoteError, RemoteStore,
};

use crate::common;

fn upsert(path: &str, collection: CollectionKind, title: &str) -> NoteUpsert {
    NoteUpsert {
        path: VaultPath::new(path).unwrap(),
        collection,
        title: title.to_string(),
        date: "2026-01-23".to_string(),
        content: "body".to_string(),
        content_hash: "cd".repeat(32),
    }
}

#[tokio::test]
async fn test_bulk_upsert_groups_by_collection() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("POST"))
        .and(path("/api/sync/bulk"))
        .and(body_partial_json(serde_json::json!({
            "entries": [{"path": "Journal/a.md", "title": "A"}],
            "people": [{"path": "People/Alice.md", "title": "Alice"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": {"created": 1, "updated": 0, "deleted": 0, "errors": []},
            "people": {"created": 0, "updated": 1, "deleted": 0, "errors": []},
            "durationMs": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = BulkSyncRequest {
        entries: vec![upsert("Journal/a.md", CollectionKind::Entry, "A")],
        people: vec![upsert("People/Alice.md", CollectionKind::Person, "Alice")],
    };

    let response = store.bulk_upsert(&request).await.expect("bulk_upsert failed");
    assert_eq!(response.entries.created, 1);
    assert_eq!(response.people.updated, 1);
    assert!(response.entries.errors.is_empty());
    assert_eq!(response.duration_ms, 42);
}

#[tokio::test]
async fn test_bulk_upsert_reports_partial_failures() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("POST"))
        .and(path("/api/sync/bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "entries": {
                "created": 2, "updated": 0, "deleted": 0,
                "errors": [{"path": "Journal/bad.md", "error": "invalid date"}]
            },
            "people": {"created": 0, "updated": 0, "deleted": 0, "errors": []}
        })))
        .mount(&server)
        .await;

    let request = BulkSyncRequest {
        entries: vec![
            upsert("Journal/a.md", CollectionKind::Entry, "A"),
            upsert("Journal/b.md", CollectionKind::Entry, "B"),
            upsert("Journal/bad.md", CollectionKind::Entry, "Bad"),
        ],
        people: vec![],
    };

    // Sibling items succeed even when one item fails.
    let response = store.bulk_upsert(&request).await.expect("bulk_upsert failed");
    assert_eq!(response.entries.created, 2);
    assert_eq!(response.entries.errors.len(), 1);
    assert_eq!(response.entries.errors[0].path, "Journal/bad.md");
}

#[tokio::test]
async fn test_bulk_upsert_server_error_is_retryable() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("POST"))
        .and(path("/api/sync/bulk"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "database unavailable"
        })))
        .mount(&server)
        .await;

    let request = BulkSyncRequest {
        entries: vec![upsert("Journal/a.md", CollectionKind::Entry, "A")],
        people: vec![],
    };

    let err = store.bulk_upsert(&request).await.unwrap_err();
    assert!(err.is_retryable());
}

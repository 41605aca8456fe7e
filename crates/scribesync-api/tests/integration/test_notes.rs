//! Integration tests for the note CRUD and listing endpoints

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use scribesync_core::classify::CollectionKind;
use scribesync_core::domain::newtypes::{RemoteId, VaultPath};
use scribesync_core::ports::remote_store::{NoteUpsert, RemoteError, RemoteStore};

use crate::common;

fn upsert(path: &str, collection: CollectionKind, title: &str) -> NoteUpsert {
    NoteUpsert {
        path: VaultPath::new(path).unwrap(),
        collection,
        title: title.to_string(),
        date: "2026-01-23".to_string(),
        content: "body".to_string(),
        content_hash: "ab".repeat(32),
    }
}

#[tokio::test]
async fn test_find_by_path_returns_note() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .and(query_param("path", "Journal/2026-01-23.md"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::note_json(
            "note-1",
            "entry",
            Some("Journal/2026-01-23.md"),
            "Morning pages",
        )))
        .mount(&server)
        .await;

    let found = store
        .find_by_path(
            CollectionKind::Entry,
            &VaultPath::new("Journal/2026-01-23.md").unwrap(),
        )
        .await
        .expect("find_by_path failed")
        .expect("note should exist");

    assert_eq!(found.id.as_str(), "note-1");
    assert_eq!(found.title, "Morning pages");
    assert_eq!(found.source_path.as_deref(), Some("Journal/2026-01-23.md"));
}

#[tokio::test]
async fn test_find_by_path_missing_returns_none() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("GET"))
        .and(path("/api/people/by-path"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "not found"
        })))
        .mount(&server)
        .await;

    let found = store
        .find_by_path(
            CollectionKind::Person,
            &VaultPath::new("People/Nobody.md").unwrap(),
        )
        .await
        .expect("find_by_path failed");
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_note() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("POST"))
        .and(path("/api/people"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::note_json(
            "person-7",
            "person",
            Some("People/Alice.md"),
            "Alice",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let created = store
        .create_note(&upsert("People/Alice.md", CollectionKind::Person, "Alice"))
        .await
        .expect("create_note failed");
    assert_eq!(created.id.as_str(), "person-7");
    assert_eq!(created.collection, CollectionKind::Person);
}

#[tokio::test]
async fn test_create_conflict_maps_to_conflict_error() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("POST"))
        .and(path("/api/entries"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "an entry for this date already exists"
        })))
        .mount(&server)
        .await;

    let err = store
        .create_note(&upsert("Journal/dup.md", CollectionKind::Entry, "Dup"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Conflict(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_update_note() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("PUT"))
        .and(path("/api/entries/note-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::note_json(
            "note-1",
            "entry",
            Some("Journal/a.md"),
            "Updated",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let updated = store
        .update_note(
            &RemoteId::new("note-1").unwrap(),
            &upsert("Journal/a.md", CollectionKind::Entry, "Updated"),
        )
        .await
        .expect("update_note failed");
    assert_eq!(updated.title, "Updated");
}

#[tokio::test]
async fn test_delete_note_tolerates_already_gone() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("DELETE"))
        .and(path("/api/people/person-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/people/person-2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    store
        .delete_note(CollectionKind::Person, &RemoteId::new("person-1").unwrap())
        .await
        .expect("delete failed");
    store
        .delete_note(CollectionKind::Person, &RemoteId::new("person-2").unwrap())
        .await
        .expect("delete of missing note should succeed");
}

#[tokio::test]
async fn test_list_notes_pagination() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("GET"))
        .and(path("/api/people"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "notes": [common::note_json("p1", "person", Some("People/A.md"), "A")],
            "nextPage": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/people"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "notes": [common::note_json("p2", "person", None, "B")]
        })))
        .mount(&server)
        .await;

    let first = store
        .list_notes(CollectionKind::Person, 1)
        .await
        .expect("list page 1 failed");
    assert_eq!(first.notes.len(), 1);
    assert_eq!(first.next_page, Some(2));

    let second = store
        .list_notes(CollectionKind::Person, 2)
        .await
        .expect("list page 2 failed");
    assert_eq!(second.notes.len(), 1);
    assert!(second.notes[0].source_path.is_none());
    assert_eq!(second.next_page, None);
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let (server, store, _tokens) = common::setup_remote_store(3600).await;

    Mock::given(method("GET"))
        .and(path("/api/entries/by-path"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": "maintenance"
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
    assert!(matches!(err, RemoteError::Server { status: 503, .. }));
    assert!(err.is_retryable());
}

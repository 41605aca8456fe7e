//! Chunked submission to the bulk-sync endpoint
//!
//! Full passes push every outgoing document through here. Items are split
//! into fixed-size chunks, each sent as one `{entries, people}` request;
//! the endpoint is idempotent, so re-sending an already-synced item is a
//! safe no-op. Oversized documents are rejected locally before any network
//! traffic, mirroring the server's own size limit, and per-item failures
//! reported by the server are collected without aborting sibling items.

use scribesync_core::classify::CollectionKind;
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::ports::remote_store::{
    BulkItemError, BulkSyncRequest, NoteUpsert, RemoteError, RemoteStore,
};
use tracing::{debug, warn};

/// Merged outcome of one batched submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Items actually sent to the server
    pub submitted: usize,
    /// Objects created across all chunks
    pub created: u32,
    /// Objects updated across all chunks
    pub updated: u32,
    /// Per-item failures: server-reported plus local pre-flight rejections
    pub errors: Vec<BulkItemError>,
    /// Paths the server acknowledged as part of a completed chunk
    pub acknowledged: Vec<VaultPath>,
    /// Transport failure that stopped the remaining chunks, if any
    pub aborted: Option<RemoteError>,
}

/// Splits outgoing documents into bounded bulk requests
pub struct Batcher {
    /// Items per chunk
    batch_size: usize,
    /// Local rejection threshold for a single document, in bytes
    max_note_bytes: u64,
}

impl Batcher {
    /// Creates a batcher with the given chunk size and per-document limit
    pub fn new(batch_size: usize, max_note_bytes: u64) -> Self {
        Self {
            batch_size,
            max_note_bytes,
        }
    }

    /// Sends all items through the bulk endpoint, chunk by chunk
    ///
    /// A transport-level chunk failure stops the remaining chunks, but the
    /// progress made up to that point is kept: the summary carries the
    /// acknowledged paths alongside the failure, so the caller can record
    /// what already landed. Per-item failures inside a successful chunk are
    /// merged into the summary instead.
    pub async fn run(&self, store: &dyn RemoteStore, items: Vec<NoteUpsert>) -> BulkSummary {
        let mut summary = BulkSummary::default();

        let mut eligible = Vec::with_capacity(items.len());
        for item in items {
            if item.content.len() as u64 > self.max_note_bytes {
                warn!(
                    path = %item.path.as_str(),
                    bytes = item.content.len(),
                    "Skipping oversized document"
                );
                summary.errors.push(BulkItemError {
                    path: item.path.as_str().to_string(),
                    error: format!(
                        "document exceeds the maximum size of {} bytes",
                        self.max_note_bytes
                    ),
                });
            } else {
                eligible.push(item);
            }
        }

        for chunk in self.chunk(eligible) {
            debug!(items = chunk.len(), "Submitting bulk chunk");
            summary.submitted += chunk.len();
            let response = match store.bulk_upsert(&chunk).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Bulk chunk failed, aborting remaining chunks");
                    summary.aborted = Some(e);
                    break;
                }
            };

            summary.created += response.entries.created + response.people.created;
            summary.updated += response.entries.updated + response.people.updated;
            summary.errors.extend(response.entries.errors);
            summary.errors.extend(response.people.errors);
            summary.acknowledged.extend(
                chunk
                    .entries
                    .iter()
                    .chain(chunk.people.iter())
                    .map(|item| item.path.clone()),
            );
        }

        summary
    }

    /// Groups items into `{entries, people}` requests of at most
    /// `batch_size` items each
    fn chunk(&self, items: Vec<NoteUpsert>) -> Vec<BulkSyncRequest> {
        let mut requests = Vec::new();
        let mut current = BulkSyncRequest::default();

        for item in items {
            match item.collection {
                CollectionKind::Entry => current.entries.push(item),
                CollectionKind::Person => current.people.push(item),
            }
            if current.len() >= self.batch_size {
                requests.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            requests.push(current);
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribesync_core::domain::newtypes::{RemoteId, VaultPath};
    use scribesync_core::ports::remote_store::{
        BulkReport, BulkSyncResponse, RemoteNote, RemoteNotePage,
    };
    use std::sync::Mutex;

    fn upsert(path: &str, collection: CollectionKind, content: &str) -> NoteUpsert {
        NoteUpsert {
            path: VaultPath::new(path).unwrap(),
            collection,
            title: path.to_string(),
            date: "2026-01-01".to_string(),
            content: content.to_string(),
            content_hash: "0".repeat(64),
        }
    }

    /// Remote store stub that records bulk requests and replays canned
    /// responses
    struct BulkStub {
        requests: Mutex<Vec<BulkSyncRequest>>,
        responses: Mutex<Vec<Result<BulkSyncResponse, RemoteError>>>,
    }

    impl BulkStub {
        fn new(responses: Vec<Result<BulkSyncResponse, RemoteError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }

        fn ok_counting() -> BulkSyncResponse {
            BulkSyncResponse::default()
        }
    }

    #[async_trait::async_trait]
    impl RemoteStore for BulkStub {
        async fn find_by_path(
            &self,
            _collection: CollectionKind,
            _path: &VaultPath,
        ) -> Result<Option<RemoteNote>, RemoteError> {
            unreachable!("not used by the batcher")
        }
        async fn create_note(&self, _note: &NoteUpsert) -> Result<RemoteNote, RemoteError> {
            unreachable!("not used by the batcher")
        }
        async fn update_note(
            &self,
            _id: &RemoteId,
            _note: &NoteUpsert,
        ) -> Result<RemoteNote, RemoteError> {
            unreachable!("not used by the batcher")
        }
        async fn delete_note(
            &self,
            _collection: CollectionKind,
            _id: &RemoteId,
        ) -> Result<(), RemoteError> {
            unreachable!("not used by the batcher")
        }
        async fn list_notes(
            &self,
            _collection: CollectionKind,
            _page: u32,
        ) -> Result<RemoteNotePage, RemoteError> {
            unreachable!("not used by the batcher")
        }
        async fn bulk_upsert(
            &self,
            request: &BulkSyncRequest,
        ) -> Result<BulkSyncResponse, RemoteError> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Self::ok_counting())
            } else {
                responses.remove(0)
            }
        }
    }

    fn response(created: u32, updated: u32, errors: Vec<BulkItemError>) -> BulkSyncResponse {
        BulkSyncResponse {
            entries: BulkReport {
                created,
                updated,
                deleted: 0,
                errors,
            },
            people: BulkReport::default(),
            duration_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_chunks_of_fifty() {
        let items: Vec<NoteUpsert> = (0..120)
            .map(|i| upsert(&format!("Journal/{i}.md"), CollectionKind::Entry, "x"))
            .collect();
        let stub = BulkStub::new(vec![]);

        let summary = Batcher::new(50, 1024).run(&stub, items).await;
        assert_eq!(summary.submitted, 120);
        assert_eq!(summary.acknowledged.len(), 120);
        assert!(summary.aborted.is_none());

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].len(), 50);
        assert_eq!(requests[1].len(), 50);
        assert_eq!(requests[2].len(), 20);
    }

    #[tokio::test]
    async fn test_items_grouped_by_collection() {
        let items = vec![
            upsert("Journal/a.md", CollectionKind::Entry, "x"),
            upsert("People/Alice.md", CollectionKind::Person, "x"),
            upsert("Journal/b.md", CollectionKind::Entry, "x"),
        ];
        let stub = BulkStub::new(vec![]);

        Batcher::new(50, 1024).run(&stub, items).await;

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].entries.len(), 2);
        assert_eq!(requests[0].people.len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_items_rejected_locally() {
        let items = vec![
            upsert("Journal/small.md", CollectionKind::Entry, "ok"),
            upsert("Journal/huge.md", CollectionKind::Entry, &"x".repeat(2000)),
        ];
        let stub = BulkStub::new(vec![]);

        let summary = Batcher::new(50, 1024).run(&stub, items).await;
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, "Journal/huge.md");

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests[0].len(), 1);
    }

    #[tokio::test]
    async fn test_per_item_errors_merged_across_chunks() {
        let stub = BulkStub::new(vec![
            Ok(response(
                1,
                0,
                vec![BulkItemError {
                    path: "Journal/bad.md".into(),
                    error: "invalid date".into(),
                }],
            )),
            Ok(response(0, 2, vec![])),
        ]);
        let items: Vec<NoteUpsert> = (0..4)
            .map(|i| upsert(&format!("Journal/{i}.md"), CollectionKind::Entry, "x"))
            .collect();

        let summary = Batcher::new(2, 1024).run(&stub, items).await;
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_chunk_failure_keeps_earlier_progress() {
        let stub = BulkStub::new(vec![
            Ok(response(2, 0, vec![])),
            Err(RemoteError::Timeout),
        ]);
        let items: Vec<NoteUpsert> = (0..4)
            .map(|i| upsert(&format!("Journal/{i}.md"), CollectionKind::Entry, "x"))
            .collect();

        let summary = Batcher::new(2, 1024).run(&stub, items).await;
        assert_eq!(summary.aborted, Some(RemoteError::Timeout));
        assert_eq!(stub.requests.lock().unwrap().len(), 2);

        // The first chunk landed and stays acknowledged despite the abort
        assert_eq!(summary.created, 2);
        assert_eq!(
            summary.acknowledged,
            vec![
                VaultPath::new("Journal/0.md").unwrap(),
                VaultPath::new("Journal/1.md").unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let stub = BulkStub::new(vec![]);
        let summary = Batcher::new(50, 1024).run(&stub, vec![]).await;
        assert_eq!(summary, BulkSummary::default());
        assert!(stub.requests.lock().unwrap().is_empty());
    }
}

//! Port definitions (hexagonal architecture)
//!
//! Ports are trait interfaces that decouple the sync engine from concrete
//! adapters: the HTTP remote store, the local vault filesystem, the state
//! snapshot file, the OS keyring, and desktop notifications.

pub mod auth;
pub mod notification;
pub mod remote_store;
pub mod secure_store;
pub mod state_store;
pub mod vault;

pub use auth::AuthGate;
pub use notification::Notifier;
pub use remote_store::{
    BulkItemError, BulkReport, BulkSyncRequest, BulkSyncResponse, NoteUpsert, RemoteError,
    RemoteNote, RemoteNotePage, RemoteStore, TokenRefresher,
};
pub use secure_store::CredentialStore;
pub use state_store::StatePersistence;
pub use vault::{FileStat, Vault};

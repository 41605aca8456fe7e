//! Domain entities and business logic
//!
//! This module contains the core domain types for Scribesync:
//! - Newtypes for type-safe paths, hashes, and remote identifiers
//! - Sync queue items, per-file sync records, and the persisted snapshot
//! - The credential pair and the authentication state machine states
//! - Domain-specific error types

pub mod credential;
pub mod errors;
pub mod newtypes;
pub mod record;

// Re-export commonly used types
pub use credential::{AuthState, Credential};
pub use errors::DomainError;
pub use newtypes::{ContentHash, RemoteId, VaultPath};
pub use record::{SyncAction, SyncQueueItem, SyncStateSnapshot, SyncedFileRecord};

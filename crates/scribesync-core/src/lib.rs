//! Scribesync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncQueueItem`, `SyncedFileRecord`, `SyncStateSnapshot`, `Credential`
//! - **Port definitions** - Traits for adapters: `RemoteStore`, `Vault`, `StatePersistence`,
//!   `CredentialStore`, `AuthGate`, `Notifier`
//! - **Classifier** - Collection routing and front-matter metadata extraction
//! - **Error taxonomy** - `RemoteError` categories that drive retry decisions
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! engine orchestrates domain entities through port interfaces.

pub mod classify;
pub mod config;
pub mod domain;
pub mod ports;

//! ScribeSync API - HTTP client for the note server
//!
//! Provides an async client for:
//! - Bearer-token authentication with proactive and reactive refresh
//! - CRUD operations on journal entries and relationship notes
//! - The idempotent bulk-sync endpoint
//!
//! ## Modules
//!
//! - [`auth`] - Token lifecycle management and credential storage
//! - [`client`] - Low-level HTTP client and error mapping
//! - [`provider`] - [`scribesync_core::ports::remote_store::RemoteStore`] implementation

pub mod auth;
pub mod client;
pub mod provider;

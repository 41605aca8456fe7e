//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid vault-relative path format or content
    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    /// Invalid content hash format (expected lowercase SHA-256 hex)
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    /// Invalid remote object identifier
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

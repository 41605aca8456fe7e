//! Credential pair and authentication state machine states
//!
//! The `Credential` is the access/refresh token pair received from the remote
//! store. Exactly one live instance exists per configured endpoint; it is
//! exclusively owned by the token lifecycle manager and persisted through the
//! secure-storage port.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Credential
// ============================================================================

/// The access/refresh token pair for the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token present on every API request
    pub access_token: String,
    /// Token exchanged at the refresh endpoint for a new access token
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential expiring `expires_in_secs` seconds from now
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// Returns true if the access token has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    #[must_use]
    pub fn expires_within(&self, duration: Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

// ============================================================================
// AuthState
// ============================================================================

/// States of the token lifecycle manager
///
/// `Invalidated` is terminal until explicit re-initialization with a fresh
/// credential: once entered, no further refresh attempts or network calls
/// are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// No credential has been supplied yet
    Uninitialized,
    /// A credential is held and usable (possibly near expiry)
    Active,
    /// A refresh call is currently outstanding
    RefreshInFlight,
    /// The refresh token itself was rejected; re-authentication required
    Invalidated,
}

impl AuthState {
    /// Returns the state name for logging and status output
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Uninitialized => "Uninitialized",
            AuthState::Active => "Active",
            AuthState::RefreshInFlight => "RefreshInFlight",
            AuthState::Invalidated => "Invalidated",
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

//! Authentication gate port
//!
//! The sync orchestrator must consult live authentication state before every
//! network pass: an `Invalidated` credential aborts the pass pre-emptively,
//! with zero network calls. The token lifecycle manager implements this
//! trait; the engine holds it as a handle rather than reading ambient
//! globals.

use crate::domain::credential::AuthState;

/// Port trait exposing the token lifecycle manager's current state
pub trait AuthGate: Send + Sync {
    /// Returns the current authentication state
    fn auth_state(&self) -> AuthState;
}

//! Integration tests for scribesync-api
//!
//! Uses wiremock to simulate the note server and verifies end-to-end
//! behavior of the HTTP remote store, the bulk-sync endpoint, and the
//! token refresh flow including terminal invalidation.

mod common;

mod test_auth;
mod test_bulk;
mod test_notes;

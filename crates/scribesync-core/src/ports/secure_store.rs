//! Credential storage port (driven/secondary port)
//!
//! The credential pair should live in the most secure storage the host
//! offers (OS keyring); a clearly inferior fallback (plain file) is accepted
//! but must be surfaced to the user by the adapter that selects it.

use crate::domain::credential::Credential;

/// Port trait for persisting the credential pair
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credential, if any
    async fn load(&self) -> anyhow::Result<Option<Credential>>;

    /// Stores the credential, replacing any previous one
    async fn store(&self, credential: &Credential) -> anyhow::Result<()>;

    /// Removes the stored credential
    ///
    /// Clearing an empty store is not an error.
    async fn clear(&self) -> anyhow::Result<()>;
}

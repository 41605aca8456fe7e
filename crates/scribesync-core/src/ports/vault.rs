//! Local vault port (driven/secondary port)
//!
//! The vault is the local collection of text documents being synchronized.
//! The engine never touches the filesystem directly; it reads, stats, and
//! enumerates through this interface.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because I/O errors at this boundary are
//!   adapter-specific and propagate unchanged to the caller.
//! - Timestamps are epoch milliseconds to match the persisted snapshot shape.

use crate::domain::newtypes::VaultPath;

/// File metadata from the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Last modification time (epoch milliseconds)
    pub mtime_ms: i64,
    /// Creation time (epoch milliseconds); the metadata-date fallback
    pub created_ms: i64,
    /// File size in bytes
    pub size: u64,
}

/// Port trait for reading the local document vault
#[async_trait::async_trait]
pub trait Vault: Send + Sync {
    /// Reads a file's full content
    async fn read_file(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>>;

    /// Enumerates all syncable files with their metadata
    async fn list_files(&self) -> anyhow::Result<Vec<(VaultPath, FileStat)>>;

    /// Returns metadata for a single file
    async fn stat(&self, path: &VaultPath) -> anyhow::Result<FileStat>;

    /// Returns true if the file currently exists
    async fn exists(&self, path: &VaultPath) -> bool;
}

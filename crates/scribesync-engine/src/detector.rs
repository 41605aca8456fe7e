//! Two-tier change detection
//!
//! Tier one compares the file's mtime against the stored record: an equal
//! timestamp means unchanged with no file read at all. Tier two, taken only
//! when mtimes differ, hashes the content; a touched-but-identical file
//! (editor resave, `touch`) is reported as [`ChangeCheck::TouchedOnly`] so
//! the caller can update the stored mtime without any network traffic.

use scribesync_core::domain::newtypes::ContentHash;
use scribesync_core::domain::record::SyncedFileRecord;

/// First-tier verdict from metadata alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickCheck {
    /// No stored record: the file has never been synced
    New,
    /// Stored mtime matches: unchanged, skip without reading the file
    Unchanged,
    /// Timestamps differ: the content hash must decide
    NeedsHash,
}

/// Final verdict once the hash is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCheck {
    /// Content actually changed
    Modified,
    /// Timestamp moved but content is identical; update the stored mtime
    TouchedOnly,
}

/// Compares a file's current mtime against its stored record
pub fn quick_check(stored: Option<&SyncedFileRecord>, mtime_ms: i64) -> QuickCheck {
    match stored {
        None => QuickCheck::New,
        Some(record) if record.mtime == mtime_ms => QuickCheck::Unchanged,
        Some(_) => QuickCheck::NeedsHash,
    }
}

/// Resolves a [`QuickCheck::NeedsHash`] verdict with the freshly computed hash
pub fn hash_check(stored: &SyncedFileRecord, current: &ContentHash) -> ChangeCheck {
    if &stored.hash == current {
        ChangeCheck::TouchedOnly
    } else {
        ChangeCheck::Modified
    }
}

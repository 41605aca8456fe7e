//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// VaultPath
// ============================================================================

/// A vault-relative file path
///
/// Always stored with forward slashes and relative to the vault root.
/// Validation rejects empty paths, absolute paths, and `..` traversal,
/// so a `VaultPath` can never escape the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultPath(String);

impl VaultPath {
    /// Creates a validated `VaultPath` from a string
    ///
    /// Backslashes are normalized to forward slashes before validation.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let normalized = path.into().replace('\\', "/");

        if normalized.is_empty() {
            return Err(DomainError::InvalidPath("empty path".to_string()));
        }
        if normalized.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "absolute path not allowed: {normalized}"
            )));
        }
        if normalized.split('/').any(|c| c == "..") {
            return Err(DomainError::InvalidPath(format!(
                "parent traversal not allowed: {normalized}"
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the parent folder portion of the path
    ///
    /// Files at the vault root have an empty parent.
    #[must_use]
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Returns the file name component (everything after the last slash)
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Returns the file stem (file name with the final extension stripped)
    #[must_use]
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Returns the extension (without the dot), if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

impl Display for VaultPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VaultPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// ContentHash
// ============================================================================

/// A SHA-256 content digest in lowercase hexadecimal
///
/// This is the unit of change comparison: the same algorithm is used by the
/// remote store, so hashes are comparable across systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Creates a validated `ContentHash` from a hex string
    pub fn new(hex: impl Into<String>) -> Result<Self, DomainError> {
        let hex = hex.into();

        if hex.len() != 64 {
            return Err(DomainError::InvalidHash(format!(
                "expected 64 hex chars, got {}",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(DomainError::InvalidHash(format!(
                "not lowercase hex: {hex}"
            )));
        }

        Ok(Self(hex))
    }

    /// Returns the hash as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RemoteId
// ============================================================================

/// A remote store object identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Creates a validated `RemoteId` from a string
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId("empty ID".to_string()));
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- VaultPath ---

    #[test]
    fn test_vault_path_valid() {
        let p = VaultPath::new("Journal/2026-01-23.md").unwrap();
        assert_eq!(p.as_str(), "Journal/2026-01-23.md");
    }

    #[test]
    fn test_vault_path_normalizes_backslashes() {
        let p = VaultPath::new("People\\Alice.md").unwrap();
        assert_eq!(p.as_str(), "People/Alice.md");
    }

    #[test]
    fn test_vault_path_rejects_empty() {
        assert!(VaultPath::new("").is_err());
    }

    #[test]
    fn test_vault_path_rejects_absolute() {
        assert!(VaultPath::new("/etc/passwd").is_err());
    }

    #[test]
    fn test_vault_path_rejects_traversal() {
        assert!(VaultPath::new("../outside.md").is_err());
        assert!(VaultPath::new("Journal/../../outside.md").is_err());
    }

    #[test]
    fn test_vault_path_parent() {
        let p = VaultPath::new("People/Alice.md").unwrap();
        assert_eq!(p.parent(), "People");

        let root = VaultPath::new("inbox.md").unwrap();
        assert_eq!(root.parent(), "");

        let nested = VaultPath::new("Journal/2026/01/note.md").unwrap();
        assert_eq!(nested.parent(), "Journal/2026/01");
    }

    #[test]
    fn test_vault_path_file_name_and_stem() {
        let p = VaultPath::new("People/Alice_2.md").unwrap();
        assert_eq!(p.file_name(), "Alice_2.md");
        assert_eq!(p.file_stem(), "Alice_2");
        assert_eq!(p.extension(), Some("md"));
    }

    #[test]
    fn test_vault_path_no_extension() {
        let p = VaultPath::new("Journal/README").unwrap();
        assert_eq!(p.file_stem(), "README");
        assert_eq!(p.extension(), None);
    }

    #[test]
    fn test_vault_path_serde_transparent() {
        let p = VaultPath::new("Journal/a.md").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"Journal/a.md\"");
    }

    // --- ContentHash ---

    #[test]
    fn test_content_hash_valid() {
        // SHA-256 of the empty string
        let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        let h = ContentHash::new(hex).unwrap();
        assert_eq!(h.as_str(), hex);
    }

    #[test]
    fn test_content_hash_rejects_short() {
        assert!(ContentHash::new("abc123").is_err());
    }

    #[test]
    fn test_content_hash_rejects_uppercase() {
        let hex = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855";
        assert!(ContentHash::new(hex).is_err());
    }

    #[test]
    fn test_content_hash_rejects_non_hex() {
        let hex = "g3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(ContentHash::new(hex).is_err());
    }

    // --- RemoteId ---

    #[test]
    fn test_remote_id_valid() {
        let id = RemoteId::new("entry-42").unwrap();
        assert_eq!(id.as_str(), "entry-42");
    }

    #[test]
    fn test_remote_id_rejects_blank() {
        assert!(RemoteId::new("").is_err());
        assert!(RemoteId::new("   ").is_err());
    }
}

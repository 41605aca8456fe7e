//! Local filesystem vault adapter
//!
//! Implements the [`Vault`] port on top of a root directory, enumerating
//! files recursively and filtering by the configured extensions. Hidden
//! directories (leading dot) are skipped, which also covers editor metadata
//! folders.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use scribesync_core::domain::newtypes::VaultPath;
use scribesync_core::ports::vault::{FileStat, Vault};
use tracing::{debug, warn};

/// Vault adapter rooted at a local directory
pub struct LocalVault {
    root: PathBuf,
    /// Lowercased extensions eligible for sync, without the dot
    extensions: Vec<String>,
}

impl LocalVault {
    /// Creates a vault over `root`, syncing only the given extensions
    pub fn new(root: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            root,
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Returns the vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true when the extension is eligible for sync
    pub fn accepts(&self, path: &VaultPath) -> bool {
        match path.extension() {
            Some(ext) => self.extensions.iter().any(|e| e == &ext.to_lowercase()),
            None => false,
        }
    }

    /// Converts an absolute path under the root into a vault path
    pub fn relativize(&self, absolute: &Path) -> Option<VaultPath> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        VaultPath::new(relative.to_string_lossy()).ok()
    }

    fn absolute(&self, path: &VaultPath) -> PathBuf {
        self.root.join(path.as_str())
    }

    fn stat_from_metadata(metadata: &std::fs::Metadata) -> FileStat {
        let to_ms = |t: std::io::Result<std::time::SystemTime>| {
            t.ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0)
        };
        FileStat {
            mtime_ms: to_ms(metadata.modified()),
            // Not every filesystem records a birth time; fall back to mtime.
            created_ms: metadata
                .created()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or_else(|| to_ms(metadata.modified())),
            size: metadata.len(),
        }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<(VaultPath, FileStat)>) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&path, out)?;
            } else if file_type.is_file() {
                let Some(vault_path) = self.relativize(&path) else {
                    warn!(path = %path.display(), "Skipping file outside vault root");
                    continue;
                };
                if !self.accepts(&vault_path) {
                    continue;
                }
                let metadata = entry.metadata()?;
                out.push((vault_path, Self::stat_from_metadata(&metadata)));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Vault for LocalVault {
    async fn read_file(&self, path: &VaultPath) -> Result<Vec<u8>> {
        let absolute = self.absolute(path);
        tokio::fs::read(&absolute)
            .await
            .with_context(|| format!("Failed to read file: {}", absolute.display()))
    }

    async fn list_files(&self) -> Result<Vec<(VaultPath, FileStat)>> {
        let mut files = Vec::new();
        self.walk(&self.root, &mut files)?;
        files.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(count = files.len(), "Enumerated vault files");
        Ok(files)
    }

    async fn stat(&self, path: &VaultPath) -> Result<FileStat> {
        let absolute = self.absolute(path);
        let metadata = tokio::fs::metadata(&absolute)
            .await
            .with_context(|| format!("Failed to stat file: {}", absolute.display()))?;
        Ok(Self::stat_from_metadata(&metadata))
    }

    async fn exists(&self, path: &VaultPath) -> bool {
        tokio::fs::try_exists(self.absolute(path))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault(dir: &TempDir) -> LocalVault {
        LocalVault::new(
            dir.path().to_path_buf(),
            vec!["md".to_string(), "txt".to_string()],
        )
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_list_files_filters_extensions() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Journal/a.md", "a");
        write(&dir, "Journal/b.txt", "b");
        write(&dir, "Journal/c.pdf", "c");
        write(&dir, "notes.md", "n");

        let files = vault(&dir).list_files().await.unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["Journal/a.md", "Journal/b.txt", "notes.md"]);
    }

    #[tokio::test]
    async fn test_hidden_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".trash/gone.md", "x");
        write(&dir, ".config/settings.md", "x");
        write(&dir, "People/Alice.md", "hi");

        let files = vault(&dir).list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0.as_str(), "People/Alice.md");
    }

    #[tokio::test]
    async fn test_read_and_stat() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Journal/a.md", "hello");

        let v = vault(&dir);
        let path = VaultPath::new("Journal/a.md").unwrap();
        assert_eq!(v.read_file(&path).await.unwrap(), b"hello");

        let stat = v.stat(&path).await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.mtime_ms > 0);

        assert!(v.exists(&path).await);
        assert!(!v.exists(&VaultPath::new("Journal/b.md").unwrap()).await);
    }

    #[tokio::test]
    async fn test_relativize() {
        let dir = TempDir::new().unwrap();
        let v = vault(&dir);
        let abs = dir.path().join("People").join("Alice.md");
        assert_eq!(v.relativize(&abs).unwrap().as_str(), "People/Alice.md");
        assert!(v.relativize(Path::new("/somewhere/else.md")).is_none());
    }

    #[test]
    fn test_accepts_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let v = vault(&dir);
        assert!(v.accepts(&VaultPath::new("A.MD").unwrap()));
        assert!(!v.accepts(&VaultPath::new("A.pdf").unwrap()));
        assert!(!v.accepts(&VaultPath::new("Makefile").unwrap()));
    }
}

//! Document classification and front-matter metadata extraction
//!
//! Routes each vault file into its target collection (journal entries vs.
//! relationship notes) and extracts lightweight metadata (title, date, type)
//! from YAML front matter, with a fixed fallback order for the date:
//! explicit front-matter field → `YYYY-MM-DD` filename prefix → file
//! creation time.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::VaultPath;

// ============================================================================
// CollectionKind
// ============================================================================

/// The remote collection a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Journal entries
    Entry,
    /// Relationship notes (people)
    Person,
}

impl CollectionKind {
    /// Returns the collection's API path segment
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Entry => "entries",
            CollectionKind::Person => "people",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// NoteMeta
// ============================================================================

/// Metadata extracted from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMeta {
    /// Document title (front matter, falling back to the file stem)
    pub title: String,
    /// Document date
    pub date: NaiveDate,
    /// Explicit front-matter `type` override, if present and recognized
    pub kind: Option<CollectionKind>,
}

/// The subset of front-matter fields the sync engine cares about
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    date: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

// ============================================================================
// Classifier
// ============================================================================

/// Classifies vault files into collections and extracts their metadata
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Folder names (case-insensitive) whose files are relationship notes
    people_folders: Vec<String>,
}

impl Classifier {
    /// Creates a classifier routing the given folders to the people collection
    pub fn new(people_folders: Vec<String>) -> Self {
        Self {
            people_folders: people_folders
                .into_iter()
                .map(|f| f.to_lowercase())
                .collect(),
        }
    }

    /// Determines the collection for a path by its folder
    #[must_use]
    pub fn classify(&self, path: &VaultPath) -> CollectionKind {
        let in_people_folder = path
            .parent()
            .split('/')
            .any(|component| self.people_folders.iter().any(|f| f == &component.to_lowercase()));

        if in_people_folder {
            CollectionKind::Person
        } else {
            CollectionKind::Entry
        }
    }

    /// Extracts title, date, and type from a document
    ///
    /// `created_ms` is the file's creation time, used as the final date
    /// fallback when neither front matter nor the filename carry one.
    #[must_use]
    pub fn extract_meta(&self, path: &VaultPath, content: &str, created_ms: i64) -> NoteMeta {
        let fm = parse_front_matter(content);

        let title = fm
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| path.file_stem().to_string());

        let date = fm
            .date
            .as_deref()
            .and_then(parse_date)
            .or_else(|| date_from_filename(path.file_stem()))
            .unwrap_or_else(|| date_from_created(created_ms));

        let kind = fm.kind.as_deref().and_then(|k| match k.to_lowercase().as_str() {
            "person" | "people" | "contact" => Some(CollectionKind::Person),
            "entry" | "journal" | "note" => Some(CollectionKind::Entry),
            _ => None,
        });

        NoteMeta { title, date, kind }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec!["people".to_string()])
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses the leading `---`-fenced YAML block, tolerating any malformed input
fn parse_front_matter(content: &str) -> FrontMatter {
    let Some(rest) = content.strip_prefix("---\n").or_else(|| content.strip_prefix("---\r\n"))
    else {
        return FrontMatter::default();
    };

    let Some(end) = rest.find("\n---").map(|idx| &rest[..idx]) else {
        return FrontMatter::default();
    };

    serde_yaml::from_str(end).unwrap_or_default()
}

/// Parses a front-matter date value, accepting a plain date or a datetime prefix
fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Recognizes filenames that begin with a `YYYY-MM-DD` prefix
fn date_from_filename(stem: &str) -> Option<NaiveDate> {
    parse_date(stem)
}

/// Converts a creation timestamp to a date (epoch fallback on overflow)
fn date_from_created(created_ms: i64) -> NaiveDate {
    Utc.timestamp_millis_opt(created_ms)
        .single()
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date"))
}

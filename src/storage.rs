//! Flat JSON file storage.
//!
//! Every entity lives in its own file at `<root>/<collection>/<id>.json`.
//! There is no index and no caching: callers read the files they need on
//! every request.

use crate::error::{Result, StudError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// A directory of JSON documents under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Playlists,
    Transcripts,
    Embeddings,
    Quizzes,
    Conversations,
    Feedback,
}

impl Collection {
    /// Directory name of this collection.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Collection::Playlists => "playlists",
            Collection::Transcripts => "transcripts",
            Collection::Embeddings => "embeddings",
            Collection::Quizzes => "quizzes",
            Collection::Conversations => "conversations",
            Collection::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

fn id_regex() -> &'static Regex {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid id regex"))
}

/// Check that an identifier is safe to use as a file name.
pub fn validate_id(id: &str) -> Result<()> {
    if id_regex().is_match(id) {
        Ok(())
    } else {
        Err(StudError::InvalidInput(format!("Invalid identifier: {:?}", id)))
    }
}

/// JSON document store rooted at a directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a collection.
    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.dir_name())
    }

    /// Scratch directory for downloaded audio.
    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    /// Path of a single document.
    pub fn path_for(&self, collection: Collection, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.collection_dir(collection).join(format!("{}.json", id)))
    }

    /// Whether a document exists.
    pub fn exists(&self, collection: Collection, id: &str) -> Result<bool> {
        Ok(self.path_for(collection, id)?.exists())
    }

    /// Read a document, returning `None` if it does not exist.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        let path = self.path_for(collection, id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content).map_err(|e| {
            StudError::Storage(format!("Corrupt document {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    /// Write a document atomically (temp file + rename).
    #[instrument(skip(self, value))]
    pub fn write<T: Serialize>(&self, collection: Collection, id: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(collection, id)?;
        let dir = self.collection_dir(collection);
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&path)
            .map_err(|e| StudError::Storage(format!("Failed to persist {}: {}", path.display(), e)))?;

        debug!("Saved {}", path.display());
        Ok(path)
    }

    /// Delete a document. Returns whether a file was removed.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let path = self.path_for(collection, id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Identifiers of all documents in a collection, sorted.
    pub fn list_ids(&self, collection: Collection) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = std::fs::read_dir(&dir)?
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| validate_id(s).is_ok())
                    .map(|s| s.to_string())
            })
            .collect();

        ids.sort();
        Ok(ids)
    }

    /// Read every document in a collection, in id order.
    pub fn read_all<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<(String, T)>> {
        let mut documents = Vec::new();
        for id in self.list_ids(collection)? {
            if let Some(doc) = self.read(collection, &id)? {
                documents.push((id, doc));
            }
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[test]
    fn test_validate_id() {
        assert_ok!(validate_id("dQw4w9WgXcQ"));
        assert_ok!(validate_id("PL-abc_123"));
        assert_err!(validate_id("../etc/passwd"));
        assert_err!(validate_id("a/b"));
        assert_err!(validate_id(""));
        assert_err!(validate_id(&"x".repeat(129)));
    }

    #[test]
    fn test_write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        assert!(store.read::<Note>(Collection::Quizzes, "v1").unwrap().is_none());

        let note = Note { text: "hello".to_string() };
        let path = store.write(Collection::Quizzes, "v1", &note).unwrap();
        assert_eq!(path, dir.path().join("quizzes").join("v1.json"));

        assert!(store.exists(Collection::Quizzes, "v1").unwrap());
        assert_eq!(store.read::<Note>(Collection::Quizzes, "v1").unwrap(), Some(note));

        assert!(store.delete(Collection::Quizzes, "v1").unwrap());
        assert!(!store.delete(Collection::Quizzes, "v1").unwrap());
        assert!(!store.exists(Collection::Quizzes, "v1").unwrap());
    }

    #[test]
    fn test_list_ids_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        assert!(store.list_ids(Collection::Embeddings).unwrap().is_empty());

        store.write(Collection::Embeddings, "b", &Note { text: "b".into() }).unwrap();
        store.write(Collection::Embeddings, "a", &Note { text: "a".into() }).unwrap();
        std::fs::write(store.collection_dir(Collection::Embeddings).join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_ids(Collection::Embeddings).unwrap(), vec!["a", "b"]);

        let all: Vec<(String, Note)> = store.read_all(Collection::Embeddings).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.text, "a");
    }

    #[test]
    fn test_corrupt_document_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::create_dir_all(store.collection_dir(Collection::Playlists)).unwrap();
        std::fs::write(store.path_for(Collection::Playlists, "p").unwrap(), "{not json").unwrap();

        let err = store.read::<Note>(Collection::Playlists, "p").unwrap_err();
        assert!(matches!(err, StudError::Storage(_)));
    }

    #[test]
    fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let err = assert_err!(store.write(Collection::Playlists, "../x", &Note { text: "x".into() }));
        assert!(err.is_invalid_input());
    }
}

//! Whole-document reads and writes over a directory tree.
//!
//! Each document is one pretty-printed JSON file. Writes replace the file;
//! the last writer wins. There is no schema enforcement beyond what the
//! caller's types deserialize.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `collection` may name a sub-collection, e.g. `conversations/<id>/messages`.
    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in collection.split('/') {
            dir.push(checked_segment(segment)?);
        }
        Ok(dir)
    }

    fn doc_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        let id = checked_segment(id)?;
        Ok(self.collection_dir(collection)?.join(format!("{id}.json")))
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let path = self.doc_path(collection, id)?;
        let s = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let doc = serde_json::from_str(&s).map_err(|source| StoreError::Json { path, source })?;
        Ok(Some(doc))
    }

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let path = self.doc_path(collection, id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "document written");
        Ok(())
    }

    /// Document ids in a collection, sorted. Missing collection means empty.
    pub fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection)?;
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// All documents of a collection, in id order.
    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for id in self.list_ids(collection)? {
            if let Some(doc) = self.get(collection, &id)? {
                out.push(doc);
            }
        }
        Ok(out)
    }
}

fn checked_segment(segment: &str) -> Result<&str> {
    let ok = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !segment.starts_with('.');
    if ok {
        Ok(segment)
    } else {
        Err(StoreError::InvalidId(segment.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[test]
    fn test_get_missing_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let got: Option<Note> = store.get("notes", "n1").unwrap();
        assert_eq!(got, None);
        assert!(store.list_ids("notes").unwrap().is_empty());
    }

    #[test]
    fn test_set_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        store.set("notes", "n1", &Note { text: "a".into() }).unwrap();
        store.set("notes", "n1", &Note { text: "b".into() }).unwrap();
        store.set("notes/n1/replies", "r1", &Note { text: "c".into() }).unwrap();

        let got: Note = store.get("notes", "n1").unwrap().unwrap();
        assert_eq!(got.text, "b");
        assert_eq!(store.list_ids("notes").unwrap(), vec!["n1".to_string()]);
        let replies: Vec<Note> = store.list("notes/n1/replies").unwrap();
        assert_eq!(replies, vec![Note { text: "c".into() }]);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        for bad in ["", "..", "a/b", ".hidden"] {
            let r: Result<Option<Note>> = store.get("notes", bad);
            assert!(matches!(r, Err(StoreError::InvalidId(_))), "{bad:?}");
        }
        assert!(matches!(
            store.list_ids("notes//x"),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_corrupt_document_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/bad.json"), "{not json").unwrap();
        let r: Result<Option<Note>> = store.get("notes", "bad");
        let err = r.unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}

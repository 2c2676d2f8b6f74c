//! File-backed key-value store: one JSON document per key inside a data directory.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde_json::Value;
use tracing::debug;

use crate::dao::{
    kv_store::KeyValueStore,
    storage::{StorageError, StorageResult},
};

const FILE_EXTENSION: &str = "json";

/// Durable store writing each key to `<dir>/<key>.json`.
///
/// Values are written to a temporary sibling file and renamed into place so a
/// concurrent reader observes either the previous or the next document.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store rooted at `root`, creating the directory when needed.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| {
            StorageError::unavailable(
                format!("failed to create data directory `{}`", root.display()),
                source,
            )
        })?;
        Ok(Self { root })
    }

    /// Directory holding the stored documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> StorageResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.document_path(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("failed to read `{}`", path.display()),
                    err,
                ));
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StorageError::Corrupted {
                key: key.to_string(),
                source,
            })
    }

    fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        let path = self.document_path(key)?;
        let staging = self.root.join(format!(".{key}.{FILE_EXTENSION}.tmp"));
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Corrupted {
            key: key.to_string(),
            source,
        })?;

        let write_staging = || -> std::io::Result<()> {
            let mut file = File::create(&staging)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&staging, &path)
        };

        write_staging().map_err(|source| {
            StorageError::unavailable(format!("failed to write `{}`", path.display()), source)
        })?;
        debug!(key, path = %path.display(), "persisted value");
        Ok(())
    }

    fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).map_err(|source| {
            StorageError::unavailable(
                format!("data directory `{}` is not reachable", self.root.display()),
                source,
            )
        })?;
        if metadata.permissions().readonly() {
            return Err(StorageError::unavailable(
                format!("data directory `{}` is read-only", self.root.display()),
                std::io::Error::from(ErrorKind::PermissionDenied),
            ));
        }
        Ok(())
    }
}

/// Keys become file names, so only a conservative character set is accepted.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_survive_reopening_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("gameState", &json!({"team1Name": "Owls"})).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("gameState").unwrap(),
            Some(json!({"team1Name": "Owls"}))
        );
    }

    #[test]
    fn missing_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get("gameQuestion").unwrap().is_none());
    }

    #[test]
    fn corrupted_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gameState.json"), "{not json").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("gameState"),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", &json!(1)),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.get(""),
            Err(StorageError::InvalidKey { .. })
        ));
    }

    #[test]
    fn no_staging_file_is_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("gameQuestion", &json!({"team1Attempts": 5})).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["gameQuestion.json".to_string()]);
    }
}

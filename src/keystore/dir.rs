//! Directory-backed key inventory
//!
//! One file per identity in a flat directory. Dotfiles are invisible, and
//! identity names that could escape the directory are treated as absent.

use crate::errors::{KeyGateError, Result};
use crate::keystore::KeyInventory;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key inventory over a flat directory of key files
pub struct DirKeyStore {
    base_path: PathBuf,
}

impl DirKeyStore {
    /// Open the inventory, creating the directory if it does not exist.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        if !base_path.exists() {
            info!("Key directory does not exist, creating: {:?}", base_path);
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self { base_path })
    }

    /// An identity name is only ever a plain file name. Anything that
    /// could traverse out of the key directory does not exist here.
    fn valid_name(cn: &str) -> bool {
        !cn.is_empty()
            && !cn.starts_with('.')
            && !cn.contains('/')
            && !cn.contains('\\')
            && cn != ".."
    }

    fn key_path(&self, cn: &str) -> Option<PathBuf> {
        if Self::valid_name(cn) {
            Some(self.base_path.join(cn))
        } else {
            None
        }
    }
}

impl KeyInventory for DirKeyStore {
    fn list_identities(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name.to_string());
        }

        names.sort();
        Ok(names)
    }

    fn contains(&self, cn: &str) -> Result<bool> {
        match self.key_path(cn) {
            Some(path) => Ok(path.is_file()),
            None => Ok(false),
        }
    }

    fn read_key(&self, cn: &str) -> Result<Vec<u8>> {
        let path = self
            .key_path(cn)
            .filter(|p| p.is_file())
            .ok_or_else(|| KeyGateError::KeyNotFound(cn.to_string()))?;

        debug!("reading key material for '{}'", cn);
        fs::read(&path).map_err(|e| KeyGateError::StorageError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_keys(keys: &[(&str, &[u8])]) -> (tempfile::TempDir, DirKeyStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, bytes) in keys {
            fs::write(dir.path().join(name), bytes).unwrap();
        }
        let store = DirKeyStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_list_filters_hidden_files() {
        let (_dir, store) = store_with_keys(&[
            ("web", b"secret-1"),
            ("db", b"secret-2"),
            (".hidden", b"nope"),
        ]);

        let names = store.list_identities().unwrap();
        assert_eq!(names, vec!["db".to_string(), "web".to_string()]);
    }

    #[test]
    fn test_read_key_bytes() {
        let (_dir, store) = store_with_keys(&[("web", b"secret-1")]);
        assert_eq!(store.read_key("web").unwrap(), b"secret-1");
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let (_dir, store) = store_with_keys(&[]);
        assert!(matches!(
            store.read_key("ghost"),
            Err(KeyGateError::KeyNotFound(_))
        ));
        assert!(!store.contains("ghost").unwrap());
    }

    #[test]
    fn test_traversal_names_do_not_exist() {
        let (_dir, store) = store_with_keys(&[("web", b"secret-1")]);
        for cn in ["../web", "a/../../etc/passwd", "..", ".hidden", ""] {
            assert!(!store.contains(cn).unwrap(), "{:?} should not exist", cn);
            assert!(matches!(
                store.read_key(cn),
                Err(KeyGateError::KeyNotFound(_))
            ));
        }
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("keys");
        let store = DirKeyStore::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(store.list_identities().unwrap().is_empty());
    }
}

//! In-memory key inventory
//!
//! Holds key blobs in a map. Used by tests and wherever a gateway needs an
//! inventory without touching the filesystem.

use crate::errors::{KeyGateError, Result};
use crate::keystore::KeyInventory;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory key inventory
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert_key(&self, cn: &str, bytes: &[u8]) {
        let mut keys = self.keys.write().unwrap();
        keys.insert(cn.to_string(), bytes.to_vec());
    }

    pub fn key_count(&self) -> usize {
        let keys = self.keys.read().unwrap();
        keys.len()
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyInventory for MemoryKeyStore {
    fn list_identities(&self) -> Result<Vec<String>> {
        let keys = self.keys.read().unwrap();
        let mut names: Vec<String> = keys.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn contains(&self, cn: &str) -> Result<bool> {
        let keys = self.keys.read().unwrap();
        Ok(keys.contains_key(cn))
    }

    fn read_key(&self, cn: &str) -> Result<Vec<u8>> {
        let keys = self.keys.read().unwrap();
        keys.get(cn)
            .cloned()
            .ok_or_else(|| KeyGateError::KeyNotFound(cn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_read() {
        let store = MemoryKeyStore::new();
        store.insert_key("web", b"secret");

        assert!(store.contains("web").unwrap());
        assert_eq!(store.read_key("web").unwrap(), b"secret");
        assert_eq!(store.key_count(), 1);
    }

    #[test]
    fn test_missing_key() {
        let store = MemoryKeyStore::new();
        assert!(!store.contains("ghost").unwrap());
        assert!(matches!(
            store.read_key("ghost"),
            Err(KeyGateError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let store = MemoryKeyStore::new();
        store.insert_key("web", b"1");
        store.insert_key("db", b"2");
        assert_eq!(
            store.list_identities().unwrap(),
            vec!["db".to_string(), "web".to_string()]
        );
    }
}

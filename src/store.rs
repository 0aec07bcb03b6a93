use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Rejected(String),
}

/// The key-value capability commands are executed against. Every call is atomic with respect
/// to every other call on the same store.
pub trait Store: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: String, value: Bytes) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Option<Bytes>;

    /// Removes `key`, returning whether it existed.
    fn delete(&self, key: &str) -> bool;

    fn exists(&self, key: &str) -> bool;

    fn size(&self) -> usize;

    fn clear(&self);
}

/// In-memory [`Store`] guarded by a single read/write lock. Readers share the lock, writers
/// take it exclusively. Cloning is cheap and yields a handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Self::default()
    }

    // Every mutation is a single `HashMap` call, a poisoned lock never guards a partial write.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Bytes>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Bytes>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn set(&self, key: String, value: Bytes) -> Result<(), StoreError> {
        self.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        self.read().get(key).cloned()
    }

    fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    fn exists(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    fn size(&self) -> usize {
        self.read().len()
    }

    fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_and_get() {
        let store = MemoryStore::new();

        store.set("key1".to_string(), Bytes::from("value1")).unwrap();

        assert_eq!(store.get("key1"), Some(Bytes::from("value1")));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryStore::new();

        store.set("key".to_string(), Bytes::from("v1")).unwrap();
        store.set("key".to_string(), Bytes::from("v2")).unwrap();

        assert_eq!(store.get("key"), Some(Bytes::from("v2")));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn delete_and_exists() {
        let store = MemoryStore::new();
        store.set("key".to_string(), Bytes::new()).unwrap();

        assert!(store.exists("key"));
        assert!(store.delete("key"));
        assert!(!store.exists("key"));
        assert!(!store.delete("key"));
    }

    #[test]
    fn clear() {
        let store = MemoryStore::new();
        store.set("a".to_string(), Bytes::from("1")).unwrap();
        store.set("b".to_string(), Bytes::from("2")).unwrap();

        assert_eq!(store.size(), 2);
        store.clear();
        assert_eq!(store.size(), 0);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();

        other.set("key".to_string(), Bytes::from("value")).unwrap();

        assert_eq!(store.get("key"), Some(Bytes::from("value")));
    }

    #[test]
    fn concurrent_writers() {
        let store = MemoryStore::new();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        store
                            .set(format!("key-{}-{}", t, i), Bytes::from(i.to_string()))
                            .unwrap();
                        assert!(store.exists(&format!("key-{}-{}", t, i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.size(), 800);
    }
}

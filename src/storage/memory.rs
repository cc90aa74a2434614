//! In-memory backup store

use super::BackupStore;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Backup store held in process memory.
///
/// Cloning shares the underlying objects. Deletions of keys registered with
/// [`fail_deletes_for`](MemoryStore::fail_deletes_for) return a storage error.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeSet<String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `keys`
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store.objects.write().extend(keys.into_iter().map(Into::into));
        store
    }

    pub fn insert(&self, key: impl Into<String>) {
        self.objects.write().insert(key.into());
    }

    /// Make every later deletion of `key` fail
    pub fn fail_deletes_for(&self, key: impl Into<String>) {
        self.failing.write().insert(key.into());
    }

    /// Make listing fail, as if the backend were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    /// Current keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().iter().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BackupStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>> {
        if *self.unavailable.read() {
            return Err(AppError::Storage("memory store unavailable".into()));
        }
        Ok(self.keys())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.failing.read().contains(key) {
            return Err(AppError::Storage(format!("refused to delete {}", key)));
        }
        if !self.objects.write().remove(key) {
            return Err(AppError::Storage(format!("no such object: {}", key)));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

//! In-memory store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shopshell_core::{StoredResponse, VersionTag};
use tokio::sync::RwLock;

use crate::key::CacheKey;
use crate::store::{CacheStorage, CacheStore, StoreResult};

/// A single in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, StoredResponse>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey, ignore_query: bool) -> StoreResult<Option<StoredResponse>> {
        let entries = self.entries.read().await;
        if let Some(found) = entries.get(key) {
            return Ok(Some(found.clone()));
        }
        if ignore_query {
            let base = key.without_query();
            let found = entries
                .iter()
                .find(|(k, _)| k.without_query() == base)
                .map(|(_, v)| v.clone());
            return Ok(found);
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, response: StoredResponse) -> StoreResult<()> {
        self.entries.write().await.insert(key.clone(), response);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> StoreResult<Vec<CacheKey>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// In-memory storage: a map of version tags to stores.
///
/// Suitable for tests and single-process deployments. Stores live until
/// explicitly deleted, which is all the durability the lifecycle needs
/// within one process generation.
#[derive(Default)]
pub struct MemoryStorage {
    stores: RwLock<HashMap<VersionTag, Arc<MemoryStore>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, tag: &VersionTag) -> StoreResult<Arc<dyn CacheStore>> {
        let mut stores = self.stores.write().await;
        let store = stores
            .entry(tag.clone())
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone();
        Ok(store)
    }

    async fn list_versions(&self) -> StoreResult<Vec<VersionTag>> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete_version(&self, tag: &VersionTag) -> StoreResult<bool> {
        Ok(self.stores.write().await.remove(tag).is_some())
    }
}

//! The cache store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use shopshell_core::{StoredResponse, VersionTag};

use crate::key::CacheKey;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open a named store.
    #[error("failed to open store `{0}`: {1}")]
    Open(VersionTag, String),

    /// Backend storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// One named, versioned store: a persistent mapping from normalized keys to
/// stored responses.
///
/// Implementations must support concurrent `get`/`put` from many tasks;
/// `put` replaces entries wholesale (last writer wins) so no
/// read-modify-write hazard exists. Bodies handed to `put` are owned
/// buffers: callers duplicate a response before both returning it and
/// storing it, since returning and storing are two independent consumers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry.
    ///
    /// With `ignore_query`, an entry matches when its query-stripped key
    /// equals the query-stripped lookup key, so a store populated with
    /// `manifest.json?v=6` is hit by a lookup for `manifest.json`.
    async fn get(&self, key: &CacheKey, ignore_query: bool) -> StoreResult<Option<StoredResponse>>;

    /// Store an entry under `key`, replacing any previous entry wholesale.
    async fn put(&self, key: &CacheKey, response: StoredResponse) -> StoreResult<()>;

    /// Remove the entry under `key`. Returns whether an entry existed.
    async fn delete(&self, key: &CacheKey) -> StoreResult<bool>;

    /// Enumerate the keys currently stored.
    async fn keys(&self) -> StoreResult<Vec<CacheKey>>;
}

/// The set of named stores, scoped by version tag.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the store for `tag`, creating it if absent.
    ///
    /// Idempotent: reopening an existing tag returns the same logical
    /// store.
    async fn open(&self, tag: &VersionTag) -> StoreResult<Arc<dyn CacheStore>>;

    /// Enumerate every known store version.
    async fn list_versions(&self) -> StoreResult<Vec<VersionTag>>;

    /// Destroy the store for `tag` and all its entries. Returns whether the
    /// store existed.
    async fn delete_version(&self, tag: &VersionTag) -> StoreResult<bool>;
}

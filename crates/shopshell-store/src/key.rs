//! Lookup key derivation.

use std::fmt;

use url::Url;

/// A normalized lookup key: scheme + host + path, query string optionally
/// retained.
///
/// Fragments never participate in keys. When a strategy decides to ignore
/// the query string, the same decision must be applied on both the `get`
/// and the `put` side of that execution, otherwise stored entries silently
/// diverge from lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// This key with any query component dropped.
    ///
    /// Used for ignore-query matching against entries that were stored
    /// under their full URL (e.g. precached `manifest.json?v=6`).
    pub fn without_query(&self) -> CacheKey {
        match self.0.split_once('?') {
            Some((base, _)) => CacheKey(base.to_string()),
            None => self.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive a lookup key from a request URL.
///
/// Differently cache-busted URLs (`?v=6`, `?ts=...`) resolve to the same
/// key when `ignore_query` is set.
pub fn normalize(url: &Url, ignore_query: bool) -> CacheKey {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    if ignore_query {
        normalized.set_query(None);
    }
    CacheKey(normalized.into())
}

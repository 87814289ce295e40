//! Immutable worker configuration.
//!
//! Everything the lifecycle manager and routing policy need (namespace,
//! generation number, scope, precache manifest, fallback document) is
//! supplied here at construction time and never mutated afterwards.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::version::{CacheRole, VersionTag};

/// Errors from configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The precache manifest has no entries.
    #[error("precache manifest is empty")]
    EmptyPrecache,

    /// The offline fallback document is missing from the manifest.
    #[error("fallback document `{0}` is not in the precache manifest")]
    FallbackNotPrecached(String),

    /// A manifest entry does not resolve against the scope URL.
    #[error("cannot resolve `{path}` against the scope: {source}")]
    Resource {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

/// Ordered list of resources that must be cached before a generation may
/// activate. Write-once: populated at construction, consumed at
/// provisioning, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheManifest(Vec<String>);

impl PrecacheManifest {
    /// Create a manifest from scope-relative resource identifiers.
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(entries.into_iter().map(Into::into).collect())
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the manifest contains the given identifier.
    pub fn contains(&self, entry: &str) -> bool {
        self.0.iter().any(|e| e == entry)
    }
}

/// Immutable configuration for one worker generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    namespace: String,
    version: u32,
    scope: Url,
    precache: PrecacheManifest,
    fallback_document: String,
    catalog_path: String,
}

impl ShellConfig {
    /// Create a configuration for the given namespace, generation number
    /// and scope URL.
    ///
    /// The scope path is normalized to end with `/` so that prefix checks
    /// and relative resolution behave the same regardless of input form.
    pub fn new(namespace: impl Into<String>, version: u32, mut scope: Url) -> Self {
        if !scope.path().ends_with('/') {
            let path = format!("{}/", scope.path());
            scope.set_path(&path);
        }
        Self {
            namespace: namespace.into(),
            version,
            scope,
            precache: PrecacheManifest::default(),
            fallback_document: "index.html".to_string(),
            catalog_path: "products.json".to_string(),
        }
    }

    /// Set the precache manifest.
    pub fn with_precache(mut self, entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.precache = PrecacheManifest::new(entries);
        self
    }

    /// Set the offline fallback document (scope-relative).
    pub fn with_fallback_document(mut self, path: impl Into<String>) -> Self {
        self.fallback_document = path.into();
        self
    }

    /// Set the dynamic catalog resource (scope-relative).
    pub fn with_catalog_path(mut self, path: impl Into<String>) -> Self {
        self.catalog_path = path.into();
        self
    }

    /// Ready-made configuration for the MEGA STORE 360 storefront.
    pub fn ms360(scope: Url) -> Self {
        Self::new("ms360", 9, scope).with_precache([
            "",
            "index.html",
            "products.json",
            "manifest.json?v=6",
            "icon-192x192-v6.png",
            "icon-256x256-v6.png",
            "icon-512x512.png",
            "icon-180x180-v6.png",
        ])
    }

    /// Load a configuration from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Render the configuration as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Validate the configuration.
    ///
    /// The manifest must be non-empty, must include the fallback document,
    /// and every entry must resolve against the scope.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precache.is_empty() {
            return Err(ConfigError::EmptyPrecache);
        }
        if !self.precache.contains(&self.fallback_document) {
            return Err(ConfigError::FallbackNotPrecached(
                self.fallback_document.clone(),
            ));
        }
        for entry in self.precache.iter() {
            self.resolve(entry)?;
        }
        Ok(())
    }

    /// The deployment namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The generation number.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The scope URL this generation intercepts under.
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// The precache manifest.
    pub fn precache(&self) -> &PrecacheManifest {
        &self.precache
    }

    /// The offline fallback document (scope-relative).
    pub fn fallback_document(&self) -> &str {
        &self.fallback_document
    }

    /// Version tag for the given role in this generation.
    pub fn tag(&self, role: CacheRole) -> VersionTag {
        VersionTag::new(self.namespace.clone(), role, self.version)
    }

    /// The static-store tag for this generation.
    pub fn static_tag(&self) -> VersionTag {
        self.tag(CacheRole::Static)
    }

    /// The runtime-store tag for this generation.
    pub fn runtime_tag(&self) -> VersionTag {
        self.tag(CacheRole::Runtime)
    }

    /// The pair of tags that survive activation.
    pub fn current_tags(&self) -> [VersionTag; 2] {
        [self.static_tag(), self.runtime_tag()]
    }

    /// Resolve a scope-relative identifier to a full URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.scope.join(path).map_err(|source| ConfigError::Resource {
            path: path.to_string(),
            source,
        })
    }

    /// Resolve the fallback document to a full URL.
    pub fn fallback_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.fallback_document)
    }

    /// Whether `url` shares this generation's origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin()
    }

    /// Whether `url` is same-origin and inside the scope prefix.
    pub fn in_scope(&self, url: &Url) -> bool {
        self.is_same_origin(url) && url.path().starts_with(self.scope.path())
    }

    /// Whether `url` names the dynamic catalog resource, with or without a
    /// query string.
    pub fn is_catalog(&self, url: &Url) -> bool {
        self.in_scope(url) && url.path() == format!("{}{}", self.scope.path(), self.catalog_path)
    }
}

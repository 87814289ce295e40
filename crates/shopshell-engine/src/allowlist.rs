//! Passthrough allowlist for remote hosts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What to do with unverifiable cross-origin responses from a listed host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpaquePolicy {
    /// Never intercept: fetch directly and store nothing, so an
    /// unverifiable cached blob can never mask a real failure.
    #[default]
    Bypass,
    /// Intercept cache-first and allow the opaque response to persist.
    CacheOpaque,
}

/// Remote hostnames with an explicit interception policy.
///
/// Hosts are matched case-insensitively by exact hostname. Anything
/// cross-origin and not listed here is left to the default transport by
/// the routing scope check, so the list only needs the hosts a deployment
/// actually embeds resources from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassthroughAllowlist {
    hosts: HashMap<String, OpaquePolicy>,
}

impl PassthroughAllowlist {
    /// Create an empty allowlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// List a host with the default bypass policy.
    pub fn allow_host(self, host: impl Into<String>) -> Self {
        self.allow_host_with(host, OpaquePolicy::Bypass)
    }

    /// List a host with an explicit opaque policy.
    pub fn allow_host_with(mut self, host: impl Into<String>, policy: OpaquePolicy) -> Self {
        self.hosts.insert(host.into().to_lowercase(), policy);
        self
    }

    /// Look up the policy for a host, if listed.
    pub fn policy_for(&self, host: &str) -> Option<OpaquePolicy> {
        self.hosts.get(&host.to_lowercase()).copied()
    }

    /// Whether the host is listed.
    pub fn contains(&self, host: &str) -> bool {
        self.policy_for(host).is_some()
    }

    /// Number of listed hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no hosts are listed.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Pre-configured allowlists for common deployments.
pub mod presets {
    use super::PassthroughAllowlist;

    /// The Amazon image CDNs the MEGA STORE 360 storefront embeds.
    pub fn amazon_images() -> PassthroughAllowlist {
        PassthroughAllowlist::new()
            .allow_host("m.media-amazon.com")
            .allow_host("images-na.ssl-images-amazon.com")
            .allow_host("ws-na.amazon-adsystem.com")
    }
}

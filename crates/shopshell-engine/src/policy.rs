//! Per-request routing decisions.

use std::sync::Arc;

use shopshell_core::{CacheRole, ConfigError, Destination, RequestContext, ShellConfig};
use shopshell_store::{normalize, CacheKey};

use crate::allowlist::{OpaquePolicy, PassthroughAllowlist};

/// The fetch strategy selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from the store, fetch and populate on miss.
    CacheFirst { role: CacheRole },
    /// Fetch live first, fall back to the store (and optionally a
    /// precached fallback document) when the network fails.
    NetworkFirst {
        role: CacheRole,
        fallback: Option<CacheKey>,
    },
    /// Serve the cached entry immediately and revalidate in the
    /// background.
    StaleWhileRevalidate { role: CacheRole },
    /// Fetch and return without any store interaction.
    DirectNetwork,
}

/// A routing decision: strategy plus the key/persistence knobs shared by
/// all strategies. Recomputed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub strategy: Strategy,
    /// Whether keys are derived with the query string stripped, on both
    /// the get and the put side of this execution.
    pub ignore_query: bool,
    /// Whether an opaque response may be persisted.
    pub persist_opaque: bool,
}

/// Outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not intercepted; left to the default transport.
    Unmanaged,
    /// Intercepted with the given decision.
    Intercept(RoutingDecision),
}

/// Deterministic decision table, evaluated top to bottom per request.
pub struct RoutingPolicy {
    config: Arc<ShellConfig>,
    allowlist: PassthroughAllowlist,
    fallback_key: CacheKey,
}

impl RoutingPolicy {
    /// Build the policy for one generation's configuration.
    pub fn new(
        config: Arc<ShellConfig>,
        allowlist: PassthroughAllowlist,
    ) -> Result<Self, ConfigError> {
        let fallback_key = normalize(&config.fallback_url()?, true);
        Ok(Self {
            config,
            allowlist,
            fallback_key,
        })
    }

    /// The key the shell fallback document is looked up under.
    pub fn fallback_key(&self) -> &CacheKey {
        &self.fallback_key
    }

    /// Route a request. First matching rule wins.
    pub fn decide(&self, req: &RequestContext) -> RouteOutcome {
        // 1. Only GET-equivalent reads are managed.
        if !req.method.is_get() {
            return RouteOutcome::Unmanaged;
        }

        let same_origin = self.config.is_same_origin(&req.url);

        // 2. Remote images from listed hosts: either strict passthrough,
        // or cache-first with opaque persistence if the host opted in.
        if req.destination == Destination::Image && !same_origin {
            if let Some(host) = req.hostname() {
                match self.allowlist.policy_for(host) {
                    Some(OpaquePolicy::Bypass) => {
                        return RouteOutcome::Intercept(RoutingDecision {
                            strategy: Strategy::DirectNetwork,
                            ignore_query: false,
                            persist_opaque: false,
                        });
                    }
                    Some(OpaquePolicy::CacheOpaque) => {
                        return RouteOutcome::Intercept(RoutingDecision {
                            strategy: Strategy::CacheFirst {
                                role: CacheRole::Static,
                            },
                            ignore_query: true,
                            persist_opaque: true,
                        });
                    }
                    None => {}
                }
            }
        }

        // 3. Foreign origins and paths outside the scope prefix are not
        // intercepted at all.
        if !self.config.in_scope(&req.url) {
            return RouteOutcome::Unmanaged;
        }

        // 4. Navigations: freshest document when reachable, shell fallback
        // when not.
        if req.wants_document() {
            return RouteOutcome::Intercept(RoutingDecision {
                strategy: Strategy::NetworkFirst {
                    role: CacheRole::Runtime,
                    fallback: Some(self.fallback_key.clone()),
                },
                ignore_query: true,
                persist_opaque: false,
            });
        }

        // 5. The catalog resource, with or without a cache-busting query.
        // Staleness is acceptable only offline.
        if self.config.is_catalog(&req.url) {
            return RouteOutcome::Intercept(RoutingDecision {
                strategy: Strategy::NetworkFirst {
                    role: CacheRole::Runtime,
                    fallback: None,
                },
                ignore_query: true,
                persist_opaque: false,
            });
        }

        // 6/7. Local images and every other static asset.
        RouteOutcome::Intercept(RoutingDecision {
            strategy: Strategy::CacheFirst {
                role: CacheRole::Static,
            },
            ignore_query: true,
            persist_opaque: false,
        })
    }
}

//! Fetch strategy execution.

use std::sync::Arc;

use shopshell_core::{CacheRole, RequestContext, StoredResponse};
use shopshell_net::{FetchMode, Gateway, GatewayResult};
use shopshell_store::{normalize, CacheKey, CacheStore};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::policy::{RoutingDecision, Strategy};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A store entry.
    Cache,
    /// The live network.
    Network,
    /// The precached fallback document.
    Fallback,
    /// Synthesized locally because every fallback path was exhausted.
    Synthesized,
}

/// A response plus its provenance classification.
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

impl ServedResponse {
    fn new(response: StoredResponse, source: ResponseSource) -> Self {
        Self { response, source }
    }

    /// Whether the response was served without a live network round trip.
    pub fn is_from_cache(&self) -> bool {
        !matches!(self.source, ResponseSource::Network)
    }
}

/// The two stores of an active generation.
#[derive(Clone)]
pub struct StoreSet {
    pub static_store: Arc<dyn CacheStore>,
    pub runtime_store: Arc<dyn CacheStore>,
}

impl StoreSet {
    /// The store handle for a role.
    pub fn for_role(&self, role: CacheRole) -> &Arc<dyn CacheStore> {
        match role {
            CacheRole::Static => &self.static_store,
            CacheRole::Runtime => &self.runtime_store,
        }
    }
}

/// Executes routing decisions against the stores and the origin gateway.
///
/// Each in-flight request runs as an independent task; the stores are the
/// only shared state, and entries are replaced wholesale so there is no
/// read-modify-write hazard.
#[derive(Clone)]
pub struct StrategyEngine {
    stores: StoreSet,
    gateway: Arc<dyn Gateway>,
}

impl StrategyEngine {
    /// Create an engine over an activated generation's stores.
    pub fn new(stores: StoreSet, gateway: Arc<dyn Gateway>) -> Self {
        Self { stores, gateway }
    }

    /// Execute a routing decision for a request.
    pub async fn execute(
        &self,
        req: &RequestContext,
        decision: &RoutingDecision,
    ) -> EngineResult<ServedResponse> {
        match &decision.strategy {
            Strategy::CacheFirst { role } => {
                self.cache_first(req, *role, decision.ignore_query, decision.persist_opaque)
                    .await
            }
            Strategy::NetworkFirst { role, fallback } => {
                self.network_first(
                    req,
                    *role,
                    fallback.as_ref(),
                    decision.ignore_query,
                    decision.persist_opaque,
                )
                .await
            }
            Strategy::StaleWhileRevalidate { role } => {
                self.stale_while_revalidate(
                    req,
                    *role,
                    decision.ignore_query,
                    decision.persist_opaque,
                )
                .await
            }
            Strategy::DirectNetwork => self.direct(req).await,
        }
    }

    /// Look up an entry, erroring on a miss.
    pub async fn cached(
        &self,
        role: CacheRole,
        key: &CacheKey,
        ignore_query: bool,
    ) -> EngineResult<StoredResponse> {
        self.stores
            .for_role(role)
            .get(key, ignore_query)
            .await?
            .ok_or_else(|| EngineError::NoCacheEntry(key.clone()))
    }

    async fn cache_first(
        &self,
        req: &RequestContext,
        role: CacheRole,
        ignore_query: bool,
        persist_opaque: bool,
    ) -> EngineResult<ServedResponse> {
        let store = self.stores.for_role(role);
        let key = normalize(&req.url, ignore_query);

        if let Some(found) = store.get(&key, ignore_query).await? {
            debug!(key = %key, "cache-first hit");
            return Ok(ServedResponse::new(found, ResponseSource::Cache));
        }

        // Miss: a network failure here has nothing to recover from.
        let fetched = self.gateway.fetch(req, FetchMode::Default).await?;
        if storable(&fetched, persist_opaque) {
            store.put(&key, fetched.duplicate()).await?;
        }
        Ok(ServedResponse::new(fetched, ResponseSource::Network))
    }

    async fn network_first(
        &self,
        req: &RequestContext,
        role: CacheRole,
        fallback: Option<&CacheKey>,
        ignore_query: bool,
        persist_opaque: bool,
    ) -> EngineResult<ServedResponse> {
        let store = self.stores.for_role(role);
        let key = normalize(&req.url, ignore_query);

        // Bypass intermediate transport caches so a stale intermediary
        // never masks origin freshness.
        match self.gateway.fetch(req, FetchMode::NoStore).await {
            Ok(fetched) => {
                if storable(&fetched, persist_opaque) {
                    store.put(&key, fetched.duplicate()).await?;
                }
                Ok(ServedResponse::new(fetched, ResponseSource::Network))
            }
            Err(err) => {
                debug!(key = %key, error = %err, "network-first falling back to store");
                if let Some(found) = store.get(&key, ignore_query).await? {
                    return Ok(ServedResponse::new(found, ResponseSource::Cache));
                }
                let Some(fallback_key) = fallback else {
                    return Err(err.into());
                };
                if let Some(shell) = self
                    .stores
                    .for_role(CacheRole::Static)
                    .get(fallback_key, true)
                    .await?
                {
                    return Ok(ServedResponse::new(shell, ResponseSource::Fallback));
                }
                warn!(key = %fallback_key, "fallback document missing from static store");
                Ok(ServedResponse::new(
                    StoredResponse::unavailable(),
                    ResponseSource::Synthesized,
                ))
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        req: &RequestContext,
        role: CacheRole,
        ignore_query: bool,
        persist_opaque: bool,
    ) -> EngineResult<ServedResponse> {
        let store = self.stores.for_role(role);
        let key = normalize(&req.url, ignore_query);
        let cached = store.get(&key, ignore_query).await?;

        let revalidation = {
            let gateway = Arc::clone(&self.gateway);
            let store = Arc::clone(store);
            let req = req.clone();
            let key = key.clone();
            tokio::spawn(async move {
                revalidate(gateway, store, req, key, persist_opaque).await
            })
        };

        if let Some(found) = cached {
            // The revalidation keeps running detached; its outcome never
            // affects this response.
            debug!(key = %key, "stale-while-revalidate serving cached entry");
            return Ok(ServedResponse::new(found, ResponseSource::Cache));
        }

        let fetched = revalidation
            .await
            .map_err(|e| EngineError::Revalidation(e.to_string()))??;
        Ok(ServedResponse::new(fetched, ResponseSource::Network))
    }

    async fn direct(&self, req: &RequestContext) -> EngineResult<ServedResponse> {
        let fetched = self.gateway.fetch(req, FetchMode::Default).await?;
        Ok(ServedResponse::new(fetched, ResponseSource::Network))
    }
}

/// Whether a strategy may persist this response.
fn storable(response: &StoredResponse, persist_opaque: bool) -> bool {
    response.is_success() || (response.opaque && persist_opaque)
}

/// The detached revalidation fetch: store on success, swallow failures.
async fn revalidate(
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn CacheStore>,
    req: RequestContext,
    key: CacheKey,
    persist_opaque: bool,
) -> GatewayResult<StoredResponse> {
    let fetched = gateway.fetch(&req, FetchMode::Default).await.map_err(|e| {
        warn!(key = %key, error = %e, "background revalidation failed");
        e
    })?;
    if storable(&fetched, persist_opaque) {
        if let Err(e) = store.put(&key, fetched.duplicate()).await {
            warn!(key = %key, error = %e, "failed to store revalidated response");
        }
    } else {
        debug!(key = %key, status = fetched.status, "revalidated response not storable");
    }
    Ok(fetched)
}

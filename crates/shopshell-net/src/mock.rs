//! Scripted in-memory origin for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use shopshell_core::{RequestContext, StoredResponse};
use tokio::sync::RwLock;

use crate::gateway::{FetchMode, Gateway, GatewayError, GatewayResult};

/// An origin that serves canned responses and records every fetch.
///
/// Unknown URLs get a plain 404 so precache failures can be scripted by
/// simply omitting a route. `set_offline(true)` makes every fetch fail at
/// the transport level, and routes can be re-staged mid-test to simulate a
/// deploy changing origin content.
#[derive(Default)]
pub struct ScriptedGateway {
    routes: RwLock<HashMap<String, StoredResponse>>,
    fetches: RwLock<HashMap<String, Vec<FetchMode>>>,
    offline: RwLock<bool>,
}

impl ScriptedGateway {
    /// Create a gateway with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage (or replace) the response served for `url`.
    pub async fn stage(&self, url: impl Into<String>, response: StoredResponse) {
        self.routes.write().await.insert(url.into(), response);
    }

    /// Stage a 200 text response for `url`.
    pub async fn stage_ok(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.stage(url, StoredResponse::ok(body)).await;
    }

    /// Toggle transport failure for every subsequent fetch.
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.write().await = offline;
    }

    /// Number of fetches issued for `url`.
    pub async fn hits(&self, url: &str) -> usize {
        self.fetches
            .read()
            .await
            .get(url)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// The fetch modes recorded for `url`, in order.
    pub async fn modes(&self, url: &str) -> Vec<FetchMode> {
        self.fetches
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of fetches across all URLs.
    pub async fn total_hits(&self) -> usize {
        self.fetches.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn fetch(
        &self,
        request: &RequestContext,
        mode: FetchMode,
    ) -> GatewayResult<StoredResponse> {
        let url = request.url.to_string();
        self.fetches
            .write()
            .await
            .entry(url.clone())
            .or_default()
            .push(mode);

        if *self.offline.read().await {
            return Err(GatewayError::Unreachable {
                url,
                reason: "offline".to_string(),
            });
        }

        let routes = self.routes.read().await;
        Ok(routes
            .get(&url)
            .map(StoredResponse::duplicate)
            .unwrap_or_else(|| StoredResponse::new(404, HashMap::new(), b"not found".to_vec())))
    }
}

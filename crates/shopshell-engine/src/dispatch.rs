//! Worker event dispatch.
//!
//! Inbound events carry a tag and (for fetch) a request; each maps to one
//! handler future. There is no cancellation model: an in-flight network
//! attempt ends only through the transport's own failure signal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shopshell_core::{RequestContext, ShellConfig};
use shopshell_net::Gateway;
use shopshell_store::CacheStorage;
use tokio::sync::RwLock;
use tracing::debug;

use crate::allowlist::PassthroughAllowlist;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{LifecycleManager, WorkerState};
use crate::policy::{RouteOutcome, RoutingPolicy};
use crate::strategy::{ServedResponse, StrategyEngine};

/// Inbound control message from an external controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Bypass the wait for the previous generation's clients to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl std::str::FromStr for ControlMessage {
    type Err = serde_json::Error;

    /// Parse the wire form, e.g. `{"type":"SKIP_WAITING"}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// An inbound worker event.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Provision this generation's static store.
    Install,
    /// Retire stale stores and begin intercepting.
    Activate,
    /// An intercepted outbound request.
    Fetch(RequestContext),
    /// A control message.
    Message(ControlMessage),
}

/// Outcome of a fetch event.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the caller hands the request to its default
    /// transport.
    Unmanaged,
    /// Served by a strategy.
    Served(ServedResponse),
}

/// Outcome of dispatching any event.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Lifecycle or control event completed.
    Completed,
    /// Result of a fetch event.
    Fetch(FetchOutcome),
}

/// One worker generation: lifecycle, routing and strategies behind a
/// single event-dispatch surface.
pub struct WorkerHost {
    lifecycle: LifecycleManager,
    policy: RoutingPolicy,
    gateway: Arc<dyn Gateway>,
    engine: RwLock<Option<StrategyEngine>>,
}

impl WorkerHost {
    /// Validate the configuration and assemble a host.
    pub fn new(
        config: ShellConfig,
        allowlist: PassthroughAllowlist,
        storage: Arc<dyn CacheStorage>,
        gateway: Arc<dyn Gateway>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let policy = RoutingPolicy::new(Arc::clone(&config), allowlist)?;
        let lifecycle = LifecycleManager::new(config, storage, Arc::clone(&gateway));
        Ok(Self {
            lifecycle,
            policy,
            gateway,
            engine: RwLock::new(None),
        })
    }

    /// Dispatch an inbound event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> EngineResult<EventOutcome> {
        match event {
            WorkerEvent::Install => {
                self.on_install().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Activate => {
                self.on_activate().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Fetch(req) => Ok(EventOutcome::Fetch(self.on_fetch(req).await?)),
            WorkerEvent::Message(msg) => {
                self.on_message(msg).await?;
                Ok(EventOutcome::Completed)
            }
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    /// The lifecycle manager, for gate control.
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    async fn on_install(&self) -> EngineResult<()> {
        self.lifecycle.provision().await
    }

    async fn on_activate(&self) -> EngineResult<()> {
        let stores = self.lifecycle.activate().await?;
        let engine = StrategyEngine::new(stores, Arc::clone(&self.gateway));
        *self.engine.write().await = Some(engine);
        Ok(())
    }

    async fn on_message(&self, msg: ControlMessage) -> EngineResult<()> {
        match msg {
            ControlMessage::SkipWaiting => {
                self.lifecycle.skip_waiting();
                if self.lifecycle.state().await == WorkerState::Provisioning {
                    // Activate opportunistically; if population is still in
                    // flight the regular activate event finishes the job,
                    // with the gate already released.
                    match self.on_activate().await {
                        Ok(()) => {}
                        Err(EngineError::InvalidState { .. }) => {
                            debug!("skip-waiting noted before activation was possible");
                        }
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
        }
    }

    async fn on_fetch(&self, req: RequestContext) -> EngineResult<FetchOutcome> {
        match self.policy.decide(&req) {
            RouteOutcome::Unmanaged => {
                debug!(url = %req.url, "request left unmanaged");
                Ok(FetchOutcome::Unmanaged)
            }
            RouteOutcome::Intercept(decision) => {
                let engine = self.engine.read().await;
                let engine = engine.as_ref().ok_or(EngineError::NotActive)?;
                let served = engine.execute(&req, &decision).await?;
                Ok(FetchOutcome::Served(served))
            }
        }
    }

    /// A newer generation has activated; stop intercepting for good.
    pub async fn retire(&self) {
        self.lifecycle.supersede().await;
        *self.engine.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_message_wire_form() {
        let msg: ControlMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(msg, ControlMessage::SkipWaiting);

        let round = serde_json::to_string(&ControlMessage::SkipWaiting).unwrap();
        assert_eq!(round, r#"{"type":"SKIP_WAITING"}"#);
    }

    #[test]
    fn test_unknown_message_type_is_rejected() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"DRAIN"}"#).is_err());
    }
}

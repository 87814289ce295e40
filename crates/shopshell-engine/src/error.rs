//! Engine error taxonomy.

use shopshell_core::ConfigError;
use shopshell_net::GatewayError;
use shopshell_store::{CacheKey, StoreError};

use crate::lifecycle::WorkerState;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by routing, strategies and the lifecycle.
///
/// Non-GET requests are not an error: they come back as an unmanaged
/// outcome from the dispatcher instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The transport failed and no cache or fallback path recovered it.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(#[from] GatewayError),

    /// A precache fetch failed during bulk population. Fatal to the
    /// generation: activation is aborted and any previous generation
    /// remains authoritative.
    #[error("provisioning failed: {0}")]
    ProvisioningFailed(String),

    /// Lookup miss with no fallback configured.
    #[error("no cache entry for {0}")]
    NoCacheEntry(CacheKey),

    /// Backend store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid worker configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A managed request arrived before this generation activated, or
    /// after it was superseded.
    #[error("generation is not active")]
    NotActive,

    /// Activation was requested while a previous generation still has
    /// attached clients and the skip-waiting gate is closed.
    #[error("a previous generation is still attached; activation deferred")]
    ActivationDeferred,

    /// A lifecycle operation was invoked from the wrong state.
    #[error("invalid lifecycle state {actual} (expected {expected})")]
    InvalidState {
        expected: &'static str,
        actual: WorkerState,
    },

    /// The detached revalidation task was aborted before completing.
    #[error("revalidation task aborted: {0}")]
    Revalidation(String),
}

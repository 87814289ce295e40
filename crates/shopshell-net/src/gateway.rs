//! The transport seam.

use async_trait::async_trait;
use shopshell_core::{RequestContext, StoredResponse};

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Transport-level failures.
///
/// Absence of a response is detected only through the transport's own
/// failure signal; no additional timeout is layered on top by callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The origin could not be reached.
    #[error("network unreachable for {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The transport itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Per-fetch transport cache control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Let intermediate transport caches apply.
    #[default]
    Default,
    /// Bypass intermediate transport caches, so a stale intermediary never
    /// masks true origin freshness.
    NoStore,
}

/// A network origin the strategies fetch through.
///
/// Only GET-equivalent reads are issued; a returned error means the
/// transport failed, while origin-level failures (4xx/5xx) come back as
/// ordinary responses.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch `request` from the origin.
    async fn fetch(&self, request: &RequestContext, mode: FetchMode)
        -> GatewayResult<StoredResponse>;
}

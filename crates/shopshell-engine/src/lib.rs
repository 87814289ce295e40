//! Request interception engine for the shopshell cache layer.
//!
//! This crate provides:
//! - `PassthroughAllowlist` - Remote hosts that bypass interception
//! - `RoutingPolicy` - The per-request strategy decision table
//! - `StrategyEngine` - cache-first / network-first / stale-while-revalidate
//!   / direct-network execution against the store abstraction
//! - `LifecycleManager` - Generation provisioning, activation and retirement
//! - `WorkerHost` - Event dispatcher tying the pieces together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shopshell_core::ShellConfig;
//! use shopshell_engine::{presets, WorkerHost, WorkerEvent};
//! use shopshell_net::HttpGateway;
//! use shopshell_store::MemoryStorage;
//!
//! let config = ShellConfig::ms360(scope_url);
//! let host = WorkerHost::new(
//!     config,
//!     presets::amazon_images(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(HttpGateway::new(Default::default())?),
//! )?;
//! host.dispatch(WorkerEvent::Install).await?;
//! host.dispatch(WorkerEvent::Activate).await?;
//! ```

mod allowlist;
mod dispatch;
mod error;
mod lifecycle;
mod policy;
mod strategy;

pub use allowlist::*;
pub use dispatch::*;
pub use error::*;
pub use lifecycle::*;
pub use policy::*;
pub use strategy::*;

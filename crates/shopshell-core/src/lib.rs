//! Core abstractions for the shopshell request-interception cache layer.
//!
//! This crate provides the fundamental types shared by the store, network
//! and engine crates:
//! - `RequestContext` - Typed description of an intercepted request
//! - `StoredResponse` - An owned response (status, headers, body bytes)
//! - `CacheRole` / `VersionTag` - Versioned named store identification
//! - `ShellConfig` / `PrecacheManifest` - Immutable worker configuration

mod config;
mod context;
mod response;
mod version;

pub use config::*;
pub use context::*;
pub use response::*;
pub use version::*;

//! Network origin access for the shopshell cache layer.
//!
//! This crate provides:
//! - `Gateway` - The transport seam strategies fetch through
//! - `FetchMode` - Per-fetch transport cache control
//! - `HttpGateway` - reqwest-backed implementation
//! - `ScriptedGateway` - In-memory origin with canned responses for tests

mod gateway;
mod http;
mod mock;

pub use gateway::*;
pub use http::*;
pub use mock::*;

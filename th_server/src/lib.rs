//! HTTP/WebSocket front end for `tournament_hub`.
//!
//! The binary in `main.rs` wires configuration, storage and the router
//! together; the modules are exposed here so integration tests can build the
//! same router against an in-memory store.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

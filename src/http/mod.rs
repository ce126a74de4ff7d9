//! HTTP façade over the capability registries
//!
//! Provides REST-style tool routes plus a JSON-RPC endpoint sharing the stdio dispatcher.

pub mod handlers;

//! JSON-RPC envelope handling and method dispatch
//!
//! Provides envelope parsing and formatting, the method alias table, and routing to capability handlers.

pub mod rpc;
pub mod server;

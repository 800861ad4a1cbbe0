//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the subset of MCP needed to expose a small, fixed
//! set of tools over HTTP. Requests are JSON-RPC 2.0 envelopes posted to
//! `/mcp`; each is answered with exactly one envelope.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LifecycleManager                          │
//! │                  (start / stop / restart / status)               │
//! │                                                                  │
//! │   ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐    │
//! │   │  Transport  │───▶│    Router    │───▶│  ToolDispatcher  │    │
//! │   │   (HTTP)    │    │  (methods)   │    │   (validation)   │    │
//! │   └─────────────┘    └──────────────┘    └──────────────────┘    │
//! │                             │                     │              │
//! │                             ▼                     ▼              │
//! │                      ┌──────────────┐    ┌──────────────────┐    │
//! │                      │   Sessions   │    │   ToolRegistry   │    │
//! │                      └──────────────┘    └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation reports MCP protocol version 2025-03-26.

pub mod lifecycle;
pub mod protocol;
pub mod router;
pub mod session;
pub mod tools;
pub mod transport;

pub use lifecycle::{LifecycleManager, LifecyclePhase, ServerStatus};
pub use protocol::{JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION};
pub use router::{ProtocolRouter, RoutedResponse};
pub use session::{SessionId, SessionIdAllocator, UuidSessionAllocator};
pub use tools::{ToolCallResult, ToolDispatcher, ToolRegistry};

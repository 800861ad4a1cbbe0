//! local-mcp-server: a local HTTP server speaking a minimal subset of MCP
//!
//! The server exposes three tools (`ping`, `echo`, `get_server_info`) on
//! `POST /mcp` and a host-driven lifecycle for embedding in a desktop shell
//! or any other process that needs start/stop/restart control.
//!
//! # Architecture
//!
//! - **Protocol**: JSON-RPC 2.0 envelopes, correlation ids echoed verbatim
//! - **Tools**: a fixed registry with schema-checked arguments
//! - **Lifecycle**: one owned listener with serialised transitions and a
//!   bounded graceful drain
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol, tools, HTTP transport and lifecycle

pub mod config;
pub mod error;
pub mod mcp;

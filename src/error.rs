//! Error types for local-mcp-server.
//!
//! Three families live here:
//!
//! - [`ConfigError`]: loading and validating the configuration file
//! - [`ServerError`]: lifecycle failures surfaced to the host (`start`, `restart`)
//! - [`ToolError`]: tool dispatch failures, turned into JSON-RPC error
//!   envelopes by the protocol router

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors returned by the server lifecycle manager.
///
/// These are the only failures that propagate to the host directly; every
/// protocol-level failure is recovered into a response envelope instead.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind MCP server to port {port}")]
    Bind {
        /// Port that was requested.
        port: u16,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// `start` was called while a listener is already serving.
    #[error("MCP server is already running on port {port}")]
    AlreadyRunning {
        /// Port of the running listener.
        port: u16,
    },
}

/// Errors produced while dispatching a tool call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is registered.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// The requested tool name.
        name: String,
    },

    /// The arguments do not satisfy the tool's input schema.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments {
        /// The tool being invoked.
        tool: String,
        /// What was wrong with the arguments.
        message: String,
    },
}

impl ToolError {
    /// Creates an invalid arguments error for `tool`.
    #[must_use]
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn bind_error_keeps_source() {
        use std::error::Error as _;

        let error = ServerError::Bind {
            port: 3999,
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(error.to_string().contains("3999"));
        assert!(error.source().is_some());
    }

    #[test]
    fn tool_error_display() {
        let unknown = ToolError::UnknownTool {
            name: "nope".to_string(),
        };
        assert_eq!(unknown.to_string(), "Unknown tool: nope");

        let invalid = ToolError::invalid_arguments("echo", "missing required property 'message'");
        let msg = invalid.to_string();
        assert!(msg.contains("echo"));
        assert!(msg.contains("message"));
    }
}

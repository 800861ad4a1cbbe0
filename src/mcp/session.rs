//! Session identifiers for the `Mcp-Session-Id` header.
//!
//! The server keeps no per-session state. A token is issued when the client
//! did not send one and is round-tripped purely for the client's bookkeeping.

use uuid::Uuid;

/// HTTP header carrying the session token in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// An opaque session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues session tokens for requests that arrive without one.
pub trait SessionIdAllocator: Send + Sync {
    /// Returns a fresh token.
    fn allocate(&self) -> SessionId;

    /// Returns the caller's token when present and non-blank, otherwise a
    /// freshly allocated one.
    fn resolve(&self, supplied: Option<&str>) -> SessionId {
        match supplied.map(str::trim) {
            Some(token) if !token.is_empty() => SessionId::new(token),
            _ => self.allocate(),
        }
    }
}

/// Default allocator producing `session_<uuid v4 simple>` tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSessionAllocator;

impl SessionIdAllocator for UuidSessionAllocator {
    fn allocate(&self) -> SessionId {
        SessionId(format!("session_{}", Uuid::new_v4().simple()))
    }
}

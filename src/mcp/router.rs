//! Protocol router: maps request envelopes to response envelopes.
//!
//! Routing is a closed set of methods ([`Method`]). Every failure below this
//! boundary, including a panic inside a handler, is turned into a
//! well-formed error envelope that carries the caller's `id`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::ToolError;
use crate::mcp::protocol::{
    parse_request, ErrorCode, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};
use crate::mcp::session::{SessionId, SessionIdAllocator, UuidSessionAllocator};
use crate::mcp::tools::{ServerIdentity, ToolDispatcher, ToolRegistry};

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

/// Client information optionally sent with `initialize`.
#[derive(Debug, Clone, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// The protocol methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `ping`
    Ping,
    /// Anything else, including `notifications/*`.
    Unknown(&'a str),
}

impl<'a> Method<'a> {
    /// Classifies a request by method name.
    #[must_use]
    pub fn classify(method: &'a str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "ping" => Self::Ping,
            m => Self::Unknown(m),
        }
    }
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    /// Token for the `Mcp-Session-Id` response header.
    pub session_id: SessionId,
    /// The envelope to send.
    pub response: JsonRpcResponse,
}

/// Stateless request router shared by all connection tasks.
pub struct ProtocolRouter {
    dispatcher: ToolDispatcher,
    sessions: Arc<dyn SessionIdAllocator>,
}

impl std::fmt::Debug for ProtocolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRouter")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl ProtocolRouter {
    /// Creates a router from its collaborators.
    #[must_use]
    pub fn new(dispatcher: ToolDispatcher, sessions: Arc<dyn SessionIdAllocator>) -> Self {
        Self {
            dispatcher,
            sessions,
        }
    }

    /// Creates a router with the built-in tools and UUID session tokens.
    #[must_use]
    pub fn with_defaults(port: u16) -> Self {
        let dispatcher =
            ToolDispatcher::new(Arc::new(ToolRegistry::builtin()), ServerIdentity::new(port));
        Self::new(dispatcher, Arc::new(UuidSessionAllocator))
    }

    /// Parses and routes a raw request body.
    #[must_use]
    pub fn handle_body(&self, body: &[u8], session: Option<&str>) -> RoutedResponse {
        let session_id = self.sessions.resolve(session);
        let response = match parse_request(body) {
            Ok(request) => self.route_guarded(&request),
            Err(error) => {
                debug!(code = ?error.error_data().map(|e| e.code), "Rejected request body");
                error
            }
        };
        RoutedResponse {
            session_id,
            response,
        }
    }

    /// Routes an already parsed request.
    #[must_use]
    pub fn handle(&self, request: &JsonRpcRequest, session: Option<&str>) -> RoutedResponse {
        RoutedResponse {
            session_id: self.sessions.resolve(session),
            response: self.route_guarded(request),
        }
    }

    fn route_guarded(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        guarded(request, || self.route(request))
    }

    fn route(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let method = Method::classify(&request.method);
        debug!(method = %request.method, id = ?request.id, "Routing request");

        let outcome = match method {
            Method::Initialize => Ok(Self::initialize(request.params.as_ref())),
            Method::ToolsList => Ok(json!({ "tools": self.dispatcher.registry().list_tools() })),
            Method::ToolsCall => self.call_tool(request.params.as_ref()),
            Method::Ping => Ok(json!({})),
            Method::Unknown(name) => Err(JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {name}"),
            )),
        };

        let id = request.id.clone();
        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    /// Builds the static `initialize` reply.
    fn initialize(params: Option<&Value>) -> Value {
        if let Some(client) = params
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| serde_json::from_value::<ClientInfo>(c.clone()).ok())
        {
            debug!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                "Client initialising"
            );
        }

        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": ServerInfo::default(),
        })
    }

    fn call_tool(&self, params: Option<&Value>) -> Result<Value, JsonRpcErrorData> {
        let params: ToolCallParams = params
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidParams,
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcErrorData::with_message(ErrorCode::InvalidParams, "Missing tool call params")
            })?;

        let result = self
            .dispatcher
            .invoke(&params.name, params.arguments.as_ref())
            .map_err(tool_error_data)?;

        serde_json::to_value(&result).map_err(|e| {
            error!(error = %e, "Failed to serialise tool call result");
            JsonRpcErrorData::from_code(ErrorCode::InternalError)
                .with_data(Value::String("failed to serialise result".to_string()))
        })
    }
}

/// Maps a dispatcher failure onto its JSON-RPC error object.
fn tool_error_data(err: ToolError) -> JsonRpcErrorData {
    let message = err.to_string();
    match err {
        ToolError::UnknownTool { name } => {
            JsonRpcErrorData::with_message(ErrorCode::ToolNotFound, message)
                .with_data(json!({ "tool": name }))
        }
        ToolError::InvalidArguments { tool, .. } => {
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, message)
                .with_data(json!({ "tool": tool }))
        }
    }
}

/// Runs `route`, converting a panic into an internal error envelope.
fn guarded<F>(request: &JsonRpcRequest, route: F) -> JsonRpcResponse
where
    F: FnOnce() -> JsonRpcResponse,
{
    panic::catch_unwind(AssertUnwindSafe(route)).unwrap_or_else(|payload| {
        let detail = panic_detail(payload.as_ref());
        error!(method = %request.method, id = ?request.id, detail = %detail, "Request handler panicked");
        JsonRpcResponse::internal_error(request.id.clone(), detail)
    })
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected failure".to_string())
}

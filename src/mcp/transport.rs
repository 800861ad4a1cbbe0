//! HTTP transport for the MCP server.
//!
//! Routes:
//!
//! - `GET /health`: liveness payload
//! - `POST /mcp`: one JSON-RPC request per body, answered with one envelope
//! - `GET /mcp`: static discovery document
//! - `OPTIONS /mcp`: CORS preflight
//!
//! Every response carries permissive CORS headers. `POST /mcp` responses
//! also carry `Mcp-Session-Id`.
//!
//! # Status codes
//!
//! Protocol and tool errors are reported inside a `200 OK` envelope; only an
//! internal failure yields `500`.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::mcp::protocol::{iso_timestamp, MCP_PROTOCOL_VERSION, SERVER_DISPLAY_NAME, SERVER_VERSION};
use crate::mcp::router::ProtocolRouter;
use crate::mcp::session::SESSION_HEADER;

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    router: Arc<ProtocolRouter>,
    port: u16,
}

/// Builds the axum application serving `router` on `port`.
pub fn build_app(router: Arc<ProtocolRouter>, port: u16) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/mcp",
            get(discovery).post(handle_mcp).options(preflight),
        )
        .layer(middleware::map_response(add_cors_headers))
        .with_state(AppState { router, port })
}

/// Serves `app` on `listener` until `shutdown` resolves, then drains
/// in-flight connections.
///
/// # Errors
///
/// Returns an error if the accept loop fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_mcp(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let session = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let routed = state.router.handle_body(&body, session);

    let status = if routed.response.is_internal_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    let mut response = (status, Json(routed.response)).into_response();

    match HeaderValue::from_str(routed.session_id.as_str()) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_HEADER), value);
        }
        Err(e) => tracing::warn!(error = %e, "Session id is not a valid header value"),
    }

    response
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": SERVER_DISPLAY_NAME,
        "port": state.port,
        "timestamp": iso_timestamp(),
    }))
}

async fn discovery() -> Json<Value> {
    Json(json!({
        "message": "MCP (Model Context Protocol) Server",
        "description": "This is a Streamable HTTP MCP server endpoint. Use POST requests to interact with the server.",
        "version": SERVER_VERSION,
        "endpoints": {
            "health": "GET /health",
            "mcp": "POST /mcp"
        },
        "usage": {
            "initialize": {
                "method": "POST",
                "endpoint": "/mcp",
                "body": {
                    "jsonrpc": "2.0",
                    "method": "initialize",
                    "params": {
                        "protocolVersion": MCP_PROTOCOL_VERSION,
                        "capabilities": {},
                        "clientInfo": { "name": "your-client", "version": "1.0.0" }
                    },
                    "id": 1
                }
            },
            "listTools": {
                "method": "POST",
                "endpoint": "/mcp",
                "body": { "jsonrpc": "2.0", "method": "tools/list", "id": 2 }
            },
            "callTool": {
                "method": "POST",
                "endpoint": "/mcp",
                "body": {
                    "jsonrpc": "2.0",
                    "method": "tools/call",
                    "params": { "name": "echo", "arguments": { "message": "hello" } },
                    "id": 3
                }
            }
        },
        "timestamp": iso_timestamp(),
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Mcp-Session-Id"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Mcp-Session-Id"),
    );
    response
}

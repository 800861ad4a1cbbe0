//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the request and response envelopes exchanged on the
//! `/mcp` endpoint. The wire format is JSON-RPC 2.0 with two relaxations
//! that existing HTTP clients of this server rely on:
//!
//! - the `jsonrpc` member may be omitted (when present it must be `"2.0"`)
//! - the `id` member may be omitted or `null`, in which case the response
//!   carries `"id": null`
//!
//! A response always carries exactly one of `result` or `error`; this is
//! enforced by [`ResponseOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "local-mcp-server";

/// Human-readable server name used in health and info payloads.
pub const SERVER_DISPLAY_NAME: &str = "Local MCP Server";

/// Server version reported to clients.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A JSON-RPC 2.0 request ID.
///
/// IDs are opaque to the server and echoed back unchanged. Integers and
/// strings get their own variants; any other non-null JSON value is kept
/// as-is in [`RequestId::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID that fits an `i64`.
    Number(i64),
    /// String request ID.
    String(String),
    /// Any other JSON value: fractions, large unsigned integers, booleans,
    /// arrays or objects.
    Other(Value),
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker; `"2.0"` when present.
    #[serde(default)]
    pub jsonrpc: Option<String>,

    /// Caller-supplied correlation id, if any.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with the given method, parameters and id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            id,
            method: method.into(),
            params,
        }
    }

    /// Validates that this is a well-formed request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// Standard JSON-RPC 2.0 error codes, plus the server-defined tool code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// `tools/call` named a tool that is not registered.
    ToolNotFound,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ToolNotFound => -32001,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ToolNotFound => "Tool not found",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The payload half of a response: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// The method succeeded.
    Result(Value),
    /// The method failed.
    Error(JsonRpcErrorData),
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to; `null` when the request
    /// carried none or it could not be determined.
    pub id: Option<RequestId>,

    /// Result or error.
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: ResponseOutcome::Result(result),
        }
    }

    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::error(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, message),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: Option<RequestId>, detail: impl Into<String>) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::from_code(ErrorCode::InternalError)
                .with_data(Value::String(detail.into())),
        )
    }

    /// Returns the result payload, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    /// Returns the error object, if this is an error response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcErrorData> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(error) => Some(error),
        }
    }

    /// Returns `true` if this response reports an internal server failure.
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        self.error_data()
            .is_some_and(|e| e.code == ErrorCode::InternalError.code())
    }
}

/// Returns the current UTC time as an RFC 3339 timestamp with millisecond
/// precision, e.g. `2026-01-31T09:15:02.123Z`.
#[must_use]
pub fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parses a request body into a request envelope.
///
/// # Errors
///
/// Returns the error response to send back when the body is not JSON, is not
/// a request object, or fails validation. The caller's id is preserved
/// whenever the body is an object carrying one.
pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|_| JsonRpcResponse::parse_error())?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcResponse::invalid_request(
            None,
            "Request must be a JSON object",
        ));
    };

    let recovered_id = obj
        .get("id")
        .filter(|id| !id.is_null())
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::invalid_request(recovered_id, e.to_string()))?;

    if let Some(problem) = request.validate() {
        return Err(JsonRpcResponse::invalid_request(request.id, problem));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = br#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_request_without_jsonrpc_or_id() {
        let json = br#"{"method": "tools/list"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, None);
        assert!(req.jsonrpc.is_none());
        assert!(req.params.is_none());
    }

    #[test]
    fn parse_null_id_is_none() {
        let req = parse_request(br#"{"method": "tools/list", "id": null}"#).unwrap();
        assert_eq!(req.id, None);

        let err = parse_request(br#"{"id": null}"#).unwrap_err();
        assert_eq!(err.id, None);
    }

    #[test]
    fn parse_string_id() {
        let json = br#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_request(b"not valid json").unwrap_err();
        assert_eq!(err.error_data().unwrap().code, ErrorCode::ParseError.code());
        assert_eq!(err.id, None);
    }

    #[test]
    fn parse_non_object() {
        let err = parse_request(b"[1, 2, 3]").unwrap_err();
        assert_eq!(
            err.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
    }

    #[test]
    fn parse_missing_method_keeps_id() {
        let err = parse_request(br#"{"id": 7}"#).unwrap_err();
        assert_eq!(
            err.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
        assert_eq!(err.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let err = parse_request(br#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#).unwrap_err();
        assert_eq!(
            err.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
        assert_eq!(err.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn parse_opaque_ids() {
        for raw in ["1.5", "18446744073709551615", "true", r#"{"nested": true}"#, "[1]"] {
            let body = format!(r#"{{"id": {raw}, "method": "test"}}"#);
            let req = parse_request(body.as_bytes()).unwrap();
            let expected: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(req.id, Some(RequestId::Other(expected)), "{raw}");
        }
    }

    #[test]
    fn opaque_id_kept_on_invalid_request() {
        let err = parse_request(br#"{"id": 2.5, "jsonrpc": "1.0", "method": "test"}"#).unwrap_err();
        assert_eq!(err.id, Some(RequestId::Other(serde_json::json!(2.5))));
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(Some(RequestId::Number(1)), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcResponse::error(
            Some(RequestId::Number(1)),
            JsonRpcErrorData::with_message(ErrorCode::MethodNotFound, "Method not found: unknown/method"),
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn serialise_missing_id_as_null() {
        let response = JsonRpcResponse::success(None, serde_json::json!({}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("id"));
    }

    #[test]
    fn internal_error_carries_detail() {
        let response = JsonRpcResponse::internal_error(None, "boom");
        assert!(response.is_internal_error());
        let error = response.error_data().unwrap();
        assert_eq!(error.message, "Internal error");
        assert_eq!(error.data, Some(Value::String("boom".to_string())));
    }

    #[test]
    fn iso_timestamp_is_utc_millis() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert_eq!(ts.len(), "2026-01-31T09:15:02.123Z".len());
    }

    #[test]
    fn opaque_id_serialises_unchanged() {
        let id = RequestId::Other(serde_json::json!(u64::MAX));
        let value = serde_json::to_value(JsonRpcResponse::success(Some(id), serde_json::json!({})))
            .unwrap();
        assert_eq!(value["id"], u64::MAX);
    }
}

//! Built-in tools: registry, argument validation and dispatch.
//!
//! The tool set is closed. [`ToolRegistry`] holds the descriptors advertised
//! by `tools/list`; [`ToolDispatcher`] validates arguments against those
//! descriptors and runs the matching [`BuiltinTool`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::protocol::{iso_timestamp, SERVER_DISPLAY_NAME, SERVER_VERSION};

/// Greeting used by `ping` when no message is supplied.
pub const DEFAULT_PING_MESSAGE: &str = "Hello from Local MCP Server";

/// Capabilities reported by `get_server_info`.
const SERVER_INFO_CAPABILITIES: [&str; 3] = ["tools", "ping", "echo"];

/// A tool definition for tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Returns the text of the first content item, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| match item {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// The tools this server knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    /// Replies with "Pong!" and an optional message.
    Ping,
    /// Returns the supplied message verbatim.
    Echo,
    /// Reports the server's static identity.
    GetServerInfo,
}

impl BuiltinTool {
    /// All built-in tools, in `tools/list` order.
    pub const ALL: [Self; 3] = [Self::Ping, Self::Echo, Self::GetServerInfo];

    /// Returns the wire name of this tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Echo => "echo",
            Self::GetServerInfo => "get_server_info",
        }
    }

    /// Looks a tool up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn definition(self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Self::Ping => (
                "Simple ping tool that returns pong",
                json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "Message to echo back"
                        }
                    }
                }),
            ),
            Self::Echo => (
                "Echo back the provided message",
                json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "Message to echo back"
                        }
                    },
                    "required": ["message"]
                }),
            ),
            Self::GetServerInfo => (
                "Get information about the MCP server",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Read-only catalog of the tools advertised to clients.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Builds the registry of built-in tools.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            tools: BuiltinTool::ALL
                .into_iter()
                .map(BuiltinTool::definition)
                .collect(),
        }
    }

    /// Returns every tool definition in a stable order.
    #[must_use]
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Returns the definition of the named tool.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

/// Static identity reported by `get_server_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Display name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Port the server was started on.
    pub port: u16,
}

impl ServerIdentity {
    /// Identity of this build, listening on `port`.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            name: SERVER_DISPLAY_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            port,
        }
    }
}

/// Validated tool arguments.
#[derive(Debug, Clone, Copy)]
struct Arguments<'a>(Option<&'a Map<String, Value>>);

impl<'a> Arguments<'a> {
    fn str(self, key: &str) -> Option<&'a str> {
        self.0?.get(key)?.as_str()
    }
}

/// Runs tool calls against the registry.
///
/// Holds no mutable state, so one dispatcher can be shared across request
/// tasks.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    identity: ServerIdentity,
}

impl ToolDispatcher {
    /// Creates a dispatcher over `registry` reporting `identity`.
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>, identity: ServerIdentity) -> Self {
        Self { registry, identity }
    }

    /// Returns the registry this dispatcher serves.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invokes the named tool.
    ///
    /// Missing or `null` arguments are treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if no such tool is registered, and
    /// [`ToolError::InvalidArguments`] if the arguments violate the tool's
    /// input schema.
    pub fn invoke(&self, name: &str, arguments: Option<&Value>) -> Result<ToolCallResult, ToolError> {
        let unknown = || ToolError::UnknownTool {
            name: name.to_string(),
        };
        let definition = self.registry.get(name).ok_or_else(unknown)?;
        let tool = BuiltinTool::from_name(name).ok_or_else(unknown)?;
        let args = validate_arguments(definition, arguments)?;

        tracing::debug!(tool = name, "Invoking tool");

        let result = match tool {
            BuiltinTool::Ping => {
                let message = args
                    .str("message")
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_PING_MESSAGE);
                ToolCallResult::text(format!("Pong! {message}"))
            }
            BuiltinTool::Echo => {
                // Presence is guaranteed by the schema's `required` list.
                let message = args
                    .str("message")
                    .ok_or_else(|| ToolError::invalid_arguments(name, "message is required"))?;
                ToolCallResult::text(message)
            }
            BuiltinTool::GetServerInfo => ToolCallResult::text(self.server_info()),
        };

        Ok(result)
    }

    fn server_info(&self) -> String {
        let info = json!({
            "name": self.identity.name,
            "version": self.identity.version,
            "port": self.identity.port,
            "status": "running",
            "timestamp": iso_timestamp(),
            "capabilities": SERVER_INFO_CAPABILITIES,
        });
        format!("{info:#}")
    }
}

/// Checks `arguments` against the `required` and `properties.*.type`
/// constraints of the tool's input schema.
///
/// A property set to `null` counts as absent.
fn validate_arguments<'a>(
    definition: &ToolDefinition,
    arguments: Option<&'a Value>,
) -> Result<Arguments<'a>, ToolError> {
    let tool = definition.name.as_str();
    let map = match arguments {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(ToolError::invalid_arguments(
                tool,
                format!("arguments must be an object, got {}", json_type_name(other)),
            ))
        }
    };

    let schema = &definition.input_schema;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !map.is_some_and(|m| m.get(key).is_some_and(|v| !v.is_null())) {
                return Err(ToolError::invalid_arguments(
                    tool,
                    format!("missing required property '{key}'"),
                ));
            }
        }
    }

    if let (Some(map), Some(properties)) = (map, schema.get("properties").and_then(Value::as_object))
    {
        for (key, value) in map.iter().filter(|(_, v)| !v.is_null()) {
            let Some(expected) = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !matches_type(expected, value) {
                return Err(ToolError::invalid_arguments(
                    tool,
                    format!(
                        "property '{key}' must be of type {expected}, got {}",
                        json_type_name(value)
                    ),
                ));
            }
        }
    }

    Ok(Arguments(map))
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(ToolRegistry::builtin()), ServerIdentity::new(3999))
    }

    #[test]
    fn tool_definitions_valid() {
        let registry = ToolRegistry::builtin();
        let tools = registry.list_tools();
        assert_eq!(tools.len(), 3);

        for tool in tools {
            assert!(!tool.name.is_empty());
            assert!(!tool.description.is_empty());
            assert!(tool.input_schema.is_object());
        }
    }

    #[test]
    fn tool_names_unique_and_ordered() {
        let registry = ToolRegistry::builtin();
        let names: Vec<&str> = registry.list_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["ping", "echo", "get_server_info"]);

        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn every_builtin_is_registered() {
        let registry = ToolRegistry::builtin();
        for tool in BuiltinTool::ALL {
            assert!(registry.get(tool.name()).is_some(), "{} missing", tool.name());
            assert_eq!(BuiltinTool::from_name(tool.name()), Some(tool));
        }
    }

    #[test]
    fn echo_schema_requires_message() {
        let registry = ToolRegistry::builtin();
        let echo = registry.get("echo").unwrap();
        assert_eq!(echo.input_schema["required"], json!(["message"]));

        let ping = registry.get("ping").unwrap();
        assert!(ping.input_schema.get("required").is_none());
    }

    #[test]
    fn definition_serialises_camel_case() {
        let registry = ToolRegistry::builtin();
        let value = serde_json::to_value(registry.get("ping").unwrap()).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn ping_with_and_without_message() {
        let d = dispatcher();
        let with = d.invoke("ping", Some(&json!({"message": "hi"}))).unwrap();
        assert_eq!(with.first_text(), Some("Pong! hi"));

        let without = d.invoke("ping", None).unwrap();
        assert_eq!(
            without.first_text().map(str::to_string),
            Some(format!("Pong! {DEFAULT_PING_MESSAGE}"))
        );

        let empty = d.invoke("ping", Some(&json!({"message": ""}))).unwrap();
        assert_eq!(empty, without);
    }

    #[test]
    fn echo_returns_message_verbatim() {
        let d = dispatcher();
        for message in ["", "hello", "  spaced  ", "multi\nline", "ünïcødé 🚀"] {
            let result = d.invoke("echo", Some(&json!({ "message": message }))).unwrap();
            assert_eq!(result.content.len(), 1);
            assert_eq!(result.first_text(), Some(message));
        }
    }

    #[test]
    fn echo_without_message_is_invalid() {
        let d = dispatcher();
        for args in [None, Some(json!({})), Some(json!({"other": "x"}))] {
            let err = d.invoke("echo", args.as_ref()).unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments { .. }), "{err:?}");
        }
    }

    #[test]
    fn wrongly_typed_property_is_invalid() {
        let d = dispatcher();
        let err = d.invoke("echo", Some(&json!({"message": 42}))).unwrap_err();
        assert!(err.to_string().contains("must be of type string"));
    }

    #[test]
    fn null_message_counts_as_absent() {
        let d = dispatcher();
        let result = d.invoke("ping", Some(&json!({"message": null}))).unwrap();
        assert_eq!(
            result.first_text().map(str::to_string),
            Some(format!("Pong! {DEFAULT_PING_MESSAGE}"))
        );

        let err = d.invoke("echo", Some(&json!({"message": null}))).unwrap_err();
        assert!(err.to_string().contains("missing required property 'message'"));
    }

    #[test]
    fn non_object_arguments_are_invalid() {
        let err = dispatcher()
            .invoke("ping", Some(&json!("hello")))
            .unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn unknown_tool() {
        let err = dispatcher().invoke("delete_everything", None).unwrap_err();
        assert_eq!(
            err,
            ToolError::UnknownTool {
                name: "delete_everything".to_string()
            }
        );
    }

    #[test]
    fn server_info_snapshot() {
        let result = dispatcher().invoke("get_server_info", Some(&json!({}))).unwrap();
        let text = result.first_text().unwrap();
        let info: Value = serde_json::from_str(text).unwrap();

        assert_eq!(info["name"], SERVER_DISPLAY_NAME);
        assert_eq!(info["version"], SERVER_VERSION);
        assert_eq!(info["port"], 3999);
        assert_eq!(info["status"], "running");
        assert_eq!(info["capabilities"], json!(["tools", "ping", "echo"]));
        assert!(info["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(text.contains('\n'), "server info should be pretty-printed");
    }

    #[test]
    fn extra_properties_are_ignored() {
        let result = dispatcher()
            .invoke("get_server_info", Some(&json!({"verbose": true})))
            .unwrap();
        assert!(result.first_text().is_some());
    }
}

//! The capability dispatcher
//!
//! Resolves method names (including the dotted, singular, and slash aliases
//! older clients use) and routes each request to the tool, prompt, or
//! resource handlers. Every dispatched request emits one audit event.

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ListToolsResult, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesPrompts, ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::domain::{
    prompts::{handle_prompts_build, handle_prompts_get, handle_prompts_list},
    resources::{handle_resources_get, handle_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call},
};
use crate::mcp::rpc::{
    app_error_to_json_rpc, params_object, parse_request, JsonRpcRequest, JsonRpcResponse,
};
use crate::{errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Ping,
    Shutdown,
    CapabilitiesList,
    ToolsList,
    ToolsCall,
    PromptsList,
    PromptsBuild,
    PromptsGet,
    ResourcesList,
    ResourcesGet,
    ResourcesRead,
}

impl Method {
    pub fn resolve(name: &str) -> Option<Self> {
        let method = match name {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "shutdown" => Self::Shutdown,
            "capabilities.list" | "capability.list" | "capabilities/list" => {
                Self::CapabilitiesList
            }
            "tools.list" | "tools/list" => Self::ToolsList,
            "tools.call" | "tool.call" | "tools/call" | "tools.invoke" | "tools.execute" => {
                Self::ToolsCall
            }
            "prompts.list" | "prompts/list" => Self::PromptsList,
            "prompts.build" => Self::PromptsBuild,
            "prompts.get" | "prompts/get" => Self::PromptsGet,
            "resources.list" | "resources/list" => Self::ResourcesList,
            "resources.get" => Self::ResourcesGet,
            "resources.read" | "resources/read" => Self::ResourcesRead,
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::Shutdown => "shutdown",
            Self::CapabilitiesList => "capabilities.list",
            Self::ToolsList => "tools.list",
            Self::ToolsCall => "tools.call",
            Self::PromptsList => "prompts.list",
            Self::PromptsBuild => "prompts.build",
            Self::PromptsGet => "prompts.get",
            Self::ResourcesList => "resources.list",
            Self::ResourcesGet => "resources.get",
            Self::ResourcesRead => "resources.read",
        }
    }
}

/// Handles one already-decoded JSON value. Returns `None` for notifications.
pub async fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<JsonRpcResponse> {
    match parse_request(payload) {
        Ok(request) => handle_json_rpc_request(state, request).await,
        Err(error_response) => Some(error_response),
    }
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let JsonRpcRequest { id, method, params } = request;
    let notification = id.is_none();
    let id = id.unwrap_or(Value::Null);
    let audit_params = redact_audit_params(params.as_ref());

    let resolved = Method::resolve(&method);
    let outcome = match resolved {
        Some(resolved) => match params_object(params) {
            Ok(params) => dispatch(state, resolved, params).await,
            Err(err) => Err(err),
        },
        None => Err(AppError::method_not_found(method.as_str())),
    };

    let response = match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(err) => app_error_to_json_rpc(id, err),
    };

    info!(
        method = %method,
        canonical = resolved.map(Method::as_str).unwrap_or("unknown"),
        params = %audit_params,
        notification,
        outcome = if response.is_error() { "failure" } else { "success" },
        "mcp action audited"
    );

    if notification {
        None
    } else {
        Some(response)
    }
}

pub async fn dispatch(
    state: &AppState,
    method: Method,
    params: Map<String, Value>,
) -> Result<Value, AppError> {
    match method {
        Method::Initialize => initialize_result(&params),
        Method::Ping => Ok(json!({})),
        Method::Shutdown => Ok(json!({ "ok": true })),
        Method::CapabilitiesList => capabilities_list(state).await,
        Method::ToolsList => tools_list(state),
        Method::ToolsCall => handle_tools_call(state, params).await,
        Method::PromptsList => Ok(handle_prompts_list(state)),
        Method::PromptsBuild => handle_prompts_build(state, params),
        Method::PromptsGet => handle_prompts_get(state, params),
        Method::ResourcesList => handle_resources_list(state).await,
        Method::ResourcesGet => handle_resources_get(state, params).await,
        Method::ResourcesRead => handle_resources_read(state, params).await,
    }
}

pub async fn capabilities_list(state: &AppState) -> Result<Value, AppError> {
    let resources = state.resources.list().await?;
    Ok(json!({
        "tools": build_tools_list(state),
        "prompts": state.prompts.summaries(),
        "resources": resources,
    }))
}

pub fn tools_list(state: &AppState) -> Result<Value, AppError> {
    serde_json::to_value(ListToolsResult {
        meta: None,
        next_cursor: None,
        tools: build_tools_list(state),
    })
    .map_err(|err| AppError::internal(format!("tools list serialization: {err}")))
}

/// Always answers with the one supported protocol version; a different
/// offer from the client is only logged.
pub fn initialize_result(params: &Map<String, Value>) -> Result<Value, AppError> {
    if let Some(offered) = params.get("protocolVersion").and_then(Value::as_str) {
        if offered != SUPPORTED_PROTOCOL_VERSION {
            debug!(
                offered,
                supported = SUPPORTED_PROTOCOL_VERSION,
                "client offered a different protocol version"
            );
        }
    }

    let initialize_result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: Some(ServerCapabilitiesPrompts {
                list_changed: Some(false),
            }),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: Some(
            "Use capabilities.list to discover tools, prompts and resources.".to_string(),
        ),
        meta: None,
    };

    serde_json::to_value(initialize_result)
        .map_err(|err| AppError::internal(format!("initialize result serialization: {err}")))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || ["token", "secret", "password", "credential"]
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mcp::rpc::{parse_line, INVALID_PARAMS, METHOD_NOT_FOUND, SERVER_ERROR};

    fn state() -> AppState {
        AppState::with_builtins(concat!(env!("CARGO_MANIFEST_DIR"), "/resources"))
    }

    async fn call(state: &AppState, line: &str) -> JsonRpcResponse {
        let request = parse_line(line).expect("valid request line");
        handle_json_rpc_request(state, request)
            .await
            .expect("request yields a response")
    }

    #[test]
    fn aliases_resolve_to_canonical_methods() {
        for alias in ["capability.list", "capabilities.list", "capabilities/list"] {
            assert_eq!(Method::resolve(alias), Some(Method::CapabilitiesList));
        }
        for alias in ["tool.call", "tools.call", "tools/call", "tools.invoke", "tools.execute"] {
            assert_eq!(Method::resolve(alias), Some(Method::ToolsCall));
        }
        assert_eq!(Method::resolve("prompts/get"), Some(Method::PromptsGet));
        assert_eq!(Method::resolve("Tools.Call"), None);
        assert_eq!(Method::ToolsCall.as_str(), "tools.call");
    }

    #[tokio::test]
    async fn add_scenario_matches_wire_bytes() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":2,"method":"tool.call","params":{"name":"add","arguments":{"a":2,"b":5}}}"#,
        )
        .await;
        assert_eq!(
            response.to_line(),
            r#"{"jsonrpc":"2.0","id":2,"result":{"sum":7}}"#
        );
    }

    #[tokio::test]
    async fn unknown_method_preserves_id_without_result() {
        let response = call(&state(), r#"{"jsonrpc":"2.0","id":"req-9","method":"nope"}"#).await;
        let value = serde_json::to_value(&response).expect("serializable");
        assert_eq!(value["id"], "req-9");
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(value["error"]["message"], "Method not found");
        assert_eq!(value["error"]["data"]["details"]["method"], "nope");
    }

    #[tokio::test]
    async fn invalid_arguments_carry_validation_detail() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tool.call","params":{"name":"echo","arguments":{"message":5}}}"#,
        )
        .await;
        let error = response.error.expect("error envelope");
        assert_eq!(error.code, INVALID_PARAMS);
        let data = error.data.expect("validation detail");
        assert_eq!(data["code"], "invalid_arguments");
        assert!(data["details"]["reason"].is_string());
    }

    #[tokio::test]
    async fn non_object_params_are_invalid() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tool.call","params":[1,2]}"#,
        )
        .await;
        assert_eq!(response.error.map(|error| error.code), Some(INVALID_PARAMS));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_server_error_with_message() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools.call","params":{"name":"multiply","arguments":{}}}"#,
        )
        .await;
        let error = response.error.expect("error envelope");
        assert_eq!(error.code, SERVER_ERROR);
        assert_eq!(error.message, "Unknown tool: multiply");
        assert_eq!(error.data.expect("data")["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn notification_is_dispatched_without_response() {
        let request = parse_line(
            r#"{"jsonrpc":"2.0","method":"tool.call","params":{"name":"add","arguments":{"a":1,"b":1}}}"#,
        )
        .expect("valid notification");
        assert!(handle_json_rpc_request(&state(), request).await.is_none());
    }

    #[tokio::test]
    async fn capability_list_is_idempotent() {
        let state = state();
        let first = call(&state, r#"{"id":1,"method":"capability.list"}"#).await;
        let second = call(&state, r#"{"id":1,"method":"capability.list"}"#).await;
        assert_eq!(first, second);

        let result = first.result.expect("result");
        assert_eq!(result["tools"].as_array().map(Vec::len), Some(4));
        assert_eq!(result["prompts"][0]["name"], "qa/basic");
        assert!(result["resources"].is_array());
    }

    #[tokio::test]
    async fn prompts_build_renders_qa_basic() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":6,"method":"prompts.build","params":{"name":"qa/basic","arguments":{"question":"What is MCP?","context":"Protocol for tools"}}}"#,
        )
        .await;
        let result = response.result.expect("result");
        let text = result["text"].as_str().expect("rendered text");
        assert_eq!(result["name"], "qa/basic");
        assert_eq!(text.matches("What is MCP?").count(), 1);
        assert_eq!(text.matches("Protocol for tools").count(), 1);
        assert!(text.find("Protocol for tools") < text.find("What is MCP?"));
    }

    #[tokio::test]
    async fn prompts_get_accepts_variables_alias() {
        let response = call(
            &state(),
            r#"{"id":7,"method":"prompts.get","params":{"name":"summarize","variables":{"text":"long text"}}}"#,
        )
        .await;
        let result = response.result.expect("result");
        assert_eq!(result["messages"][0]["role"], "system");
        assert_eq!(result["messages"][1]["role"], "user");
        assert!(result["messages"][1]["content"]["text"]
            .as_str()
            .is_some_and(|text| text.ends_with("long text")));
    }

    #[tokio::test]
    async fn initialize_reports_server_info_and_capabilities() {
        let response = call(
            &state(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-09-01"}}"#,
        )
        .await;
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], SUPPORTED_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn initialize_without_params_succeeds() {
        let response = call(&state(), r#"{"id":1,"method":"initialize"}"#).await;
        assert!(response.result.is_some());
    }

    #[tokio::test]
    async fn shutdown_and_ping_return_fixed_results() {
        let state = state();
        let shutdown = call(&state, r#"{"id":8,"method":"shutdown"}"#).await;
        assert_eq!(shutdown.result, Some(json!({ "ok": true })));
        let ping = call(&state, r#"{"id":9,"method":"ping"}"#).await;
        assert_eq!(ping.result, Some(json!({})));
    }

    #[tokio::test]
    async fn resources_read_rejects_traversal_names() {
        let response = call(
            &state(),
            r#"{"id":10,"method":"resources.read","params":{"name":"../Cargo.toml"}}"#,
        )
        .await;
        let error = response.error.expect("error envelope");
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.data.expect("data")["code"], "invalid_resource_name");
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "echo",
            "arguments": {
                "message": "hello",
                "token": "should-not-appear",
                "api_key": "should-not-appear",
                "nested": {
                    "client_secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("echo"));
        assert_eq!(redacted["arguments"]["message"], json!("hello"));
        assert_eq!(redacted["arguments"]["token"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["client_secret"],
            json!("[REDACTED]")
        );
    }
}

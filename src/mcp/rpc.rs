//! JSON-RPC envelope representations and formatting utilities
//!
//! Request ids are kept as raw JSON values so they are echoed back exactly as
//! the caller sent them, and `AppError`s are mapped onto JSON-RPC error codes.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::AppError;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR: i64 = -32000;

const FALLBACK_LINE: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outgoing envelope. Field order matches the wire layout
/// `jsonrpc`, `id`, then `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serializes the envelope as a single line without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialize response envelope");
            FALLBACK_LINE.to_string()
        })
    }
}

/// A structurally valid incoming request. `id` is `None` for notifications,
/// which is distinct from an explicit `"id": null`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

pub fn parse_line(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let payload: Value = serde_json::from_str(line)
        .map_err(|_| json_rpc_error(Value::Null, PARSE_ERROR, "Parse error"))?;
    parse_request(payload)
}

pub fn parse_request(payload: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let Value::Object(mut object) = payload else {
        return Err(invalid_request(Value::Null));
    };

    // Any JSON value is an opaque id and is echoed back unchanged.
    let id = object.remove("id");
    let response_id = id.clone().unwrap_or(Value::Null);

    match object.get("jsonrpc") {
        None => {}
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(_) => return Err(invalid_request(response_id)),
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => method,
        _ => return Err(invalid_request(response_id)),
    };

    Ok(JsonRpcRequest {
        id,
        method,
        params: object.remove("params"),
    })
}

fn invalid_request(id: Value) -> JsonRpcResponse {
    json_rpc_error(id, INVALID_REQUEST, "Invalid Request")
}

/// Accepts an absent or null `params` as an empty object.
pub fn params_object(params: Option<Value>) -> Result<Map<String, Value>, AppError> {
    match params {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::invalid_params(
            "invalid_params",
            "params must be an object",
        )),
    }
}

pub fn app_error_to_json_rpc(id: Value, err: AppError) -> JsonRpcResponse {
    match err {
        AppError::MethodNotFound { method } => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "method_not_found",
                "message": "unknown method",
                "details": { "method": method },
            })),
        ),
        AppError::InvalidParams {
            code,
            message,
            details,
        } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": details,
            })),
        ),
        AppError::NotFound {
            code,
            message,
            details,
        }
        | AppError::Handler {
            code,
            message,
            details,
        } => json_rpc_error_with_data(
            id,
            SERVER_ERROR,
            &message,
            Some(json!({
                "code": code,
                "message": message,
                "details": details,
            })),
        ),
        AppError::Internal { message } => {
            tracing::error!(error = %message, "request failed with internal error");
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn json_rpc_error(id: Value, code: i64, message: &str) -> JsonRpcResponse {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Value,
    code: i64,
    message: &str,
    data: Option<Value>,
) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        id,
        ErrorObject {
            code,
            message: message.to_string(),
            data,
        },
    )
}

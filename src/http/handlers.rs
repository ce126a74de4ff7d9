//! Axum handlers for the HTTP façade
//!
//! REST-style routes call the same registries as the JSON-RPC dispatcher,
//! and `/rpc` accepts JSON-RPC envelopes (single or batched) directly.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::utils::parse_object;
use crate::errors::AppError;
use crate::mcp::rpc::{json_rpc_error, INVALID_REQUEST, PARSE_ERROR};
use crate::mcp::server::{capabilities_list, handle_json_rpc_value, tools_list};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: [&'static str; 7],
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ToolInvokeRequest {
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: [
            "GET /",
            "GET /health",
            "GET /capabilities",
            "GET /tools",
            "POST /invoke",
            "POST /tools/{name}",
            "POST /rpc",
        ],
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn capabilities(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(Json(capabilities_list(&state).await?))
}

pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(Json(tools_list(&state)?))
}

pub async fn invoke(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request: InvokeRequest = parse_object("invalid_params", "invoke", body_object(&body)?)?;
    let arguments = request.arguments.unwrap_or_default();
    let result = state.tools.call(&request.name, arguments).await?;
    Ok(Json(result))
}

pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request: ToolInvokeRequest = parse_object("invalid_params", &name, body_object(&body)?)?;
    let result = state
        .tools
        .call(&name, request.arguments.unwrap_or_default())
        .await?;
    Ok(Json(result))
}

/// Decodes a request body into a JSON object. An empty body reads as `{}`.
fn body_object(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(AppError::invalid_params(
            "invalid_params",
            "request body must be a JSON object",
        )),
        Err(err) => Err(AppError::invalid_params_with(
            "invalid_params",
            "request body is not valid JSON",
            json!({ "reason": err.to_string() }),
        )),
    }
}

pub async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json_rpc_error(Value::Null, PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    if let Value::Array(batch) = payload {
        if batch.is_empty() {
            return (
                StatusCode::OK,
                Json(json_rpc_error(Value::Null, INVALID_REQUEST, "Invalid Request")),
            )
                .into_response();
        }

        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = handle_json_rpc_value(&state, item).await {
                responses.push(response);
            }
        }

        if responses.is_empty() {
            return StatusCode::NO_CONTENT.into_response();
        }

        return (StatusCode::OK, Json(responses)).into_response();
    }

    match handle_json_rpc_value(&state, payload).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

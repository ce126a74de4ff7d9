//! Tools exposed through `tools.call`
//!
//! Each tool is a small handler object registered in a [`ToolRegistry`] at
//! startup. Argument structs double as the JSON Schema source for the tool
//! descriptor and as the validator for incoming arguments.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::utils::{
    number_value, parse_object, truncate_markdown, DEFAULT_TRUNCATE_CHARS,
};
use crate::{errors::AppError, AppState};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> Tool;

    /// Runs the tool. The returned value is sent back as the JSON-RPC
    /// `result` as is, so it should be an object.
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Echo);
        registry.register(Add);
        registry.register(Reverse);
        registry.register(TruncateMarkdown);
        registry
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let name = handler.descriptor().name;
        self.tools.insert(name, Arc::new(handler));
    }

    pub fn descriptors(&self) -> Vec<Tool> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn call(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let Some(tool) = self.tools.get(name) else {
            return Err(AppError::not_found(
                "tool_not_found",
                format!("Unknown tool: {name}"),
                json!({ "name": name }),
            ));
        };

        tool.call(arguments).await
    }
}

#[macros::mcp_tool(name = "echo", description = "Echo back a message")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoTool {
    pub message: String,
}

#[macros::mcp_tool(name = "add", description = "Add two numbers")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AddTool {
    pub a: f64,
    pub b: f64,
}

#[macros::mcp_tool(name = "reverse", description = "Reverse the provided text")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ReverseTool {
    pub text: String,
}

#[macros::mcp_tool(
    name = "truncate_markdown",
    description = "Shorten markdown text to a character budget, ending on a word boundary"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct TruncateMarkdownTool {
    pub markdown: String,
    pub max_chars: Option<u32>,
}

pub struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    fn descriptor(&self) -> Tool {
        EchoTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let args: EchoTool = parse_object("invalid_arguments", "echo", arguments)?;
        let length = args.message.chars().count();
        Ok(json!({
            "echoed": args.message,
            "length": length,
        }))
    }
}

pub struct Add;

#[async_trait]
impl ToolHandler for Add {
    fn descriptor(&self) -> Tool {
        AddTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let args: AddTool = parse_object("invalid_arguments", "add", arguments)?;
        let sum = args.a + args.b;
        if !sum.is_finite() {
            return Err(AppError::handler(
                "tool_failed",
                "sum is not a finite number",
            ));
        }
        Ok(json!({ "sum": number_value(sum) }))
    }
}

pub struct Reverse;

#[async_trait]
impl ToolHandler for Reverse {
    fn descriptor(&self) -> Tool {
        ReverseTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let args: ReverseTool = parse_object("invalid_arguments", "reverse", arguments)?;
        Ok(json!({ "reversed": args.text.chars().rev().collect::<String>() }))
    }
}

pub struct TruncateMarkdown;

#[async_trait]
impl ToolHandler for TruncateMarkdown {
    fn descriptor(&self) -> Tool {
        TruncateMarkdownTool::tool()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, AppError> {
        let args: TruncateMarkdownTool =
            parse_object("invalid_arguments", "truncate_markdown", arguments)?;
        let max_chars = args.max_chars.unwrap_or(DEFAULT_TRUNCATE_CHARS);
        if max_chars == 0 {
            return Err(AppError::invalid_params_with(
                "invalid_max_chars",
                "max_chars must be at least 1",
                json!({ "max_chars": max_chars }),
            ));
        }

        let original_chars = args.markdown.chars().count();
        let (text, truncated) = truncate_markdown(&args.markdown, max_chars as usize);
        Ok(json!({
            "text": text,
            "truncated": truncated,
            "original_chars": original_chars,
        }))
    }
}

pub fn build_tools_list(state: &AppState) -> Vec<Tool> {
    state.tools.descriptors()
}

pub async fn handle_tools_call(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<Value, AppError> {
    let tool_call: CallToolRequestParams = parse_object("invalid_params", "tools.call", params)?;
    let arguments = tool_call.arguments.unwrap_or_default();
    state.tools.call(&tool_call.name, arguments).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object arguments")
    }

    #[tokio::test]
    async fn add_returns_integral_sum() {
        let registry = ToolRegistry::with_builtin_tools();
        let result = registry
            .call("add", args(json!({ "a": 2, "b": 5 })))
            .await
            .expect("add succeeds");
        assert_eq!(result.to_string(), r#"{"sum":7}"#);
    }

    #[tokio::test]
    async fn add_keeps_fractional_sum() {
        let registry = ToolRegistry::with_builtin_tools();
        let result = registry
            .call("add", args(json!({ "a": 1.5, "b": 1 })))
            .await
            .expect("add succeeds");
        assert_eq!(result["sum"], json!(2.5));
    }

    #[tokio::test]
    async fn add_rejects_non_numeric_arguments() {
        let registry = ToolRegistry::with_builtin_tools();
        let error = registry
            .call("add", args(json!({ "a": "2", "b": 5 })))
            .await
            .expect_err("string argument must fail");
        assert!(matches!(error, AppError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn echo_counts_characters() {
        let registry = ToolRegistry::with_builtin_tools();
        let result = registry
            .call("echo", args(json!({ "message": "héllo" })))
            .await
            .expect("echo succeeds");
        assert_eq!(result, json!({ "echoed": "héllo", "length": 5 }));
    }

    #[tokio::test]
    async fn echo_requires_message() {
        let registry = ToolRegistry::with_builtin_tools();
        let error = registry
            .call("echo", Map::new())
            .await
            .expect_err("missing message must fail");
        assert!(matches!(error, AppError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn reverse_reverses_text() {
        let registry = ToolRegistry::with_builtin_tools();
        let result = registry
            .call("reverse", args(json!({ "text": "abc" })))
            .await
            .expect("reverse succeeds");
        assert_eq!(result, json!({ "reversed": "cba" }));
    }

    #[tokio::test]
    async fn truncate_markdown_reports_truncation() {
        let registry = ToolRegistry::with_builtin_tools();
        let result = registry
            .call(
                "truncate_markdown",
                args(json!({ "markdown": "# Title\n\nSome long paragraph", "max_chars": 12 })),
            )
            .await
            .expect("truncate succeeds");
        assert_eq!(result["text"], "# Title…");
        assert_eq!(result["truncated"], true);
        assert_eq!(result["original_chars"], 28);
    }

    #[tokio::test]
    async fn truncate_markdown_rejects_zero_budget() {
        let registry = ToolRegistry::with_builtin_tools();
        let error = registry
            .call(
                "truncate_markdown",
                args(json!({ "markdown": "text", "max_chars": 0 })),
            )
            .await
            .expect_err("zero budget must fail");
        assert!(matches!(
            error,
            AppError::InvalidParams {
                code: "invalid_max_chars",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::with_builtin_tools();
        let error = registry
            .call("multiply", Map::new())
            .await
            .expect_err("unknown tool must fail");
        assert_eq!(error.to_string(), "Unknown tool: multiply");
    }

    #[test]
    fn descriptors_are_sorted_and_carry_schemas() {
        let registry = ToolRegistry::with_builtin_tools();
        let descriptors = serde_json::to_value(registry.descriptors()).expect("serializable");
        let names: Vec<&str> = descriptors
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names, vec!["add", "echo", "reverse", "truncate_markdown"]);
        assert!(descriptors[0]["inputSchema"]["properties"]["a"].is_object());
        assert!(registry.contains("echo"));
    }
}

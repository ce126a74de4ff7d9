use std::{path::PathBuf, sync::Arc};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod stdio;

use domain::{prompts::PromptRegistry, resources::ResourceStore, tools::ToolRegistry};

/// Registries shared by every transport. Built once at startup and never
/// mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<ToolRegistry>,
    pub prompts: Arc<PromptRegistry>,
    pub resources: Arc<ResourceStore>,
}

impl AppState {
    pub fn new(tools: ToolRegistry, prompts: PromptRegistry, resources: ResourceStore) -> Self {
        Self {
            tools: Arc::new(tools),
            prompts: Arc::new(prompts),
            resources: Arc::new(resources),
        }
    }

    pub fn with_builtins(resources_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            ToolRegistry::with_builtin_tools(),
            PromptRegistry::with_builtin_prompts(),
            ResourceStore::new(resources_dir),
        )
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::root))
        .route("/health", get(http::handlers::health))
        .route("/capabilities", get(http::handlers::capabilities))
        .route("/tools", get(http::handlers::list_tools))
        .route("/tools/{name}", post(http::handlers::invoke_tool))
        .route("/invoke", post(http::handlers::invoke))
        .route("/rpc", post(http::handlers::rpc_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

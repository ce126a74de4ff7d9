//! File-backed resources served through `resources.list`, `resources.get` and `resources.read`
//!
//! Every regular file directly inside the configured root is a resource
//! addressed by its file name. Names are restricted to plain file names and
//! resolved paths must stay inside the root.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::domain::utils::{mime_for, parse_object, validate_resource_name};
use crate::{errors::AppError, AppState};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub name: String,
    pub mime: &'static str,
    pub size: u64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_utc: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceContents {
    pub name: String,
    pub mime: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ResourceRequestParams {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn list(&self) -> Result<Vec<ResourceDescriptor>, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "resource directory does not exist");
                return Ok(vec![]);
            }
            Err(err) => return Err(io_error("list resources", &err)),
        };

        let mut resources = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error("list resources", &err))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            // Follows symlinks, matching what `read` accepts.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(resource = %name, error = %err, "skipping unreadable resource entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            if self.resolve(&name).await.is_err() {
                continue;
            }

            resources.push(descriptor_from(name, &metadata));
        }

        resources.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(resources)
    }

    pub async fn describe(&self, name: &str) -> Result<ResourceDescriptor, AppError> {
        let path = self.resolve(name).await?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|err| io_error("inspect resource", &err))?;
        Ok(descriptor_from(name.to_string(), &metadata))
    }

    pub async fn read(&self, name: &str) -> Result<ResourceContents, AppError> {
        let path = self.resolve(name).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| io_error("read resource", &err))?;
        let content = String::from_utf8(bytes).map_err(|_| {
            AppError::handler(
                "resource_not_utf8",
                format!("Resource {name} is not valid UTF-8 text"),
            )
        })?;

        Ok(ResourceContents {
            name: name.to_string(),
            mime: mime_for(name),
            content,
        })
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, AppError> {
        let name = validate_resource_name(name)?;

        let root = match tokio::fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(unknown_resource(name)),
            Err(err) => return Err(io_error("resolve resource root", &err)),
        };

        let target = match tokio::fs::canonicalize(root.join(name)).await {
            Ok(target) => target,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(unknown_resource(name)),
            Err(err) => return Err(io_error("resolve resource", &err)),
        };

        if !target.starts_with(&root) {
            warn!(resource = name, "resource resolves outside of the resource directory");
            return Err(unknown_resource(name));
        }

        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|err| io_error("inspect resource", &err))?;
        if !metadata.is_file() {
            return Err(unknown_resource(name));
        }

        Ok(target)
    }
}

fn descriptor_from(name: String, metadata: &std::fs::Metadata) -> ResourceDescriptor {
    ResourceDescriptor {
        mime: mime_for(&name),
        size: metadata.len(),
        description: format!("Resource file {name}"),
        modified_utc: metadata.modified().ok().map(|modified| {
            DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Secs, true)
        }),
        name,
    }
}

fn unknown_resource(name: &str) -> AppError {
    AppError::not_found(
        "resource_not_found",
        format!("Unknown resource: {name}"),
        json!({ "name": name }),
    )
}

fn io_error(action: &str, err: &std::io::Error) -> AppError {
    AppError::internal(format!("failed to {action}: {err}"))
}

pub async fn handle_resources_list(state: &AppState) -> Result<Value, AppError> {
    let resources = state.resources.list().await?;
    Ok(json!({ "resources": resources }))
}

pub async fn handle_resources_get(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<Value, AppError> {
    let request: ResourceRequestParams = parse_object("invalid_params", "resources.get", params)?;
    let descriptor = state.resources.describe(&request.name).await?;
    serde_json::to_value(descriptor).map_err(|err| AppError::internal(err.to_string()))
}

pub async fn handle_resources_read(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<Value, AppError> {
    let request: ResourceRequestParams = parse_object("invalid_params", "resources.read", params)?;
    let contents = state.resources.read(&request.name).await?;
    serde_json::to_value(contents).map_err(|err| AppError::internal(err.to_string()))
}

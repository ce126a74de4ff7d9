use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("method not found: {method}")]
    MethodNotFound { method: String },
    #[error("invalid params: {message}")]
    InvalidParams {
        code: &'static str,
        message: String,
        details: Value,
    },
    #[error("{message}")]
    NotFound {
        code: &'static str,
        message: String,
        details: Value,
    },
    #[error("{message}")]
    Handler {
        code: &'static str,
        message: String,
        details: Value,
    },
    #[error("internal error")]
    Internal { message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl AppError {
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params(code: &'static str, message: impl Into<String>) -> Self {
        Self::invalid_params_with(code, message, json!({}))
    }

    pub fn invalid_params_with(
        code: &'static str,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::InvalidParams {
            code,
            message: message.into(),
            details,
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
            details,
        }
    }

    pub fn handler(code: &'static str, message: impl Into<String>) -> Self {
        Self::Handler {
            code,
            message: message.into(),
            details: json!({}),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::MethodNotFound { method } => (
                StatusCode::NOT_FOUND,
                "method_not_found",
                "Method not found".to_string(),
                json!({ "method": method }),
            ),
            Self::InvalidParams {
                code,
                message,
                details,
            } => (StatusCode::BAD_REQUEST, code, message, details),
            Self::NotFound {
                code,
                message,
                details,
            } => (StatusCode::NOT_FOUND, code, message, details),
            Self::Handler {
                code,
                message,
                details,
            } => (StatusCode::UNPROCESSABLE_ENTITY, code, message, details),
            Self::Internal { message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                    json!({}),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details,
            }),
        )
            .into_response()
    }
}

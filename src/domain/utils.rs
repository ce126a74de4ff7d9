//! Shared argument validation and formatting helpers

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::errors::AppError;

pub const DEFAULT_TRUNCATE_CHARS: u32 = 280;
const ELLIPSIS: char = '…';
// Largest integer an f64 holds exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Validates a JSON object against the shape of `T` by deserializing it.
///
/// On failure the serde message is carried in `details.reason` so callers
/// get the exact field and expectation that was violated.
pub fn parse_object<T: DeserializeOwned>(
    code: &'static str,
    subject: &str,
    object: Map<String, Value>,
) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(object)).map_err(|err| {
        AppError::invalid_params_with(
            code,
            format!("invalid arguments for {subject}"),
            json!({
                "subject": subject,
                "reason": err.to_string(),
            }),
        )
    })
}

/// Integral values are emitted as JSON integers so `2 + 5` reads `7`, not `7.0`.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Cuts `markdown` to at most `max_chars` characters, preferring to stop at
/// the last whitespace of the kept prefix, and appends an ellipsis when
/// anything was removed.
pub fn truncate_markdown(markdown: &str, max_chars: usize) -> (String, bool) {
    let Some((cut, _)) = markdown.char_indices().nth(max_chars) else {
        return (markdown.to_string(), false);
    };

    let mut kept = &markdown[..cut];
    if let Some(position) = kept.rfind(char::is_whitespace) {
        if !kept[..position].trim().is_empty() {
            kept = &kept[..position];
        }
    }

    let mut text = kept.trim_end().to_string();
    text.push(ELLIPSIS);
    (text, true)
}

pub fn validate_resource_name(name: &str) -> Result<&str, AppError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(AppError::invalid_params_with(
            "invalid_resource_name",
            "resource name must be a plain file name",
            json!({ "name": name }),
        ));
    }

    Ok(name)
}

pub fn mime_for(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".md") {
        "text/markdown"
    } else {
        "text/plain"
    }
}

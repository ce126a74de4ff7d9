//! Prompt templates served through `prompts.list`, `prompts.build` and `prompts.get`

use std::{collections::HashMap, sync::OnceLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::utils::parse_object;
use crate::{errors::AppError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgument>,
    pub system: Option<&'static str>,
    pub template: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PromptSummary<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub arguments: &'a [PromptArgument],
}

#[derive(Debug, Deserialize)]
pub struct PromptRequestParams {
    pub name: String,
    #[serde(default, alias = "variables")]
    pub arguments: Option<Map<String, Value>>,
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

impl PromptTemplate {
    pub fn summary(&self) -> PromptSummary<'_> {
        PromptSummary {
            name: self.name,
            description: self.description,
            arguments: &self.arguments,
        }
    }

    /// Substitutes `{{variable}}` placeholders in one pass. Values are never
    /// re-scanned, so a value containing `{{x}}` is inserted literally.
    pub fn render(&self, variables: &Map<String, Value>) -> Result<String, AppError> {
        let mut values: HashMap<&str, String> = HashMap::with_capacity(variables.len());

        for (key, value) in variables {
            let Some(argument) = self.arguments.iter().find(|argument| argument.name == key) else {
                return Err(AppError::invalid_params_with(
                    "unknown_variable",
                    format!("prompt '{}' does not declare variable '{key}'", self.name),
                    json!({ "prompt": self.name, "variable": key }),
                ));
            };

            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => {
                    return Err(AppError::invalid_params_with(
                        "invalid_variable",
                        format!("variable '{key}' must be a string, number, or boolean"),
                        json!({ "prompt": self.name, "variable": key }),
                    ))
                }
            };
            values.insert(argument.name, text);
        }

        if let Some(missing) = self
            .arguments
            .iter()
            .find(|argument| argument.required && !values.contains_key(argument.name))
        {
            return Err(AppError::invalid_params_with(
                "missing_variable",
                format!("prompt '{}' requires variable '{}'", self.name, missing.name),
                json!({ "prompt": self.name, "variable": missing.name }),
            ));
        }

        let rendered = placeholder_pattern().replace_all(self.template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

pub struct PromptRegistry {
    prompts: Vec<PromptTemplate>,
}

impl PromptRegistry {
    pub fn new(prompts: Vec<PromptTemplate>) -> Self {
        Self { prompts }
    }

    pub fn with_builtin_prompts() -> Self {
        Self::new(vec![
            PromptTemplate {
                name: "qa/basic",
                description: "Answer a question using only the supplied context",
                arguments: vec![
                    PromptArgument {
                        name: "question",
                        description: "The question to answer",
                        required: true,
                    },
                    PromptArgument {
                        name: "context",
                        description: "Background text the answer must come from",
                        required: true,
                    },
                ],
                system: Some(
                    "You are a precise assistant. If the context does not contain the answer, say so.",
                ),
                template: "Answer the question using only the provided context.\n\nContext:\n{{context}}\n\nQuestion:\n{{question}}\n\nAnswer:",
            },
            PromptTemplate {
                name: "summarize",
                description: "Summarize provided text",
                arguments: vec![PromptArgument {
                    name: "text",
                    description: "Input text to summarize",
                    required: true,
                }],
                system: Some("You are a helpful summarization assistant."),
                template: "Summarize the following text:\n\n{{text}}",
            },
            PromptTemplate {
                name: "improve",
                description: "Improve clarity and grammar of text",
                arguments: vec![PromptArgument {
                    name: "text",
                    description: "Draft text to improve",
                    required: true,
                }],
                system: Some("You refine user text for clarity and correctness."),
                template: "Improve the clarity and grammar of this draft:\n\n{{text}}",
            },
        ])
    }

    pub fn summaries(&self) -> Vec<PromptSummary<'_>> {
        self.prompts.iter().map(PromptTemplate::summary).collect()
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate, AppError> {
        self.prompts
            .iter()
            .find(|prompt| prompt.name == name)
            .ok_or_else(|| {
                AppError::not_found(
                    "prompt_not_found",
                    format!("Unknown prompt: {name}"),
                    json!({ "name": name }),
                )
            })
    }
}

pub fn handle_prompts_list(state: &AppState) -> Value {
    json!({ "prompts": state.prompts.summaries() })
}

pub fn handle_prompts_build(
    state: &AppState,
    params: Map<String, Value>,
) -> Result<Value, AppError> {
    let request: PromptRequestParams = parse_object("invalid_params", "prompts.build", params)?;
    let prompt = state.prompts.get(&request.name)?;
    let text = prompt.render(&request.arguments.unwrap_or_default())?;

    Ok(json!({
        "name": prompt.name,
        "text": text,
    }))
}

pub fn handle_prompts_get(state: &AppState, params: Map<String, Value>) -> Result<Value, AppError> {
    let request: PromptRequestParams = parse_object("invalid_params", "prompts.get", params)?;
    let prompt = state.prompts.get(&request.name)?;
    let text = prompt.render(&request.arguments.unwrap_or_default())?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system {
        messages.push(json!({
            "role": "system",
            "content": { "type": "text", "text": system },
        }));
    }
    messages.push(json!({
        "role": "user",
        "content": { "type": "text", "text": text },
    }));

    Ok(json!({
        "name": prompt.name,
        "description": prompt.description,
        "messages": messages,
    }))
}

//! Hosted text-generation backend for structured extraction.

use crate::{config::Config, error::ServiceError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const TOOL_NAME: &str = "extract_data";

pub struct ExtractionRequest<'a> {
    pub text: &'a str,
    pub schema: &'a Value,
    pub document_type: Option<&'a str>,
}

/// Text + schema in, schema-shaped JSON out. May fail at any time.
pub trait ExtractionService: Send + Sync {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, ServiceError>;
}

/// Anthropic Messages API with a forced tool call carrying the schema.
pub struct AnthropicService {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    api_version: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicService {
    pub fn new(cfg: &Config, api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.extraction.request_timeout_seconds))
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            client,
            api_key,
            endpoint: cfg.extraction.endpoint.clone(),
            api_version: cfg.extraction.api_version.clone(),
            model: cfg.extraction.model.clone(),
            max_tokens: cfg.extraction.max_tokens,
            temperature: cfg.extraction.temperature,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    tools: Vec<Tool<'a>>,
    tool_choice: ToolChoice<'a>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

impl ExtractionService for AnthropicService {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, ServiceError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: build_prompt(request.text, request.document_type),
            }],
            tools: vec![Tool {
                name: TOOL_NAME,
                description: "Extracts structured data from the document.",
                input_schema: request.schema,
            }],
            tool_choice: ToolChoice {
                kind: "tool",
                name: TOOL_NAME,
            },
        };

        debug!(model = %self.model, chars = request.text.len(), "structured extraction request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| ServiceError::Response(e.to_string()))?;
        tool_input(parsed)
    }
}

fn tool_input(response: MessagesResponse) -> Result<Value, ServiceError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == TOOL_NAME => Some(input),
            _ => None,
        })
        .ok_or_else(|| ServiceError::Response("no structured data in response".into()))
}

/// Instruction text sent alongside the document.
pub fn build_prompt(text: &str, document_type: Option<&str>) -> String {
    let context = document_type
        .map(|t| format!("This is a {t} document. "))
        .unwrap_or_default();
    format!(
        "{context}You are a data extraction expert. Extract structured information from the document below.\n\
         \n\
         <document>\n\
         {text}\n\
         </document>\n\
         \n\
         Fill in every field of the provided schema that the document supports. \
         Use null or an empty string for fields the document does not contain.\n\
         Format dates as YYYY-MM-DD where possible.\n\
         Give full names where available, keeping prefixes and suffixes.\n\
         Preserve identification numbers exactly, including A-Numbers (e.g. A12345678) and receipt numbers.\n\
         \n\
         Return the result with the {TOOL_NAME} tool."
    )
}

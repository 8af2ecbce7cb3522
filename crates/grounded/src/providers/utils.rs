use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Usage;
use crate::retry::{is_retryable_status, RetryPolicy};

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"));
static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex"));

/// Placeholder function name used when the model emitted a call we could not parse.
/// The matching tool observation carries the actual error.
const INVALID_TOOL_CALL_NAME: &str = "invalid_tool_call";

/// Convert internal Message format to the OpenAI chat completions message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = Map::new();
        converted.insert("role".to_string(), json!(message.role));

        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        converted.insert("content".to_string(), json!(text.text));
                    }
                }
                MessageContent::ToolRequest(request) => {
                    // Even a malformed request has to stay in the history, the model
                    // sees the error in the tool observation that answers it
                    let (name, arguments) = match &request.tool_call {
                        Ok(tool_call) => (
                            sanitize_function_name(&tool_call.name),
                            tool_call.arguments.to_string(),
                        ),
                        Err(_) => (INVALID_TOOL_CALL_NAME.to_string(), "{}".to_string()),
                    };
                    tool_calls.push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": arguments,
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let content = match &response.tool_result {
                        Ok(text) => text.clone(),
                        // A tool result error is shown as output so the model can interpret the error message
                        Err(e) => format!("The tool call returned the following error:\n{}", e),
                    };
                    output.push(json!({
                        "role": "tool",
                        "content": content,
                        "tool_call_id": response.id
                    }));
                }
            }
        }

        if !tool_calls.is_empty() {
            converted.insert("tool_calls".to_string(), json!(tool_calls));
        }

        if converted.contains_key("content") || converted.contains_key("tool_calls") {
            output.insert(0, Value::Object(converted));
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Build the request body shared by every OpenAI-compatible chat endpoint
pub fn create_openai_request_payload(
    model: &str,
    system: &str,
    messages: &[Message],
    tools: &[Tool],
    temperature: Option<f32>,
    max_tokens: Option<i32>,
) -> Result<Value> {
    let system_message = json!({
        "role": "system",
        "content": system
    });

    let mut messages_array = vec![system_message];
    messages_array.extend(messages_to_openai_spec(messages));

    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert("messages".to_string(), json!(messages_array));

    let tools_spec = tools_to_openai_spec(tools)?;
    if !tools_spec.is_empty() {
        payload.insert("tools".to_string(), json!(tools_spec));
    }
    if let Some(temp) = temperature {
        payload.insert("temperature".to_string(), json!(temp));
    }
    if let Some(tokens) = max_tokens {
        payload.insert("max_tokens".to_string(), json!(tokens));
    }

    Ok(Value::Object(payload))
}

/// Read the first choice of a chat completions response as an assistant message.
/// Unusable tool calls are kept as errored requests so the loop can answer them.
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let choice = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Response contained no choices: {}", response))?;

    let mut content = Vec::new();
    if let Some(text) = choice.get("content").and_then(Value::as_str) {
        content.push(MessageContent::text(text));
    }

    let tool_calls = choice
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for raw in tool_calls {
        let id = raw["id"].as_str().unwrap_or_default();
        content.push(MessageContent::tool_request(id, parse_tool_call(id, raw)));
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn parse_tool_call(id: &str, raw: &Value) -> AgentResult<ToolCall> {
    let name = raw["function"]["name"].as_str().unwrap_or_default();
    if !is_valid_function_name(name) {
        return Err(AgentError::ToolNotFound(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            name
        )));
    }

    // Some servers send an empty string for calls without arguments
    let arguments = raw["function"]["arguments"].as_str().unwrap_or_default();
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str::<Value>(arguments)
        .map(|params| ToolCall::new(name, params))
        .map_err(|e| {
            AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ))
        })
}

/// Read token usage from an OpenAI-style response; servers that omit it yield an empty Usage
pub fn get_openai_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok());

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok());

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input.saturating_add(output)),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}

pub fn chat_completions_url(host: &str) -> String {
    format!("{}/v1/chat/completions", host.trim_end_matches('/'))
}

/// Send a chat completions request under `retry` and return the decoded body.
/// Exhausted retryable statuses read as `Server error: <status>`.
pub async fn send_chat_request(retry: &RetryPolicy, request: RequestBuilder) -> Result<Value> {
    let response = retry.send(request).await?;
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response.json().await?);
    }
    if is_retryable_status(status) {
        return Err(anyhow!("Server error: {}", status));
    }

    let body = response.text().await.unwrap_or_default();
    let context_error = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|parsed| parsed.get("error").and_then(check_openai_context_length_error));
    match context_error {
        Some(err) => Err(err.into()),
        None => Err(anyhow!("Request failed: {}\nBody: {}", status, body)),
    }
}

/// Turn a chat completions body into the reply and its usage; some servers
/// report failures as a 200 with an `error` object
pub fn completion_from_response(response: Value) -> Result<(Message, Usage)> {
    if let Some(error) = response.get("error") {
        if let Some(err) = check_openai_context_length_error(error) {
            return Err(err.into());
        }
        return Err(anyhow!("Completion failed: {}", error));
    }

    let usage = get_openai_usage(&response);
    let message = openai_response_to_message(response)?;
    Ok((message, usage))
}

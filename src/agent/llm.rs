//! Chat completions client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol with function
//! tools. Any server implementing that protocol can be used through
//! `model.api_base`.

use crate::agent::tools::{FunctionCall, ToolCall, ToolDefinition};
use crate::config::{Credentials, ModelConfig};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Message in the chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Echo an assistant turn back into the history.
    pub fn assistant(turn: &AssistantTurn) -> Self {
        let tool_calls = if turn.tool_calls.is_empty() {
            None
        } else {
            Some(turn.tool_calls.iter().map(WireToolCall::from).collect())
        };

        Self {
            role: "assistant".to_string(),
            content: turn.content.clone(),
            tool_calls,
            tool_call_id: None,
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool call as it appears on the wire: arguments are a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: default_call_type(),
            function: WireFunction {
                name: call.function.name.clone(),
                arguments: call.function.arguments.to_string(),
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(wire: WireToolCall) -> Self {
        // Some models send an empty string for no-argument calls.
        let arguments = if wire.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&wire.function.arguments)
                .unwrap_or(Value::String(wire.function.arguments))
        };

        ToolCall {
            id: wire.id,
            function: FunctionCall {
                name: wire.function.name,
                arguments,
            },
        }
    }
}

/// One assistant reply: either tool calls, a final answer, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// A chat model that can call tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<AssistantTurn>;

    /// Model identifier, for reporting.
    fn model_name(&self) -> &str;
}

/// Chat completions API request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    temperature: f32,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

/// Chat completions API response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl ChatCompletionResponse {
    fn into_turn(self) -> Result<AssistantTurn> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::Llm("response contained no choices".to_string()))?;

        Ok(AssistantTurn {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCall::from)
                .collect(),
        })
    }
}

/// OpenAI-compatible chat client.
pub struct OpenAiChat {
    config: ModelConfig,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

fn completions_url(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

impl OpenAiChat {
    pub fn new(config: ModelConfig, credentials: &Credentials) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key: credentials.openai_api_key.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<AssistantTurn> {
        let url = completions_url(&self.config.api_base);

        let request = ChatCompletionRequest {
            model: &self.config.name,
            messages,
            tools,
            temperature: self.config.temperature,
        };

        debug!("Sending chat request with {} messages", messages.len());

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoutError::Llm(format!(
                    "Request timed out after {}s",
                    self.config.timeout_seconds
                ))
            } else if e.is_connect() {
                ScoutError::Llm(format!("Cannot connect to {}", self.config.api_base))
            } else {
                ScoutError::Llm(format!("Failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Llm(format!("API error {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::Llm(format!("Failed to parse response: {}", e)))?;

        completion.into_turn()
    }

    fn model_name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completions_url_ignores_trailing_slash() {
        assert_eq!(
            completions_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8000/v1"),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_decode_tool_call_response() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "get_top_companies_ranked",
                            "arguments": "{\"dimension\":\"revenue\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        let turn = response.into_turn().unwrap();

        assert_eq!(turn.content, None);
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].id, "call_abc");
        assert_eq!(turn.tool_calls[0].function.arguments, json!({"dimension": "revenue"}));
    }

    #[test]
    fn test_decode_final_answer() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "[\"AAA\"]"}}]
        });

        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        let turn = response.into_turn().unwrap();

        assert_eq!(turn.content.as_deref(), Some("[\"AAA\"]"));
        assert!(turn.tool_calls.is_empty());
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(response.into_turn(), Err(ScoutError::Llm(_))));
    }

    #[test]
    fn test_malformed_arguments_kept_as_string() {
        let wire = WireToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: WireFunction {
                name: "get_company_overview".to_string(),
                arguments: "{not json".to_string(),
            },
        };
        let call = ToolCall::from(wire);
        assert_eq!(call.function.arguments, Value::String("{not json".to_string()));
    }

    #[test]
    fn test_assistant_message_round_trips_arguments() {
        let turn = AssistantTurn {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                function: FunctionCall {
                    name: "get_company_overview".to_string(),
                    arguments: json!({"ticker": "BBCA", "country": "indonesia"}),
                },
            }],
        };

        let message = ChatMessage::assistant(&turn);
        let wire = message.tool_calls.unwrap();
        assert_eq!(wire[0].call_type, "function");
        let args: Value = serde_json::from_str(&wire[0].function.arguments).unwrap();
        assert_eq!(args["ticker"], "BBCA");
    }

    #[test]
    fn test_request_omits_empty_tools() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            tools: &[],
            temperature: 0.1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["messages"][0].get("tool_call_id").is_none());
    }
}

//! OpenAI-compatible chat completions over `reqwest`.
//!
//! Works with any endpoint exposing `/chat/completions` in the OpenAI wire
//! format: OpenRouter, Groq, OpenAI, vLLM, Ollama.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role, ToolCall,
    ToolCompletionRequest, ToolCompletionResponse, ToolDefinition,
};

/// Transport timeout for a single round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider for OpenAI-compatible endpoints.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: name.clone(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client,
        })
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, body: serde_json::Value) -> Result<ApiResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.name.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(LlmError::AuthFailed {
                provider: self.name.clone(),
            });
        }
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited {
                provider: self.name.clone(),
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(LlmError::RequestFailed {
                provider: self.name.clone(),
                reason: format!("HTTP {status}: {error_body}"),
            });
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                provider: self.name.clone(),
                reason: format!("Failed to parse response: {e}"),
            })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": to_api_messages(messages),
            "stream": false,
        });
        if let Some(t) = temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(m) = max_tokens {
            body["max_tokens"] = serde_json::json!(m);
        }
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(to_api_tools(tools));
        }
        body
    }

    fn first_choice(&self, response: ApiResponse) -> Result<(ApiChoice, ApiUsage, Option<String>), LlmError> {
        let usage = response.usage.unwrap_or_default();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.name.clone(),
                reason: "No choices in response".into(),
            })?;
        Ok((choice, usage, response.id))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.request_body(
            &request.messages,
            &[],
            request.temperature,
            request.max_tokens,
        );
        let (choice, usage, response_id) = self.first_choice(self.send(body).await?)?;

        let content = choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.name.clone(),
                reason: "Response message has no content".into(),
            })?;

        Ok(CompletionResponse {
            content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            response_id,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        debug!(
            provider = %self.name,
            tools = request.tools.len(),
            metadata = ?request.metadata,
            "Offering tools to model"
        );
        let body = self.request_body(
            &request.messages,
            &request.tools,
            request.temperature,
            request.max_tokens,
        );
        let (choice, usage, response_id) = self.first_choice(self.send(body).await?)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| from_api_tool_call(&self.name, tc))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ToolCompletionResponse {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            response_id,
        })
    }
}

fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: m.role.as_str().to_string(),
            content: match m.role {
                // Assistant turns that only call tools carry a null content.
                Role::Assistant if m.content.is_empty() && !m.tool_calls.is_empty() => None,
                _ => Some(m.content.clone()),
            },
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: m.tool_call_id.clone(),
        })
        .collect()
}

fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
    tools
        .iter()
        .map(|t| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

fn from_api_tool_call(provider: &str, tc: ApiToolCall) -> Result<ToolCall, LlmError> {
    let arguments = if tc.function.arguments.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&tc.function.arguments).map_err(|e| LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("Tool call '{}' has malformed arguments: {e}", tc.function.name),
        })?
    };
    let id = if tc.id.is_empty() {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    } else {
        tc.id
    };
    Ok(ToolCall {
        id,
        name: tc.function.name,
        arguments,
    })
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            "openrouter",
            "https://openrouter.ai/api/v1/",
            SecretString::from("sk-test"),
            "deepseek/deepseek-chat:free",
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        assert_eq!(provider().base_url(), "https://openrouter.ai/api/v1");
        assert_eq!(provider().model_name(), "deepseek/deepseek-chat:free");
    }

    #[test]
    fn request_body_includes_sampling_and_tools() {
        let tools = vec![ToolDefinition {
            name: "send_email".into(),
            description: "Write and send an email.".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let body = provider().request_body(
            &[ChatMessage::system("sys"), ChatMessage::user("hi")],
            &tools,
            Some(0.5),
            Some(200),
        );
        assert_eq!(body["model"], "deepseek/deepseek-chat:free");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "send_email");
    }

    #[test]
    fn request_body_omits_tools_when_empty() {
        let body = provider().request_body(&[ChatMessage::user("hi")], &[], None, None);
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn tool_call_messages_round_trip_to_wire_format() {
        let messages = vec![
            ChatMessage::assistant_with_tool_calls(
                None,
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "send_email".into(),
                    arguments: serde_json::json!({"to": "a@x.com"}),
                }],
            ),
            ChatMessage::tool_result("call_1", "send_email", "ok"),
        ];
        let api = to_api_messages(&messages);
        assert!(api[0].content.is_none());
        let calls = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"to":"a@x.com"}"#);
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn parses_tool_call_arguments_string() {
        let tc = ApiToolCall {
            id: "call_7".into(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "send_email".into(),
                arguments: r#"{"to":"sender@x","subject":"Re: hi","content":"Thanks"}"#.into(),
            },
        };
        let call = from_api_tool_call("test", tc).unwrap();
        assert_eq!(call.id, "call_7");
        assert_eq!(call.arguments["subject"], "Re: hi");
    }

    #[test]
    fn malformed_tool_arguments_are_invalid_response() {
        let tc = ApiToolCall {
            id: "call_8".into(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "send_email".into(),
                arguments: "{not json".into(),
            },
        };
        let err = from_api_tool_call("test", tc).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn missing_tool_call_id_is_generated() {
        let tc = ApiToolCall {
            id: String::new(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "send_email".into(),
                arguments: String::new(),
            },
        };
        let call = from_api_tool_call("test", tc).unwrap();
        assert!(call.id.starts_with("call_"));
        assert_eq!(call.arguments, serde_json::json!({}));
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = provider().first_choice(response).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_failed() {
        let provider = OpenAiCompatProvider::new(
            "local",
            "http://127.0.0.1:9",
            SecretString::from("k"),
            "m",
        )
        .unwrap();
        let err = provider
            .complete(CompletionRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}

//! OpenAI-compatible Chat Completions Provider
//!
//! One implementation of `LlmProvider` for every endpoint that speaks the
//! `/chat/completions` wire format: OpenRouter, OpenAI and Groq. Tools are
//! sent as native function declarations and the output contract, when the
//! endpoint supports it, as a `json_schema` response format.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Capabilities, Completion, CompletionRequest, FinishReason, LlmProvider, TokenUsage,
    },
    tool::ToolCall,
};
use async_trait::async_trait;
use serde_json::{Value, json};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Provider for OpenAI-compatible endpoints
#[derive(Clone, Debug)]
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    capabilities: Capabilities,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider for any compatible endpoint
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            capabilities: Capabilities {
                tools: true,
                structured_output: true,
            },
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, Some(api_key.into()))
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, Some(api_key.into()))
    }

    /// Groq supports tools but not schema-constrained output
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", GROQ_BASE_URL, Some(api_key.into())).with_capabilities(Capabilities {
            tools: true,
            structured_output: false,
        })
    }

    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Request timeout enforced by the HTTP client
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Converts a completion request into the wire payload
    fn build_payload(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(convert_message).collect();

        let mut payload = json!({
            "model": request.options.model,
            "messages": messages,
            "temperature": request.options.temperature,
            "top_p": request.options.top_p,
            "max_tokens": request.options.max_tokens,
        });

        if self.capabilities.tools && !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|schema| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": schema.name,
                            "description": schema.description,
                            "parameters": schema.parameters_json_schema(),
                        }
                    })
                })
                .collect();
            payload["tools"] = json!(tools);
        }

        if self.capabilities.structured_output {
            if let Some(format) = &request.response_format {
                payload["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": format.name,
                        "schema": format.schema,
                        "strict": false,
                    }
                });
            }
        }

        payload
    }

    /// Parses the response body into a completion
    fn parse_response(&self, body: &Value, requested_model: &str) -> Result<Completion> {
        let choice = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| self.protocol_error("missing or invalid 'choices' field in response"))?;

        let message = choice
            .get("message")
            .ok_or_else(|| self.protocol_error("missing 'message' field in choice"))?;

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                let function = call
                    .get("function")
                    .ok_or_else(|| self.protocol_error("missing 'function' in tool call"))?;
                let name = function
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| self.protocol_error("missing 'name' in tool call function"))?;

                // Arguments arrive as a JSON string or, on some gateways, an object
                let arguments = match function.get("arguments").cloned().unwrap_or(Value::Null) {
                    Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
                    other => other,
                };

                let mut tool_call = ToolCall::new(name, arguments);
                tool_call.id = call.get("id").and_then(Value::as_str).map(str::to_string);
                tool_calls.push(tool_call);
            }
        }

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(FinishReason::from_wire);

        let model = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(requested_model)
            .to_string();

        Ok(Completion {
            content,
            tool_calls,
            model,
            usage: parse_usage(body),
            finish_reason,
        })
    }

    fn protocol_error(&self, message: &str) -> AgentError {
        AgentError::Transport(format!("{}: {message}", self.name))
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn convert_message(message: &Message) -> Value {
    match message.role {
        Role::System | Role::User => json!({
            "role": message.role.to_string(),
            "content": message.content,
        }),
        Role::Assistant => {
            let mut value = json!({
                "role": "assistant",
                "content": message.content,
            });
            if !message.tool_calls.is_empty() {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": Value::Object(call.arguments.clone()).to_string(),
                            }
                        })
                    })
                    .collect();
                value["tool_calls"] = json!(calls);
            }
            value
        }
        Role::Tool => json!({
            "role": "tool",
            "content": message.content,
            "tool_call_id": message.tool_call_id,
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_usage(body: &Value) -> Option<TokenUsage> {
    let usage = body.get("usage")?;
    let count = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
    Some(TokenUsage {
        prompt_tokens: count("prompt_tokens"),
        completion_tokens: count("completion_tokens"),
        total_tokens: count("total_tokens"),
    })
}

/// Maps an HTTP failure status onto the error taxonomy
pub(crate) fn status_error(provider: &str, status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::Auth(format!("{provider} rejected the API key")),
        429 => AgentError::RateLimited(format!("{provider}: {body}")),
        500..=599 => AgentError::ProviderUnavailable(format!("{provider} HTTP {status}: {body}")),
        _ => AgentError::Transport(format!("{provider} HTTP {status}: {body}")),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                tracing::warn!(provider = %self.name, status = %response.status(), "Health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(provider = %self.name, error = %e, "Health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let payload = self.build_payload(request);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            provider = %self.name,
            model = %request.options.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion"
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("{}: {e}", self.name)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(&self.name, status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Transport(format!("{}: invalid response body: {e}", self.name)))?;

        self.parse_response(&body, &request.options.model)
    }
}

#[cfg(test)]
mod tests {
    use agent_core::provider::{GenerationOptions, ResponseFormat};
    use agent_core::tool::{ParameterSchema, ToolSchema};

    use super::*;

    fn add_schema() -> ToolSchema {
        ToolSchema {
            name: "add".into(),
            description: "Add two numbers".into(),
            parameters: vec![
                ParameterSchema::required("a", "number", "First"),
                ParameterSchema::required("b", "number", "Second"),
            ],
            category: None,
            has_side_effects: false,
        }
    }

    fn request() -> CompletionRequest {
        let call = ToolCall::new("add", json!({"a": 1, "b": 2})).with_id("call-1");
        CompletionRequest::new(
            vec![
                Message::system("Guide the assistant"),
                Message::user("Hello"),
                Message::assistant_with_tools("", vec![call.clone()]),
                Message::tool("[Tool 'add' returned]\n3", &call),
            ],
            GenerationOptions::for_model("gpt-test"),
        )
        .with_tools(vec![add_schema()])
        .with_response_format(ResponseFormat {
            name: "Answer".into(),
            schema: json!({"type": "object"}),
        })
    }

    #[test]
    fn test_build_payload_serializes_messages_tools_and_schema() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        let payload = provider.build_payload(&request());

        assert_eq!(payload["model"], "gpt-test");
        assert_eq!(payload["max_tokens"], 2048);

        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call-1");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"a":1,"b":2}"#
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call-1");

        assert_eq!(payload["tools"][0]["function"]["name"], "add");
        assert_eq!(
            payload["tools"][0]["function"]["parameters"]["required"],
            json!(["a", "b"])
        );
        assert_eq!(payload["response_format"]["json_schema"]["name"], "Answer");
    }

    #[test]
    fn test_groq_omits_response_format() {
        let payload = OpenAiCompatProvider::groq("gsk-test").build_payload(&request());
        assert!(payload.get("response_format").is_none());
        assert!(payload["tools"].is_array());
    }

    #[test]
    fn test_parse_response_extracts_text_and_tool_calls() {
        let provider = OpenAiCompatProvider::openrouter("sk-or-test");
        let body = json!({
            "model": "anthropic/claude-sonnet-4",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call-1", "function": {"name": "add", "arguments": "{\"a\":2,\"b\":3}"}},
                        {"id": "call-2", "function": {"name": "add", "arguments": {"a": 4, "b": 5}}}
                    ]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        let completion = provider.parse_response(&body, "fallback").unwrap();
        assert_eq!(completion.content, "");
        assert_eq!(completion.model, "anthropic/claude-sonnet-4");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[0].id.as_deref(), Some("call-1"));
        assert_eq!(completion.tool_calls[1].arg_i64("b").unwrap(), 5);
        assert_eq!(completion.usage, Some(TokenUsage::new(10, 5)));
    }

    #[test]
    fn test_parse_response_missing_choices_is_transport_error() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        let err = provider.parse_response(&json!({}), "gpt-4o").unwrap_err();
        assert!(matches!(err, AgentError::Transport(msg) if msg.starts_with("openai")));
    }

    #[test]
    fn test_maps_http_statuses() {
        assert!(matches!(status_error("openai", 401, ""), AgentError::Auth(_)));
        assert!(matches!(status_error("openai", 429, ""), AgentError::RateLimited(_)));
        assert!(matches!(
            status_error("openai", 503, ""),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(status_error("openai", 400, "bad"), AgentError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = OpenAiCompatProvider::new("local", "http://127.0.0.1:9", None)
            .with_timeout(Duration::from_secs(2));
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!provider.health_check().await.unwrap());
    }
}

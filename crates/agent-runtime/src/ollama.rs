//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Tools and the
//! output contract travel in the system prompt; `json_mode` additionally
//! asks the server to emit JSON only.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Capabilities, Completion, CompletionRequest, GenerationOptions, LlmProvider},
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::{
        chat::{ChatMessage, MessageRole, request::ChatMessageRequest},
        parameters::FormatType,
    },
    models::ModelOptions,
};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Ask the server for JSON-only output
    pub json_mode: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            json_mode: false,
        }
    }
}

impl OllamaConfig {
    /// Reads `OLLAMA_HOST` and `OLLAMA_PORT`; a host may carry its own port
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            let host = if host.contains("://") {
                host
            } else {
                format!("http://{host}")
            };
            match split_port(&host) {
                Some((base, port)) => {
                    config.host = base.to_string();
                    config.port = port;
                }
                None => config.host = host,
            }
        }
        if let Some(port) = std::env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        config
    }
}

/// `http://host:1234` → (`http://host`, 1234)
fn split_port(url: &str) -> Option<(&str, u16)> {
    let scheme_end = url.find("://")? + 3;
    let (base, port) = url.rsplit_once(':')?;
    if base.len() < scheme_end {
        return None;
    }
    port.trim_end_matches('/').parse().ok().map(|p| (base, p))
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Convert agent messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                    // Tool results come back through the text protocol
                    Role::Tool => MessageRole::User,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut chat = ChatMessageRequest::new(
            request.options.model.clone(),
            Self::convert_messages(&request.messages),
        )
        .options(Self::build_options(&request.options));

        if self.config.json_mode {
            chat = chat.format(FormatType::Json);
        }

        tracing::debug!(
            host = %self.config.host,
            model = %request.options.model,
            messages = request.messages.len(),
            "Sending Ollama chat"
        );

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(|e| AgentError::Transport(format!("ollama: {e}")))?;

        Ok(Completion::text(
            request.options.model.clone(),
            response.message.content,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert!(!config.json_mode);
    }

    #[test]
    fn test_splits_port_from_host() {
        assert_eq!(
            split_port("http://gpu-box:11500"),
            Some(("http://gpu-box", 11500))
        );
        assert_eq!(split_port("http://gpu-box"), None);
        assert_eq!(split_port("https://ollama.internal:443/"), Some(("https://ollama.internal", 443)));
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::assistant("Hi"),
        ];

        let converted = OllamaProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2].content, "Hi");
    }

    #[test]
    fn test_relies_on_prompt_for_tools_and_contract() {
        let provider = OllamaProvider::localhost();
        assert_eq!(provider.capabilities(), Capabilities::default());
    }
}

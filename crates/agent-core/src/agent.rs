//! Agent Instance and Invocation Loop
//!
//! An [`Agent`] wraps one model endpoint with a role description, an
//! optional tool registry and exactly one [`OutputContract`]. A call to
//! [`Agent::invoke`] sends the request, runs the model's tool-use loop to
//! completion and tries to read the final answer as the contract.
//!
//! The outcome is an [`InvocationResult`]: a parsed [`StructuredOutput`], or
//! the raw text when the answer did not fit the contract. Only endpoint
//! failures surface as errors.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::contract::{OutputContract, StructuredOutput, extract_json_object};
use crate::error::{AgentError, Result};
use crate::memory::ConversationMemory;
use crate::message::Message;
use crate::provider::{
    Capabilities, Completion, CompletionRequest, GenerationOptions, LlmProvider, ResponseFormat,
    TokenUsage,
};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

/// Loop and generation settings
#[derive(Clone, Debug)]
pub struct AgentSettings {
    /// Tool-use rounds allowed before the last answer is taken as final
    pub max_tool_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to describe tools in the system prompt for providers
    /// without native function calling
    pub inject_tool_descriptions: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

/// Outcome of one invocation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InvocationResult {
    /// The answer matched the output contract
    Structured(StructuredOutput),
    /// The answer could not be read as the contract; raw text preserved
    Unstructured(String),
}

impl InvocationResult {
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub const fn structured(&self) -> Option<&StructuredOutput> {
        match self {
            Self::Structured(output) => Some(output),
            Self::Unstructured(_) => None,
        }
    }

    pub fn into_structured(self) -> Option<StructuredOutput> {
        match self {
            Self::Structured(output) => Some(output),
            Self::Unstructured(_) => None,
        }
    }

    /// Raw text of an unstructured answer
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Unstructured(text) => Some(text),
        }
    }
}

/// One tool call made during an invocation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolStep {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Full record of an invocation
#[derive(Clone, Debug, Serialize)]
pub struct Invocation {
    pub id: Uuid,
    pub result: InvocationResult,
    /// Tool calls in execution order
    pub tool_trace: Vec<ToolStep>,
    pub usage: TokenUsage,
    /// Number of tool-use rounds the model took
    pub rounds: usize,
    /// Model reported by the endpoint for the final answer
    pub model: String,
}

/// The main Agent struct
///
/// Immutable after construction. Cloning is cheap and clones share the
/// provider, tools and memory.
#[derive(Clone)]
pub struct Agent {
    name: String,
    provider: Arc<dyn LlmProvider>,
    instructions: Vec<String>,
    tools: Arc<ToolRegistry>,
    contract: OutputContract,
    config: Config,
    memory: Option<Arc<dyn ConversationMemory>>,
    settings: AgentSettings,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("model", &self.settings.generation.model)
            .field("tools", &self.tools)
            .field("contract", &self.contract.name())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn contract(&self) -> &OutputContract {
        &self.contract
    }

    /// Resolved configuration this agent was built with
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn model(&self) -> &str {
        &self.settings.generation.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// System prompt as sent to the current provider
    pub fn system_prompt(&self) -> String {
        self.build_system_prompt(self.provider.capabilities())
    }

    /// Build the full system prompt: instructions, then whatever the
    /// provider cannot take natively
    fn build_system_prompt(&self, caps: Capabilities) -> String {
        let mut sections = Vec::with_capacity(3);

        let role = self.instructions.join("\n");
        if !role.is_empty() {
            sections.push(role);
        }
        if self.settings.inject_tool_descriptions && !caps.tools && !self.tools.is_empty() {
            sections.push(self.tools.generate_prompt_section());
        }
        if !caps.structured_output {
            sections.push(self.contract.prompt_section());
        }

        sections.join("\n\n")
    }

    /// Send one request and return the outcome
    pub async fn invoke(&self, request: &str) -> Result<InvocationResult> {
        self.run(request).await.map(|invocation| invocation.result)
    }

    /// Like [`invoke`](Self::invoke), keeping the tool trace and usage
    pub async fn run(&self, request: &str) -> Result<Invocation> {
        let id = Uuid::new_v4();
        let caps = self.provider.capabilities();

        let mut messages = vec![Message::system(self.build_system_prompt(caps))];
        if let Some(memory) = &self.memory {
            messages.extend(memory.history());
        }
        messages.push(Message::user(request));

        let mut completion_request =
            CompletionRequest::new(messages, self.settings.generation.clone());
        if caps.tools {
            completion_request.tools = self.tools.schemas();
        }
        if caps.structured_output {
            completion_request.response_format = Some(ResponseFormat {
                name: self.contract.name().to_string(),
                schema: self.contract.json_schema(),
            });
        }

        tracing::debug!(
            invocation = %id,
            agent = %self.name,
            provider = self.provider.name(),
            model = %self.settings.generation.model,
            prompt_tokens = self.provider.estimate_tokens(&completion_request.messages[0].content),
            "Invoking agent"
        );

        let mut usage = TokenUsage::default();
        let mut tool_trace = Vec::new();
        let mut rounds = 0;

        let completion = loop {
            let completion = self.provider.complete(&completion_request).await?;
            if let Some(u) = &completion.usage {
                usage.add(u);
            }

            let calls = self.tool_calls_of(&completion);
            if calls.is_empty() {
                break completion;
            }
            if rounds >= self.settings.max_tool_rounds {
                tracing::warn!(
                    invocation = %id,
                    max_rounds = self.settings.max_tool_rounds,
                    "Tool round limit reached, taking last answer as final"
                );
                break completion;
            }
            rounds += 1;

            completion_request
                .messages
                .push(Message::assistant_with_tools(&completion.content, calls.clone()));

            for call in calls {
                let result = self.execute_tool(&call).await;
                completion_request
                    .messages
                    .push(Message::tool(result.to_message(), &call));
                tool_trace.push(ToolStep { call, result });
            }
        };

        let result = match self.contract.parse(&completion.content) {
            Ok(output) => InvocationResult::Structured(output),
            Err(mismatch) => {
                tracing::warn!(
                    invocation = %id,
                    contract = self.contract.name(),
                    path = %mismatch.path,
                    reason = %mismatch.reason,
                    "Response did not match contract, returning raw text"
                );
                InvocationResult::Unstructured(completion.content.clone())
            }
        };

        if let Some(memory) = &self.memory {
            memory.append_exchange(Message::user(request), Message::assistant(&completion.content));
        }

        Ok(Invocation {
            id,
            result,
            tool_trace,
            usage,
            rounds,
            model: completion.model,
        })
    }

    /// Tool calls requested by a completion: native calls first, then the
    /// fenced text protocol
    fn tool_calls_of(&self, completion: &Completion) -> Vec<ToolCall> {
        let mut calls = if completion.tool_calls.is_empty() {
            if self.tools.is_empty() {
                return Vec::new();
            }
            self.parse_tool_calls(&completion.content)
        } else {
            completion.tool_calls.clone()
        };

        for call in &mut calls {
            if call.id.is_none() {
                call.id = Some(Uuid::new_v4().to_string());
            }
        }
        calls
    }

    /// Parse ```tool blocks from LLM response
    fn parse_tool_calls(&self, content: &str) -> Vec<ToolCall> {
        const TOOL_START: &str = "```tool";
        const TOOL_END: &str = "```";

        let mut calls = Vec::new();
        let mut rest = content;
        while let Some(start_idx) = rest.find(TOOL_START) {
            let after_marker = &rest[start_idx + TOOL_START.len()..];
            let Some(end_idx) = after_marker.find(TOOL_END) else {
                break;
            };
            match serde_json::from_str::<ToolCall>(after_marker[..end_idx].trim()) {
                Ok(call) => calls.push(call),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed tool block"),
            }
            rest = &after_marker[end_idx + TOOL_END.len()..];
        }

        if calls.is_empty() {
            calls.extend(self.parse_inline_tool_call(content));
        }
        calls
    }

    /// Bare `{"tool": ..., "arguments": ...}` object naming a registered tool
    fn parse_inline_tool_call(&self, content: &str) -> Option<ToolCall> {
        if !content.contains(r#""tool""#) {
            return None;
        }

        let value = extract_json_object(content)?;
        let name = value.get("tool").and_then(Value::as_str)?;
        if !value.get("arguments").is_some_and(Value::is_object) || self.tools.get(name).is_none() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Execute a tool call; failures become a failed result for the model
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, id = ?call.id, "Executing tool");

        let mut result = match self.tools.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %call.name, error = %e, "Tool failed");
                ToolResult::failure(&call.name, format!("Error: {e}"))
            }
        };
        result.id.clone_from(&call.id);
        result
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    name: String,
    provider: Option<Arc<dyn LlmProvider>>,
    instructions: Vec<String>,
    tools: ToolRegistry,
    contract: Option<OutputContract>,
    config: Config,
    memory: Option<Arc<dyn ConversationMemory>>,
    settings: AgentSettings,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: "Agent".into(),
            provider: None,
            instructions: Vec::new(),
            tools: ToolRegistry::new(),
            contract: None,
            config: Config::new(),
            memory: None,
            settings: AgentSettings::default(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn instruction(mut self, line: impl Into<String>) -> Self {
        self.instructions.push(line.into());
        self
    }

    #[must_use]
    pub fn instructions<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions.extend(lines.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn contract(mut self, contract: OutputContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Resolved configuration (see [`crate::config::resolve`])
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.settings.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.settings.generation.temperature = temp;
        self
    }

    #[must_use]
    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.settings.generation = generation;
        self
    }

    #[must_use]
    pub const fn max_tool_rounds(mut self, max: usize) -> Self {
        self.settings.max_tool_rounds = max;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let contract = self
            .contract
            .ok_or_else(|| AgentError::Config("Output contract is required".into()))?;

        Ok(Agent {
            name: self.name,
            provider,
            instructions: self.instructions,
            tools: Arc::new(self.tools),
            contract,
            config: self.config,
            memory: self.memory,
            settings: self.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::contract::FieldSpec;
    use crate::memory::InMemoryConversation;
    use crate::message::Role;
    use crate::stub::ScriptedProvider;
    use crate::tool::{FunctionTool, ParameterSchema};

    fn answer_contract() -> OutputContract {
        OutputContract::builder("Answer")
            .field(FieldSpec::string("answer", "The answer"))
            .build()
            .unwrap()
    }

    fn failing_tool() -> FunctionTool {
        FunctionTool::new("lookup", "Look something up", vec![], |_| {
            Err(AgentError::ToolExecution("service offline".into()))
        })
    }

    fn agent_with(provider: Arc<ScriptedProvider>) -> AgentBuilder {
        Agent::builder()
            .name("Tester")
            .provider(provider)
            .instructions(["You are a tester.", "Be brief."])
            .contract(answer_contract())
    }

    #[test]
    fn test_agent_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Agent>();
    }

    #[test]
    fn test_builder_requires_provider_and_contract() {
        let missing_contract = Agent::builder()
            .provider(Arc::new(ScriptedProvider::new()))
            .build();
        assert!(matches!(missing_contract, Err(AgentError::Config(_))));

        let missing_provider = Agent::builder().contract(answer_contract()).build();
        assert!(matches!(missing_provider, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_system_prompt_joins_instructions_and_adds_fallback_sections() {
        let provider = Arc::new(ScriptedProvider::new());
        let agent = agent_with(provider).tool(failing_tool()).build().unwrap();

        let prompt = agent.system_prompt();
        assert!(prompt.starts_with("You are a tester.\nBe brief.\n\n"));
        assert!(prompt.contains("## Available Tools"));
        assert!(prompt.contains("## Response Format"));
    }

    #[test]
    fn test_native_capabilities_keep_prompt_to_instructions() {
        let provider = Arc::new(ScriptedProvider::new().with_capabilities(Capabilities {
            tools: true,
            structured_output: true,
        }));
        let agent = agent_with(provider).tool(failing_tool()).build().unwrap();
        assert_eq!(agent.system_prompt(), "You are a tester.\nBe brief.");
    }

    #[tokio::test]
    async fn test_native_tools_and_schema_are_sent_with_request() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_capabilities(Capabilities {
                    tools: true,
                    structured_output: true,
                })
                .reply_tool_calls(vec![ToolCall::new("lookup", json!({})).with_id("call_9")])
                .reply(r#"{"answer": "gave up"}"#),
        );
        let agent = agent_with(Arc::clone(&provider))
            .tool(failing_tool())
            .build()
            .unwrap();

        let invocation = agent.run("find it").await.unwrap();
        assert_eq!(invocation.rounds, 1);
        assert_eq!(
            invocation.result.structured().and_then(|o| o.str("answer")),
            Some("gave up")
        );

        let requests = provider.requests();
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(
            requests[0].response_format.as_ref().map(|f| f.name.as_str()),
            Some("Answer")
        );

        let tool_message = requests[1].messages.last().unwrap();
        assert_eq!(tool_message.role, Role::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_9"));
        assert!(tool_message.content.starts_with("[Tool 'lookup' failed]"));
        assert!(tool_message.content.contains("service offline"));
        assert!(!invocation.tool_trace[0].result.success);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_back_to_model() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply("```tool\n{\"tool\": \"teleport\", \"arguments\": {}}\n```")
                .reply(r#"{"answer": "no such tool"}"#),
        );
        let agent = agent_with(Arc::clone(&provider))
            .tool(failing_tool())
            .build()
            .unwrap();

        let result = agent.invoke("go").await.unwrap();
        assert!(result.is_structured());

        let requests = provider.requests();
        let feedback = &requests[1].messages.last().unwrap().content;
        assert!(feedback.contains("Tool not found: teleport"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("connection refused"));
        let agent = agent_with(provider).build().unwrap();

        let err = agent.invoke("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_round_limit_takes_last_answer() {
        let call = "```tool\n{\"tool\": \"lookup\", \"arguments\": {}}\n```";
        let provider = Arc::new(ScriptedProvider::repeating(call));
        let agent = agent_with(Arc::clone(&provider))
            .tool(failing_tool())
            .max_tool_rounds(2)
            .build()
            .unwrap();

        let invocation = agent.run("loop").await.unwrap();
        assert_eq!(invocation.rounds, 2);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(invocation.result.text(), Some(call));
    }

    #[tokio::test]
    async fn test_inline_json_with_tool_field_is_not_a_call_for_unknown_tools() {
        let provider = Arc::new(ScriptedProvider::new().reply(r#"{"answer": "a", "tool": "hammer", "arguments": {}}"#));
        let agent = agent_with(Arc::clone(&provider))
            .tool(failing_tool())
            .build()
            .unwrap();

        let result = agent.invoke("q").await.unwrap();
        assert_eq!(result.structured().and_then(|o| o.str("answer")), Some("a"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_receives_turns_and_feeds_history() {
        let memory = Arc::new(InMemoryConversation::new());
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply(r#"{"answer": "first"}"#)
                .reply(r#"{"answer": "second"}"#),
        );
        let agent = agent_with(Arc::clone(&provider))
            .memory(memory.clone())
            .build()
            .unwrap();

        agent.invoke("one").await.unwrap();
        agent.invoke("two").await.unwrap();

        assert_eq!(memory.len(), 4);
        let second = &provider.requests()[1];
        let roles: Vec<Role> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(second.messages[2].content, r#"{"answer": "first"}"#);
    }

    #[tokio::test]
    async fn test_function_tool_arguments_reach_handler() {
        let echo = FunctionTool::new(
            "echo",
            "Echo text",
            vec![ParameterSchema::required("text", "string", "Text to echo")],
            |call| Ok(call.arg_str("text")?.to_uppercase()),
        );
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply("Calling.\n```tool\n{\"tool\": \"echo\", \"arguments\": {\"text\": \"hi\"}}\n```")
                .reply(r#"{"answer": "HI"}"#),
        );
        let agent = agent_with(provider).tool(echo).build().unwrap();

        let invocation = agent.run("shout").await.unwrap();
        assert_eq!(invocation.tool_trace.len(), 1);
        assert_eq!(invocation.tool_trace[0].result.output, "HI");
        assert!(invocation.tool_trace[0].call.id.is_some());
    }
}

//! Scripted Provider
//!
//! Deterministic model endpoint that replays queued completions. Used by
//! tests and by the offline demo mode; it never touches the network.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::provider::{Capabilities, Completion, CompletionRequest, LlmProvider, TokenUsage};
use crate::tool::ToolCall;

const STUB_MODEL: &str = "scripted";

#[derive(Clone, Debug)]
enum Step {
    Reply(Completion),
    Fail(String),
}

/// Replays a fixed script of completions and records every request
#[derive(Debug)]
pub struct ScriptedProvider {
    capabilities: Capabilities,
    script: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    /// Empty script, text tool protocol, no native structured mode
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::default(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same text for every call
    pub fn repeating(content: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.fallback = Some(Step::Reply(reply(content.into())));
        provider
    }

    /// Every call fails with a transport error
    pub fn failing(message: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.fallback = Some(Step::Fail(message.into()));
        provider
    }

    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Queue a text reply
    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Step::Reply(reply(content.into())))
    }

    /// Queue a native tool-call reply
    #[must_use]
    pub fn reply_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.push(Step::Reply(Completion::with_tool_calls(STUB_MODEL, calls)))
    }

    /// Queue an arbitrary completion
    #[must_use]
    pub fn completion(self, completion: Completion) -> Self {
        self.push(Step::Reply(completion))
    }

    /// Queue a transport failure
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    fn push(mut self, step: Step) -> Self {
        self.script
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queued steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn reply(content: String) -> Completion {
    let mut completion = Completion::text(STUB_MODEL, content);
    #[allow(clippy::cast_possible_truncation)]
    let tokens = (completion.content.len() / 4) as u32;
    completion.usage = Some(TokenUsage::new(0, tokens));
    completion
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        STUB_MODEL
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .or_else(|| self.fallback.clone());

        match next {
            Some(Step::Reply(completion)) => Ok(completion),
            Some(Step::Fail(message)) => Err(AgentError::Transport(message)),
            None => Err(AgentError::Transport("scripted provider has no replies left".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::provider::GenerationOptions;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![Message::user(text)], GenerationOptions::default())
    }

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let provider = ScriptedProvider::new().reply("one").reply("two");

        assert_eq!(provider.complete(&request("a")).await.unwrap().content, "one");
        assert_eq!(provider.complete(&request("b")).await.unwrap().content, "two");
        assert!(matches!(
            provider.complete(&request("c")).await,
            Err(AgentError::Transport(_))
        ));

        let seen: Vec<_> = provider
            .requests()
            .iter()
            .filter_map(|r| r.last_user_message().map(str::to_string))
            .collect();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_repeating_never_runs_out() {
        let provider = ScriptedProvider::repeating("same");
        for _ in 0..3 {
            assert_eq!(provider.complete(&request("q")).await.unwrap().content, "same");
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_reports_transport_errors() {
        let provider = ScriptedProvider::failing("connection refused");
        let err = provider.complete(&request("q")).await.unwrap_err();
        assert!(err.is_transport());
    }
}

//! # agent-core
//!
//! Single-shot structured agents: one model call wrapped with a role
//! description, optional tools and a declared output contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │   Config    │  │    Tools    │  │    LlmProvider       │  │
//! │  │  (resolve)  │  │  Registry   │──│    (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘  │
//! │                 ┌──────────────────┐                          │
//! │  request ──────▶│  invoke (loop)   │──▶ OutputContract::parse │
//! │                 └──────────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between hosted endpoints,
//! a local Ollama server or the scripted stub without changing agent logic.

pub mod agent;
pub mod config;
pub mod contract;
pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod report;
pub mod stub;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentSettings, Invocation, InvocationResult, ToolStep};
pub use config::{Config, ConfigValue, resolve};
pub use contract::{
    Bounds, BoundsPolicy, ContractBuilder, FieldSpec, FieldType, OutputContract, StructuredOutput,
};
pub use error::{AgentError, Result, SchemaMismatch};
pub use memory::{ConversationMemory, InMemoryConversation, Lesson, LessonStore, MemoryLessonStore};
pub use message::{Message, Role};
pub use provider::{
    Capabilities, Completion, CompletionRequest, GenerationOptions, LlmProvider, ModelRef,
    TokenUsage,
};
pub use report::{Finding, ReportSpec};
pub use stub::ScriptedProvider;
pub use tool::{FunctionTool, ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};

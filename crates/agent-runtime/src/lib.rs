//! # agent-runtime
//!
//! Model endpoints and the plumbing around them.
//!
//! ## Providers
//!
//! - **OpenRouter** (default), **OpenAI**, **Groq**: OpenAI-compatible chat
//!   completions with native tools and JSON-schema output
//! - **Ollama**: local inference via `ollama-rs` (feature `ollama`, on by default)
//!
//! Decorators [`RateLimitedProvider`] and [`CachingProvider`] wrap any of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::catalog::{build_provider, ProviderKind};
//!
//! let resolved = build_provider(ProviderKind::OpenRouter, None)?;
//! let agent = Agent::builder()
//!     .provider(resolved.provider)
//!     .model(resolved.model.model)
//!     .contract(contract)
//!     .build()?;
//! ```

pub mod cache;
pub mod catalog;
pub mod credentials;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;
pub mod throttle;

pub use cache::{CachingProvider, ResponseCache};
pub use catalog::{ProviderKind, ResolvedProvider, build_provider, check_api_key, list_providers};
#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatProvider;
pub use throttle::{RateLimitedProvider, RateLimiter};

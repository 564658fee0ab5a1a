//! Provider Catalog
//!
//! The supported model endpoints, their default models and the environment
//! each needs. [`build_provider`] turns a provider choice (and an optional
//! model override) into a ready `LlmProvider`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use agent_core::{
    error::{AgentError, Result},
    provider::{Capabilities, LlmProvider, ModelRef},
};

use crate::credentials;
use crate::openai::OpenAiCompatProvider;

/// Supported model endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenRouter,
    OpenAi,
    Groq,
    Ollama,
}

/// Static description of a provider
#[derive(Clone, Copy, Debug)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub name: &'static str,
    pub default_model: &'static str,
    /// Variable holding the API key; `None` for local endpoints
    pub api_key_env: Option<&'static str>,
    pub description: &'static str,
    pub capabilities: Capabilities,
}

const NATIVE: Capabilities = Capabilities {
    tools: true,
    structured_output: true,
};

static PROVIDERS: [ProviderSpec; 4] = [
    ProviderSpec {
        kind: ProviderKind::OpenRouter,
        name: "openrouter",
        default_model: "anthropic/claude-sonnet-4",
        api_key_env: Some("OPENROUTER_API_KEY"),
        description: "Multi-model access - Claude, GPT, Llama via OpenRouter",
        capabilities: NATIVE,
    },
    ProviderSpec {
        kind: ProviderKind::OpenAi,
        name: "openai",
        default_model: "gpt-4o",
        api_key_env: Some("OPENAI_API_KEY"),
        description: "OpenAI GPT models",
        capabilities: NATIVE,
    },
    ProviderSpec {
        kind: ProviderKind::Groq,
        name: "groq",
        default_model: "llama-3.3-70b-versatile",
        api_key_env: Some("GROQ_API_KEY"),
        description: "Fast inference via Groq",
        capabilities: Capabilities {
            tools: true,
            structured_output: false,
        },
    },
    ProviderSpec {
        kind: ProviderKind::Ollama,
        name: "ollama",
        default_model: "llama3.2",
        api_key_env: None,
        description: "Local models via Ollama",
        capabilities: Capabilities {
            tools: false,
            structured_output: false,
        },
    },
];

impl ProviderKind {
    pub const DEFAULT: Self = Self::OpenRouter;

    pub const ALL: [Self; 4] = [Self::OpenRouter, Self::OpenAi, Self::Groq, Self::Ollama];

    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            Self::OpenRouter => &PROVIDERS[0],
            Self::OpenAi => &PROVIDERS[1],
            Self::Groq => &PROVIDERS[2],
            Self::Ollama => &PROVIDERS[3],
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn default_model(self) -> &'static str {
        self.spec().default_model
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let available: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                AgentError::Config(format!(
                    "Unknown provider: '{s}'. Available: {}",
                    available.join(", ")
                ))
            })
    }
}

/// Provider name → description, in catalog order
pub fn list_providers() -> Vec<(&'static str, &'static str)> {
    PROVIDERS.iter().map(|p| (p.name, p.description)).collect()
}

/// Whether the provider's key is set, and the variable it is read from.
/// Local providers always report available.
pub fn check_api_key(kind: ProviderKind) -> (bool, Option<&'static str>) {
    let spec = kind.spec();
    match spec.api_key_env {
        Some(env_var) => (
            credentials::check_api_available(spec.name).is_available(),
            Some(env_var),
        ),
        None => (true, None),
    }
}

/// A constructed endpoint and the model it will be asked for
#[derive(Clone)]
pub struct ResolvedProvider {
    pub provider: Arc<dyn LlmProvider>,
    pub model: ModelRef,
}

impl fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Build a provider, failing early with the variable to set when its key
/// is missing
pub fn build_provider(kind: ProviderKind, model: Option<&str>) -> Result<ResolvedProvider> {
    let model_id = model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(kind.default_model());

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Ollama => ollama_provider()?,
        _ => {
            let key = credentials::get_api_key(kind.name(), true)?.unwrap_or_default();
            match kind {
                ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::openai(key)),
                ProviderKind::Groq => Arc::new(OpenAiCompatProvider::groq(key)),
                _ => Arc::new(OpenAiCompatProvider::openrouter(key)),
            }
        }
    };

    tracing::info!(provider = %kind, model = model_id, "Selected model provider");

    Ok(ResolvedProvider {
        provider,
        model: ModelRef::new(kind.name(), model_id),
    })
}

#[cfg(feature = "ollama")]
fn ollama_provider() -> Result<Arc<dyn LlmProvider>> {
    Ok(Arc::new(crate::ollama::OllamaProvider::from_env()))
}

#[cfg(not(feature = "ollama"))]
fn ollama_provider() -> Result<Arc<dyn LlmProvider>> {
    Err(AgentError::Config(
        "Ollama support is disabled; rebuild with the `ollama` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_provider_names() {
        assert_eq!("OpenRouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert_eq!(" groq ".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);

        let err = "cerebras".parse::<ProviderKind>().unwrap_err();
        assert!(err.to_string().contains("openrouter, openai, groq, ollama"));
    }

    #[test]
    fn test_catalog_matches_specs() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.spec().kind, kind);
        }
        assert_eq!(ProviderKind::DEFAULT.default_model(), "anthropic/claude-sonnet-4");
        assert_eq!(list_providers().len(), 4);
        assert!(!ProviderKind::Groq.spec().capabilities.structured_output);
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        assert_eq!(check_api_key(ProviderKind::Ollama), (true, None));
        assert_eq!(check_api_key(ProviderKind::OpenAi).1, Some("OPENAI_API_KEY"));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_builds_ollama_with_model_override() {
        let resolved = build_provider(ProviderKind::Ollama, Some("qwen2.5")).unwrap();
        assert_eq!(resolved.model.to_string(), "ollama:qwen2.5");
        assert_eq!(resolved.provider.name(), "ollama");

        let default = build_provider(ProviderKind::Ollama, Some("  ")).unwrap();
        assert_eq!(default.model.model, "llama3.2");
    }

    #[test]
    fn test_missing_key_fails_before_any_request() {
        if std::env::var_os("GROQ_API_KEY").is_some() {
            return;
        }
        let err = build_provider(ProviderKind::Groq, None).unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { env_var, .. } if env_var == "GROQ_API_KEY"));
    }
}

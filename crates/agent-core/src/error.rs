//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// A model response that could not be coerced into an output contract.
///
/// `path` points at the offending field using dotted/indexed notation
/// (`company.recent_news[2]`); it is `$` when the whole payload is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("response does not match contract at `{path}`: {reason}")]
pub struct SchemaMismatch {
    pub path: String,
    pub reason: String,
}

impl SchemaMismatch {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model endpoint unreachable or returned a protocol-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited by the endpoint
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// API key missing from the environment
    #[error("API key not found for {service}. Set {env_var} in your environment or .env file")]
    MissingApiKey { service: String, env_var: String },

    /// Response could not be coerced into the output contract
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    /// Output contract declaration is invalid
    #[error("Invalid output contract: {0}")]
    ContractDefinition(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Io(_)
        )
    }

    /// Whether the error came from the model endpoint rather than local logic
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Auth(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("The AI service could not be reached: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::MissingApiKey { env_var, .. } => {
                format!("No API key configured. Set {env_var} and try again.")
            }
            Self::SchemaMismatch(err) => format!("The response was not in the expected shape: {err}"),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Config(msg) | Self::ContractDefinition(msg) => {
                format!("The agent is misconfigured: {msg}")
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(AgentError::Transport("connection reset".into()).is_retryable());
        assert!(AgentError::RateLimited("429".into()).is_transport());
        assert!(!AgentError::Config("missing".into()).is_retryable());
    }

    #[test]
    fn test_schema_mismatch_displays_path() {
        let err: AgentError = SchemaMismatch::new("score", "expected integer").into();
        assert_eq!(
            err.to_string(),
            "response does not match contract at `score`: expected integer"
        );
        assert!(!err.is_transport());
    }
}

//! API Key Management
//!
//! Maps service names onto the environment variables holding their keys,
//! and loads `export KEY="value"` lines from `~/.bash_secrets` so keys kept
//! there work without a `.env` file.

use std::collections::BTreeMap;
use std::path::Path;

use agent_core::error::{AgentError, Result};

/// Service name → environment variable. `None` means no key is needed.
pub const API_KEY_MAP: &[(&str, Option<&str>)] = &[
    // LLM providers
    ("openrouter", Some("OPENROUTER_API_KEY")),
    ("openai", Some("OPENAI_API_KEY")),
    ("anthropic", Some("ANTHROPIC_API_KEY")),
    ("google", Some("GOOGLE_AI_API_KEY")),
    ("groq", Some("GROQ_API_KEY")),
    ("ollama", None),
    // Search & data
    ("duckduckgo", None),
    ("newsapi", Some("NEWSAPI_KEY")),
    ("serper", Some("SERPER_API_KEY")),
    ("exa", Some("EXA_API_KEY")),
    // Finance
    ("alphavantage", Some("ALPHAVANTAGE_API_KEY")),
    ("polygon", Some("POLYGON_API_KEY")),
    // Weather
    ("openweather", Some("OPENWEATHER_API_KEY")),
    // Communication
    ("slack", Some("SLACK_BOT_TOKEN")),
    ("twilio", Some("TWILIO_AUTH_TOKEN")),
    ("sendgrid", Some("SENDGRID_API_KEY")),
    // Development
    ("github", Some("GITHUB_TOKEN")),
    ("linear", Some("LINEAR_API_KEY")),
    ("jira", Some("JIRA_API_TOKEN")),
    // CRM
    ("hubspot", Some("HUBSPOT_API_KEY")),
    ("salesforce", Some("SALESFORCE_ACCESS_TOKEN")),
];

/// Whether a service's key is configured, and which variable holds it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyStatus {
    Available { env_var: &'static str },
    Missing { env_var: &'static str },
    NotRequired,
    UnknownService,
}

impl KeyStatus {
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. } | Self::NotRequired)
    }
}

fn lookup(service: &str) -> Option<Option<&'static str>> {
    let service = service.trim().to_ascii_lowercase();
    API_KEY_MAP
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, env_var)| *env_var)
}

fn env_value(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|v| !v.trim().is_empty())
}

/// API key for a service.
///
/// Services that need no key yield `Some("")`. When `required` is false a
/// missing key or unknown service yields `None` instead of an error.
pub fn get_api_key(service: &str, required: bool) -> Result<Option<String>> {
    let Some(entry) = lookup(service) else {
        return if required {
            Err(AgentError::Config(format!("Unknown service: {service}")))
        } else {
            Ok(None)
        };
    };

    let Some(env_var) = entry else {
        return Ok(Some(String::new()));
    };

    match env_value(env_var) {
        Some(key) => Ok(Some(key)),
        None if required => Err(AgentError::MissingApiKey {
            service: service.to_string(),
            env_var: env_var.to_string(),
        }),
        None => Ok(None),
    }
}

pub fn check_api_available(service: &str) -> KeyStatus {
    match lookup(service) {
        None => KeyStatus::UnknownService,
        Some(None) => KeyStatus::NotRequired,
        Some(Some(env_var)) if env_value(env_var).is_some() => KeyStatus::Available { env_var },
        Some(Some(env_var)) => KeyStatus::Missing { env_var },
    }
}

/// Every known service and whether it can be used right now
pub fn list_available_apis() -> BTreeMap<&'static str, bool> {
    API_KEY_MAP
        .iter()
        .map(|(name, _)| (*name, check_api_available(name).is_available()))
        .collect()
}

/// Placeholder payload for tools whose backing API has no credentials
pub fn fallback_response(service: &str, query: &str) -> serde_json::Value {
    let env_var = lookup(service).flatten().unwrap_or("API_KEY");
    serde_json::json!({
        "status": "demo_mode",
        "service": service,
        "query": query,
        "message": format!("Running in demo mode. Set {env_var} for live data."),
        "data": [],
    })
}

/// Load `export KEY="value"` lines from `path` into the process
/// environment without overriding variables that are already set.
/// Returns how many variables were newly set.
pub fn load_secrets_file(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let secrets_error =
        |e: dotenvy::Error| AgentError::Config(format!("{}: {e}", path.display()));

    let pending = dotenvy::from_path_iter(path)
        .map_err(secrets_error)?
        .filter_map(std::result::Result::ok)
        .filter(|(key, _)| std::env::var_os(key).is_none())
        .count();
    dotenvy::from_path(path).map_err(secrets_error)?;

    tracing::debug!(path = %path.display(), loaded = pending, "Loaded secrets file");
    Ok(pending)
}

/// Load `~/.bash_secrets` (see [`load_secrets_file`])
pub fn load_bash_secrets() -> Result<usize> {
    match dirs::home_dir() {
        Some(home) => load_secrets_file(&home.join(".bash_secrets")),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyless_and_unknown_services() {
        assert_eq!(get_api_key("duckduckgo", true).unwrap(), Some(String::new()));
        assert_eq!(check_api_available("DuckDuckGo"), KeyStatus::NotRequired);

        assert!(matches!(get_api_key("nope", true), Err(AgentError::Config(_))));
        assert_eq!(get_api_key("nope", false).unwrap(), None);
        assert_eq!(check_api_available("nope"), KeyStatus::UnknownService);
    }

    #[test]
    fn test_fallback_names_the_missing_variable() {
        let fallback = fallback_response("hubspot", "Acme Corp");
        assert_eq!(fallback["status"], "demo_mode");
        assert_eq!(fallback["query"], "Acme Corp");
        assert!(fallback["message"].as_str().unwrap().contains("HUBSPOT_API_KEY"));
        assert!(fallback_response("mystery", "q")["message"]
            .as_str()
            .unwrap()
            .contains("API_KEY"));
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        // LINEAR_API_KEY is not expected in a test environment
        if std::env::var_os("LINEAR_API_KEY").is_some() {
            return;
        }
        match get_api_key("linear", true) {
            Err(AgentError::MissingApiKey { env_var, .. }) => assert_eq!(env_var, "LINEAR_API_KEY"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(get_api_key("linear", false).unwrap(), None);
        assert!(!list_available_apis()["linear"]);
        assert!(list_available_apis()["ollama"]);
    }

    #[test]
    fn test_secrets_file_does_not_override_existing_vars() {
        let dir = std::env::temp_dir().join(format!("secrets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".bash_secrets");
        std::fs::write(
            &path,
            "# keys\nexport AGENT_RUNTIME_TEST_NEW=\"fresh\"\nexport AGENT_RUNTIME_TEST_QUOTED='single'\nexport PATH=\"/nowhere\"\n",
        )
        .unwrap();

        let before = std::env::var("PATH").unwrap();
        let loaded = load_secrets_file(&path).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(std::env::var("AGENT_RUNTIME_TEST_NEW").unwrap(), "fresh");
        assert_eq!(std::env::var("AGENT_RUNTIME_TEST_QUOTED").unwrap(), "single");
        assert_eq!(std::env::var("PATH").unwrap(), before);

        assert_eq!(load_secrets_file(&dir.join("absent")).unwrap(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

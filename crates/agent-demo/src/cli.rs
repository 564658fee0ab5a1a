//! CLI argument parsing and subcommand handlers.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use agent_catalog::{Scenario, agent_builder, catalog, find, run_demo};
use agent_core::{Config, ConfigValue, LlmProvider, resolve};
use agent_runtime::{ProviderKind, RateLimitedProvider, RateLimiter, build_provider, check_api_key};

const OFFLINE_MODEL: &str = "offline";

/// Run single-shot structured agent demos.
#[derive(Parser, Debug)]
#[command(name = "agent-demo", version, about = "Run single-shot structured agent demos")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available scenarios.
    List,
    /// Show model providers and whether their API keys are set.
    Providers,
    /// Run one scenario's demo.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario name (see `list`).
    pub scenario: String,

    /// Model provider.
    #[arg(long, short, default_value = "openrouter")]
    pub provider: ProviderKind,

    /// Model id; defaults to the provider's default model.
    #[arg(long, short)]
    pub model: Option<String>,

    /// Sampling temperature.
    #[arg(long, short)]
    pub temperature: Option<f32>,

    /// Override a scenario option, e.g. `--set industry=healthcare`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub overrides: Vec<(String, ConfigValue)>,

    /// Replay the scenario's sample answer instead of calling a model.
    #[arg(long)]
    pub offline: bool,

    /// Maximum tool-use rounds before the last answer is taken as final.
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Cap model calls per second.
    #[arg(long, value_name = "CALLS_PER_SECOND")]
    pub rate_limit: Option<f64>,

    /// Print the full invocation record as JSON after the demo.
    #[arg(long)]
    pub json: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, ConfigValue), String> {
    Config::parse_assignment(raw).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        match self.command {
            Command::List => list_scenarios(&mut stdout),
            Command::Providers => list_provider_status(&mut stdout),
            Command::Run(args) => args.run(&mut stdout).await,
        }
    }
}

fn list_scenarios(out: &mut dyn Write) -> Result<()> {
    for scenario in catalog() {
        let tools = scenario.tools();
        writeln!(out, "{:<18} {}", scenario.name(), scenario.description())?;
        if !tools.is_empty() {
            writeln!(out, "{:<18} tools: {}", "", tools.names().join(", "))?;
        }
    }
    Ok(())
}

fn list_provider_status(out: &mut dyn Write) -> Result<()> {
    for kind in ProviderKind::ALL {
        let spec = kind.spec();
        let status = match check_api_key(kind) {
            (_, None) => "no key needed".to_string(),
            (true, Some(var)) => format!("{var} set"),
            (false, Some(var)) => format!("{var} missing"),
        };
        writeln!(
            out,
            "{:<11} {:<28} {:<24} {}",
            spec.name, spec.default_model, status, spec.description
        )?;
    }
    Ok(())
}

impl RunArgs {
    fn overrides(&self) -> Config {
        self.overrides.iter().cloned().collect()
    }

    fn provider(
        &self,
        scenario: &dyn Scenario,
        overrides: &Config,
    ) -> Result<(Arc<dyn LlmProvider>, String)> {
        if self.offline {
            let config = resolve(&scenario.defaults(), Some(overrides));
            let provider = scenario.offline_provider(&config)?;
            return Ok((Arc::new(provider), OFFLINE_MODEL.to_string()));
        }

        let resolved = build_provider(self.provider, self.model.as_deref())?;
        let provider = match self.rate_limit {
            Some(rate) => Arc::new(RateLimitedProvider::new(
                resolved.provider,
                RateLimiter::new(rate, 1)?,
            )) as Arc<dyn LlmProvider>,
            None => resolved.provider,
        };
        Ok((provider, resolved.model.model))
    }

    async fn run(self, out: &mut dyn Write) -> Result<()> {
        let scenario = find(&self.scenario)?;
        let overrides = self.overrides();
        let (provider, model) = self.provider(scenario.as_ref(), &overrides)?;

        if !self.offline {
            match provider.health_check().await {
                Ok(true) => tracing::debug!(provider = provider.name(), "Provider reachable"),
                Ok(false) | Err(_) => tracing::warn!(
                    provider = provider.name(),
                    "Provider health check failed; the demo may not complete"
                ),
            }
        }

        let mut builder = agent_builder(scenario.as_ref(), provider, Some(&overrides))?.model(model);
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max) = self.max_tool_rounds {
            builder = builder.max_tool_rounds(max);
        }
        let agent = builder.build()?;

        let invocation = run_demo(&agent, scenario.as_ref(), out)
            .await
            .inspect_err(|e| tracing::error!("{}", e.user_message()))
            .with_context(|| format!("{} demo failed", scenario.title()))?;

        tracing::info!(
            model = %invocation.model,
            prompt_tokens = invocation.usage.prompt_tokens,
            completion_tokens = invocation.usage.completion_tokens,
            "Token usage"
        );

        if self.json {
            writeln!(out, "\n{}", serde_json::to_string_pretty(&invocation)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "agent-demo",
            "run",
            "lead-qualifier",
            "--provider",
            "groq",
            "--set",
            "industry=healthcare",
            "--set",
            "min_employees=200",
            "--offline",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.provider, ProviderKind::Groq);
        assert!(args.offline);

        let overrides = args.overrides();
        assert_eq!(overrides.get_str("industry").unwrap(), "healthcare");
        assert_eq!(overrides.get_i64("min_employees").unwrap(), 200);
    }

    #[test]
    fn test_rejects_bad_assignment() {
        let err = Cli::try_parse_from(["agent-demo", "run", "lead_qualifier", "--set", "oops"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = Cli::try_parse_from(["agent-demo", "run", "lead_qualifier", "-p", "cerebras"]);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_offline_run_renders_structured_answer() {
        let cli = Cli::try_parse_from(["agent-demo", "run", "expense_splitter", "--offline", "--json"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut out = Vec::new();
        args.run(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Expense Splitter - Demo"));
        assert!(text.contains("[tool] calculate_tip -> ok"));
        assert!(text.contains("\"tool_trace\""));
    }

    #[test]
    fn test_list_output() {
        let mut out = Vec::new();
        list_scenarios(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("lead_qualifier"));
        assert!(text.contains("tools: add, calculate_tip"));
    }
}

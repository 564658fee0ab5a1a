//! Scenario Catalog
//!
//! Each scenario bundles what one example agent needs: built-in defaults,
//! instructions rendered from the resolved configuration, an output
//! contract, optional tools, the fixed demo request and a renderer for the
//! structured answer. [`build_agent`] wires a scenario to a model endpoint.

mod expense_splitter;
mod financial_report;
mod lead_qualifier;
mod lesson_planner;
mod self_improving;
mod ticket_router;

use std::io::Write;
use std::sync::Arc;

use agent_core::{
    Agent, AgentBuilder, Config, LlmProvider, OutputContract, Result, ScriptedProvider, StructuredOutput,
    ToolRegistry, error::AgentError, resolve,
};

pub use expense_splitter::ExpenseSplitter;
pub use financial_report::FinancialReport;
pub use lead_qualifier::{CompanyInfo, LeadQualifier, LeadScore};
pub use lesson_planner::LessonPlanner;
pub use self_improving::SelfImproving;
pub use ticket_router::TicketRouter;

/// One example agent
pub trait Scenario: Send + Sync {
    /// Catalog key, e.g. `lead_qualifier`
    fn name(&self) -> &'static str;

    /// Display name used as the agent name and in banners
    fn title(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Built-in configuration defaults
    fn defaults(&self) -> Config;

    /// Role instructions, one line per entry
    fn instructions(&self, config: &Config) -> Result<Vec<String>>;

    fn contract(&self) -> Result<OutputContract>;

    fn tools(&self) -> ToolRegistry {
        ToolRegistry::new()
    }

    /// The fixed demo request
    fn request(&self, config: &Config) -> Result<String>;

    /// A well-formed answer for offline runs
    fn sample_response(&self, config: &Config) -> Result<String>;

    /// Scripted endpoint replaying the sample answer
    fn offline_provider(&self, config: &Config) -> Result<ScriptedProvider> {
        Ok(ScriptedProvider::repeating(self.sample_response(config)?))
    }

    /// Called with every structured answer before it is rendered
    fn after_invoke(&self, _output: &StructuredOutput) -> Result<()> {
        Ok(())
    }

    /// Write the interesting fields of a structured answer
    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()>;
}

/// Every scenario, in listing order
pub fn catalog() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(LeadQualifier),
        Box::new(TicketRouter),
        Box::new(FinancialReport),
        Box::new(LessonPlanner),
        Box::new(ExpenseSplitter),
        Box::new(SelfImproving::default()),
    ]
}

/// Look a scenario up by catalog key (`-` and `_` are interchangeable)
pub fn find(name: &str) -> Result<Box<dyn Scenario>> {
    let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
    let mut scenarios = catalog();
    match scenarios.iter().position(|s| s.name() == wanted) {
        Some(index) => Ok(scenarios.swap_remove(index)),
        None => {
            let known: Vec<&str> = scenarios.iter().map(|s| s.name()).collect();
            Err(AgentError::Config(format!(
                "Unknown scenario: '{name}'. Available: {}",
                known.join(", ")
            )))
        }
    }
}

/// Resolve configuration and pre-fill a builder with the scenario's
/// instructions, tools and contract
pub fn agent_builder(
    scenario: &dyn Scenario,
    provider: Arc<dyn LlmProvider>,
    overrides: Option<&Config>,
) -> Result<AgentBuilder> {
    let config = resolve(&scenario.defaults(), overrides);

    Ok(Agent::builder()
        .name(scenario.title())
        .provider(provider)
        .instructions(scenario.instructions(&config)?)
        .tools(scenario.tools())
        .contract(scenario.contract()?)
        .config(config))
}

pub fn build_agent(
    scenario: &dyn Scenario,
    provider: Arc<dyn LlmProvider>,
    model: &str,
    overrides: Option<&Config>,
) -> Result<Agent> {
    agent_builder(scenario, provider, overrides)?.model(model).build()
}

/// `- item` lines, at most `limit` of them
fn write_bullets<'a>(
    out: &mut dyn Write,
    items: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Result<()> {
    for item in items.into_iter().take(limit) {
        writeln!(out, "  - {item}")?;
    }
    Ok(())
}

fn rule(out: &mut dyn Write, width: usize) -> Result<()> {
    writeln!(out, "{}", "=".repeat(width))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: Vec<&str> = catalog().iter().map(|s| s.name()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }

    #[test]
    fn test_every_contract_builds() {
        for scenario in catalog() {
            let contract = scenario.contract().unwrap();
            let config = scenario.defaults();

            assert!(!scenario.instructions(&config).unwrap().is_empty());
            assert!(!scenario.request(&config).unwrap().trim().is_empty());
            // The sample answer must satisfy the scenario's own contract
            contract
                .parse(&scenario.sample_response(&config).unwrap())
                .unwrap_or_else(|e| panic!("{}: {e}", scenario.name()));
        }
    }

    #[test]
    fn test_find_accepts_dashes() {
        assert_eq!(find("lead-qualifier").unwrap().name(), "lead_qualifier");
        let err = find("weather_bot").err().unwrap();
        assert!(err.to_string().contains("ticket_router"));
    }

    #[test]
    fn test_build_agent_applies_overrides() {
        let scenario = find("lead_qualifier").unwrap();
        let overrides = Config::new().with("industry", "healthcare");
        let agent = build_agent(
            scenario.as_ref(),
            Arc::new(ScriptedProvider::new()),
            "test-model",
            Some(&overrides),
        )
        .unwrap();

        assert_eq!(agent.name(), "Lead Qualifier");
        assert_eq!(agent.config().get_str("industry").unwrap(), "healthcare");
        assert_eq!(agent.config().get_str("company_name").unwrap(), "Acme Corp");
        assert!(agent.system_prompt().contains("Target Industry: healthcare"));
        assert_eq!(agent.model(), "test-model");
    }
}

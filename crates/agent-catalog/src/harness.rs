//! Demo Harness
//!
//! Invokes an agent once with its scenario's fixed request and writes the
//! rendered answer. Provider errors propagate untouched; an answer that did
//! not fit the contract is printed verbatim.

use std::io::Write;

use agent_core::{Agent, Invocation, InvocationResult, Result};

use crate::scenarios::Scenario;

pub const RAW_RESPONSE_BANNER: &str = "[Raw Response - structured parsing unavailable]";

const WIDTH: usize = 60;

/// Run one demo invocation, returning it for callers that want usage or
/// the tool trace
pub async fn run_demo(agent: &Agent, scenario: &dyn Scenario, out: &mut dyn Write) -> Result<Invocation> {
    writeln!(out, "\n{}", "=".repeat(WIDTH))?;
    writeln!(out, "  {} - Demo", scenario.title())?;
    writeln!(out, "{}", "=".repeat(WIDTH))?;

    let request = scenario.request(agent.config())?;
    writeln!(out, "\n{request}")?;
    writeln!(out, "{}", "-".repeat(40))?;
    out.flush()?;

    let invocation = agent.run(&request).await?;

    tracing::info!(
        scenario = scenario.name(),
        structured = invocation.result.is_structured(),
        rounds = invocation.rounds,
        tool_calls = invocation.tool_trace.len(),
        "Demo invocation finished"
    );

    for step in &invocation.tool_trace {
        writeln!(out, "[tool] {} -> {}", step.call.name, if step.result.success { "ok" } else { "failed" })?;
    }
    writeln!(out)?;

    match &invocation.result {
        InvocationResult::Structured(output) => {
            scenario.after_invoke(output)?;
            scenario.render(output, out)?;
        }
        InvocationResult::Unstructured(text) => {
            writeln!(out, "{RAW_RESPONSE_BANNER}")?;
            writeln!(out, "{text}")?;
        }
    }
    out.flush()?;

    Ok(invocation)
}

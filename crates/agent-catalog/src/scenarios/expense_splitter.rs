//! Expense Splitter
//!
//! Splits a shared bill. All arithmetic goes through the `add` and
//! `calculate_tip` tools; the offline script replays one tool round.

use std::io::Write;

use serde_json::json;

use agent_core::{
    Config, FieldSpec, FieldType, OutputContract, Result, ScriptedProvider, StructuredOutput,
    ToolCall, ToolRegistry, contract::Bounds, error::AgentError,
};

use super::{Scenario, write_bullets};
use crate::svckit::{AddTool, CalculateTipTool, TipBreakdown};

pub struct ExpenseSplitter;

impl ExpenseSplitter {
    fn breakdown(config: &Config) -> Result<TipBreakdown> {
        let people = u32::try_from(config.get_i64("people")?)
            .map_err(|_| AgentError::Config("'people' must be a positive integer".into()))?;
        TipBreakdown::compute(
            config.get_f64("bill_amount")?,
            config.get_f64("tip_percentage")?,
            people,
        )
    }
}

impl Scenario for ExpenseSplitter {
    fn name(&self) -> &'static str {
        "expense_splitter"
    }

    fn title(&self) -> &'static str {
        "Expense Splitter"
    }

    fn description(&self) -> &'static str {
        "Split a shared bill with tip using calculator tools"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("description", "Team dinner")
            .with("bill_amount", 186.4)
            .with("tip_percentage", 18.0)
            .with("people", 4)
    }

    fn instructions(&self, _config: &Config) -> Result<Vec<String>> {
        Ok(vec![
            "You help groups split shared expenses fairly.".into(),
            "Never do arithmetic yourself: use calculate_tip for tips and shares, add for sums.".into(),
            "Report amounts in dollars rounded to cents.".into(),
        ])
    }

    fn contract(&self) -> Result<OutputContract> {
        let money = |name: &str, description: &str| {
            FieldSpec::float(name, description).with_bounds(Bounds::at_least(0.0))
        };

        OutputContract::builder("ExpenseSplit")
            .field(FieldSpec::string("description", "What the expense was"))
            .field(money("subtotal", "Bill before tip"))
            .field(FieldSpec::float("tip_percentage", "Tip percentage applied").bounded(0.0, 100.0))
            .field(money("tip_amount", "Tip in dollars"))
            .field(money("total", "Bill including tip"))
            .field(FieldSpec::integer("people", "Number of people splitting").with_bounds(Bounds::at_least(1.0)))
            .field(money("per_person", "Share per person"))
            .field(
                FieldSpec::list("breakdown", FieldType::String, "Step-by-step calculation")
                    .with_default(json!([])),
            )
            .field(FieldSpec::string("notes", "Rounding or fairness notes").optional())
            .build()
    }

    fn tools(&self) -> ToolRegistry {
        ToolRegistry::new().with(AddTool).with(CalculateTipTool)
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Split this bill: {} came to ${:.2} before tip. Tip {}% and split it between {} people.",
            config.get_str("description")?,
            config.get_f64("bill_amount")?,
            config.get_f64("tip_percentage")?,
            config.get_i64("people")?,
        ))
    }

    fn sample_response(&self, config: &Config) -> Result<String> {
        let b = Self::breakdown(config)?;
        Ok(json!({
            "description": config.get_str("description")?,
            "subtotal": b.bill_amount,
            "tip_percentage": b.tip_percentage,
            "tip_amount": b.tip_amount,
            "total": b.total_bill,
            "people": b.people,
            "per_person": b.per_person,
            "breakdown": [
                format!("Tip: ${:.2} x {}% = ${:.2}", b.bill_amount, b.tip_percentage, b.tip_amount),
                format!("Total: ${:.2} + ${:.2} = ${:.2}", b.bill_amount, b.tip_amount, b.total_bill),
                format!("Share: ${:.2} / {} = ${:.2}", b.total_bill, b.people, b.per_person),
            ],
        })
        .to_string())
    }

    fn offline_provider(&self, config: &Config) -> Result<ScriptedProvider> {
        let call = ToolCall::new(
            "calculate_tip",
            json!({
                "bill_amount": config.get_f64("bill_amount")?,
                "tip_percentage": config.get_f64("tip_percentage")?,
                "people": config.get_i64("people")?,
            }),
        )
        .with_id("call_tip");

        Ok(ScriptedProvider::new()
            .reply_tool_calls(vec![call])
            .reply(self.sample_response(config)?))
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        let money = |field: &str| output.f64(field).unwrap_or_default();

        writeln!(out, "{}", output.str("description").unwrap_or_default())?;
        writeln!(out, "  Subtotal:   ${:.2}", money("subtotal"))?;
        writeln!(
            out,
            "  Tip ({}%):  ${:.2}",
            output.f64("tip_percentage").unwrap_or_default(),
            money("tip_amount")
        )?;
        writeln!(out, "  Total:      ${:.2}", money("total"))?;
        writeln!(
            out,
            "  Each of {}: ${:.2}",
            output.i64("people").unwrap_or(1),
            money("per_person")
        )?;

        let steps = output.strings("breakdown");
        if !steps.is_empty() {
            writeln!(out, "\nBreakdown:")?;
            write_bullets(out, steps, usize::MAX)?;
        }
        if let Some(notes) = output.str("notes") {
            writeln!(out, "\nNotes: {notes}")?;
        }
        Ok(())
    }
}

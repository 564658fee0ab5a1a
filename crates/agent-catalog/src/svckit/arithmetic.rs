//! Arithmetic Tools
//!
//! Exact sums and tip splits so agents never do money math in the model.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use agent_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    error::AgentError,
    tool::ParameterSchema,
};

pub const DEFAULT_TIP_PERCENTAGE: f64 = 18.0;

/// Render whole numbers without a trailing `.0`
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Adds two numbers
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add".into(),
            description: "Add two numbers and return the exact sum.".into(),
            parameters: vec![
                ParameterSchema::required("a", "number", "First addend"),
                ParameterSchema::required("b", "number", "Second addend"),
            ],
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let a = call.arg_f64("a")?;
        let b = call.arg_f64("b")?;
        let sum = a + b;

        tracing::debug!(a, b, sum, "add");
        Ok(ToolResult::success("add", format_number(sum)).with_data(json!(sum)))
    }
}

/// Tip, total and per-person share for a bill
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TipBreakdown {
    pub bill_amount: f64,
    pub tip_percentage: f64,
    pub tip_amount: f64,
    pub total_bill: f64,
    pub people: u32,
    pub per_person: f64,
}

impl TipBreakdown {
    pub fn compute(bill_amount: f64, tip_percentage: f64, people: u32) -> CoreResult<Self> {
        if !bill_amount.is_finite() || bill_amount < 0.0 {
            return Err(AgentError::ToolValidation(format!(
                "bill_amount must be a non-negative number, got {bill_amount}"
            )));
        }
        if !tip_percentage.is_finite() || !(0.0..=100.0).contains(&tip_percentage) {
            return Err(AgentError::ToolValidation(format!(
                "tip_percentage must be between 0 and 100, got {tip_percentage}"
            )));
        }
        if people == 0 {
            return Err(AgentError::ToolValidation("people must be at least 1".into()));
        }

        let tip_amount = round_cents(bill_amount * tip_percentage / 100.0);
        let total_bill = round_cents(bill_amount + tip_amount);
        Ok(Self {
            bill_amount,
            tip_percentage,
            tip_amount,
            total_bill,
            people,
            per_person: round_cents(total_bill / f64::from(people)),
        })
    }

    fn render(&self) -> String {
        let mut out = format!(
            "Bill:        ${:.2}\nTip ({}%):   ${:.2}\nTotal:       ${:.2}",
            self.bill_amount,
            format_number(self.tip_percentage),
            self.tip_amount,
            self.total_bill,
        );
        if self.people > 1 {
            out.push_str(&format!(
                "\nPer person:  ${:.2} ({} people)",
                self.per_person, self.people
            ));
        }
        out
    }
}

/// Computes tip and split for a bill
pub struct CalculateTipTool;

#[async_trait]
impl Tool for CalculateTipTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate_tip".into(),
            description: "Calculate the tip amount, total bill and per-person share.".into(),
            parameters: vec![
                ParameterSchema::required("bill_amount", "number", "Bill amount in dollars before tip"),
                ParameterSchema::optional(
                    "tip_percentage",
                    "number",
                    "Tip percentage, e.g. 18 for 18%",
                    json!(DEFAULT_TIP_PERCENTAGE),
                ),
                ParameterSchema::optional("people", "integer", "Number of people splitting", json!(1)),
            ],
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let bill = call.arg_f64("bill_amount")?;
        let pct = match call.arg("tip_percentage") {
            Some(_) => call.arg_f64("tip_percentage")?,
            None => DEFAULT_TIP_PERCENTAGE,
        };
        let people = match call.arg("people") {
            Some(_) => u32::try_from(call.arg_i64("people")?)
                .map_err(|_| AgentError::ToolValidation("people must be a positive integer".into()))?,
            None => 1,
        };

        let breakdown = TipBreakdown::compute(bill, pct, people)?;
        Ok(ToolResult::success("calculate_tip", breakdown.render())
            .with_data(serde_json::to_value(breakdown)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_formats_whole_numbers() {
        let call = ToolCall::new("add", json!({"a": 17, "b": 25}));
        let result = AddTool.execute(&call).await.unwrap();
        assert_eq!(result.output, "42");

        let call = ToolCall::new("add", json!({"a": "0.5", "b": 0.25}));
        assert_eq!(AddTool.execute(&call).await.unwrap().output, "0.75");
    }

    #[tokio::test]
    async fn test_add_requires_numbers() {
        let call = ToolCall::new("add", json!({"a": "seven", "b": 1}));
        assert!(matches!(
            AddTool.execute(&call).await,
            Err(AgentError::ToolValidation(_))
        ));
    }

    #[test]
    fn test_tip_breakdown() {
        let b = TipBreakdown::compute(120.0, 20.0, 4).unwrap();
        assert_eq!(b.tip_amount, 24.0);
        assert_eq!(b.total_bill, 144.0);
        assert_eq!(b.per_person, 36.0);
        assert!(b.render().contains("Per person:  $36.00 (4 people)"));

        assert!(TipBreakdown::compute(-1.0, 18.0, 1).is_err());
        assert!(TipBreakdown::compute(10.0, 150.0, 1).is_err());
        assert!(TipBreakdown::compute(10.0, 18.0, 0).is_err());
    }

    #[tokio::test]
    async fn test_tip_defaults() {
        let call = ToolCall::new("calculate_tip", json!({"bill_amount": 65}));
        let result = CalculateTipTool.execute(&call).await.unwrap();

        assert!(result.output.contains("Tip (18%):   $11.70"));
        assert!(!result.output.contains("Per person"));
        assert_eq!(result.data.unwrap()["total_bill"], 76.7);
    }
}

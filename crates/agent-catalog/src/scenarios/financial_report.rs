//! Financial Report Generator
//!
//! Turns raw figures into an executive report. The contract is a
//! [`ReportSpec`]: concerns are severity-ranked findings and the board
//! talking points are its recommendations.

use std::io::Write;

use serde_json::{Value, json};

use agent_core::{
    Config, FieldSpec, FieldType, OutputContract, ReportSpec, Result, StructuredOutput,
};

use super::{Scenario, write_bullets};

const SAMPLE_DATA: &str = "FY2024 Annual Results:
Revenue: $12.5M (up 23% YoY)
Gross Margin: 68% (up from 62%)
Operating Expenses: $7.2M
EBITDA: $2.8M (22% margin)
Net Income: $1.9M
Cash: $4.2M
ARR: $14.1M
Customer Count: 342 (up from 280)
Churn: 5.2% annually
NRR: 118%";

pub struct FinancialReport;

impl FinancialReport {
    pub fn report() -> Result<ReportSpec> {
        let metric = OutputContract::builder("Metric")
            .field(FieldSpec::string("name", "Metric name"))
            .field(FieldSpec::string("value", "Reported value with units"))
            .field(FieldSpec::string("change", "Year-over-year change").optional())
            .build()?;

        Ok(ReportSpec::new("FinancialReport")
            .description("Board-ready financial report")
            .summary("performance_summary", "Performance narrative")
            .findings("concerns", "Areas of concern, most severe first")
            .recommendations("board_talking_points", "Key points for the board")
            .score("health_score", "Overall financial health 0-100", 0.0, 100.0)
            .field(FieldSpec::string("period", "Reporting period"))
            .field(FieldSpec::string("headline", "One-line headline"))
            .field(FieldSpec::list(
                "key_metrics",
                FieldType::record(metric),
                "Key metrics with values",
            ))
            .field(FieldSpec::list("highlights", FieldType::String, "Top achievements"))
            .field(FieldSpec::string("outlook", "Forward-looking statement")))
    }
}

impl Scenario for FinancialReport {
    fn name(&self) -> &'static str {
        "financial_report"
    }

    fn title(&self) -> &'static str {
        "Financial Report Generator"
    }

    fn description(&self) -> &'static str {
        "Turn raw financial data into an executive summary"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("financial_data", SAMPLE_DATA)
            .with("audience", "board of directors")
    }

    fn instructions(&self, config: &Config) -> Result<Vec<String>> {
        Ok(vec![
            "You are a CFO-level financial analyst.".into(),
            "Transform data into compelling narratives.".into(),
            "Focus on insights, not just numbers.".into(),
            "Highlight trends and their implications.".into(),
            format!("Write for the {}.", config.get_str("audience")?),
        ])
    }

    fn contract(&self) -> Result<OutputContract> {
        Self::report()?.build()
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Generate executive report:\n\n{}",
            config.get_str("financial_data")?
        ))
    }

    fn sample_response(&self, _config: &Config) -> Result<String> {
        Ok(json!({
            "performance_summary": "Revenue grew 23% to $12.5M while gross margin expanded six points, lifting EBITDA to $2.8M.",
            "concerns": [
                {"title": "Churn", "detail": "5.2% annual churn offsets part of new-logo growth", "severity": "medium"},
                {"title": "Cash runway", "detail": "$4.2M cash against $7.2M opex", "severity": "high"},
            ],
            "board_talking_points": [
                "Margin expansion is structural, driven by infrastructure renegotiation",
                "NRR of 118% supports the expansion-led plan",
            ],
            "health_score": 78,
            "period": "FY2024",
            "headline": "Profitable growth with expanding margins",
            "key_metrics": [
                {"name": "Revenue", "value": "$12.5M", "change": "+23%"},
                {"name": "ARR", "value": "$14.1M"},
                {"name": "NRR", "value": "118%"},
            ],
            "highlights": [
                "Revenue up 23% year over year",
                "Gross margin up from 62% to 68%",
                "62 net new customers",
            ],
            "outlook": "Expect continued margin gains; watch churn in the SMB segment.",
        })
        .to_string())
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        let report = Self::report()?;

        writeln!(out, "{}", output.str("period").unwrap_or_default())?;
        writeln!(out, "{}", output.str("headline").unwrap_or_default())?;
        if let Some(score) = report.score_of(output) {
            writeln!(out, "Health score: {score}/100")?;
        }
        if let Some(summary) = report.summary_of(output) {
            writeln!(out, "\n{summary}")?;
        }

        let metrics = output.list("key_metrics");
        if !metrics.is_empty() {
            writeln!(out, "\nKey Metrics:")?;
            for metric in metrics {
                let field = |key: &str| metric.get(key).and_then(Value::as_str).unwrap_or_default();
                match metric.get("change").and_then(Value::as_str) {
                    Some(change) => writeln!(out, "  {}: {} ({change})", field("name"), field("value"))?,
                    None => writeln!(out, "  {}: {}", field("name"), field("value"))?,
                }
            }
        }

        writeln!(out, "\nHighlights:")?;
        write_bullets(out, output.strings("highlights"), 3)?;

        let concerns = report.findings_of(output);
        if !concerns.is_empty() {
            writeln!(out, "\nConcerns:")?;
            for concern in concerns.iter().take(2) {
                writeln!(out, "  - [{}] {}: {}", concern.severity, concern.title, concern.detail)?;
            }
        }

        writeln!(out, "\nOutlook: {}", output.str("outlook").unwrap_or_default())?;

        let points = report.recommendations_of(output);
        if !points.is_empty() {
            writeln!(out, "\nBoard Talking Points:")?;
            write_bullets(out, points, usize::MAX)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuredOutput {
        FinancialReport
            .contract()
            .unwrap()
            .parse(&FinancialReport.sample_response(&Config::new()).unwrap())
            .unwrap()
    }

    #[test]
    fn test_concerns_ranked_by_severity() {
        let concerns = FinancialReport::report().unwrap().findings_of(&sample());
        assert_eq!(concerns[0].title, "Cash runway");
        assert_eq!(concerns[1].severity, "medium");
    }

    #[test]
    fn test_unknown_severity_is_a_mismatch() {
        let raw = FinancialReport
            .sample_response(&Config::new())
            .unwrap()
            .replace("\"medium\"", "\"meh\"");
        let err = FinancialReport.contract().unwrap().parse(&raw).unwrap_err();
        assert_eq!(err.path, "concerns[0].severity");
    }

    #[test]
    fn test_render() {
        let mut buf = Vec::new();
        FinancialReport.render(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("FY2024\nProfitable growth"));
        assert!(text.contains("Health score: 78/100"));
        assert!(text.contains("  Revenue: $12.5M (+23%)"));
        assert!(text.contains("  ARR: $14.1M\n"));
        assert!(text.contains("  - [high] Cash runway"));
    }
}

//! Business Report Contracts
//!
//! Many agents answer with the same shape: a summary, a list of findings
//! each carrying a severity, and a list of recommendations, sometimes with
//! a bounded score on top. [`ReportSpec`] describes that shape as data so a
//! scenario only supplies its field names and extras.

use serde_json::{Value, json};

use crate::contract::{FieldSpec, FieldType, OutputContract, StructuredOutput};
use crate::error::Result;

const DEFAULT_SEVERITIES: [&str; 4] = ["low", "medium", "high", "critical"];

#[derive(Clone, Debug)]
struct NamedField {
    name: String,
    description: String,
}

impl NamedField {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone, Debug)]
struct ScoreField {
    field: NamedField,
    min: f64,
    max: f64,
}

/// Declarative description of a findings/severity/recommendation report
#[derive(Clone, Debug)]
pub struct ReportSpec {
    name: String,
    description: Option<String>,
    summary: NamedField,
    findings: NamedField,
    severities: Vec<String>,
    finding_fields: Vec<FieldSpec>,
    recommendations: NamedField,
    score: Option<ScoreField>,
    extra: Vec<FieldSpec>,
}

/// One finding pulled back out of a report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub title: String,
    pub detail: String,
    pub severity: String,
    /// Position of `severity` in the declared levels (higher is worse)
    pub rank: usize,
}

impl ReportSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            summary: NamedField::new("summary", "Executive summary in 2-3 sentences"),
            findings: NamedField::new("findings", "Key findings, most severe first"),
            severities: DEFAULT_SEVERITIES.iter().map(|s| (*s).to_string()).collect(),
            finding_fields: Vec::new(),
            recommendations: NamedField::new("recommendations", "Concrete next steps"),
            score: None,
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, name: &str, description: &str) -> Self {
        self.summary = NamedField::new(name, description);
        self
    }

    #[must_use]
    pub fn findings(mut self, name: &str, description: &str) -> Self {
        self.findings = NamedField::new(name, description);
        self
    }

    /// Severity levels, least severe first
    #[must_use]
    pub fn severities(mut self, levels: &[&str]) -> Self {
        self.severities = levels.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Extra field carried by every finding
    #[must_use]
    pub fn finding_field(mut self, field: FieldSpec) -> Self {
        self.finding_fields.push(field);
        self
    }

    #[must_use]
    pub fn recommendations(mut self, name: &str, description: &str) -> Self {
        self.recommendations = NamedField::new(name, description);
        self
    }

    #[must_use]
    pub fn score(mut self, name: &str, description: &str, min: f64, max: f64) -> Self {
        self.score = Some(ScoreField {
            field: NamedField::new(name, description),
            min,
            max,
        });
        self
    }

    /// Extra top-level field
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.extra.push(field);
        self
    }

    /// Build the output contract; name clashes surface as construction errors
    pub fn build(&self) -> Result<OutputContract> {
        let finding = OutputContract::builder(format!("{}Finding", self.name))
            .field(FieldSpec::string("title", "Short name of the finding"))
            .field(FieldSpec::string("detail", "Evidence and explanation"))
            .field(
                FieldSpec::string(
                    "severity",
                    format!("One of: {}", self.severities.join(", ")),
                )
                .one_of(self.severities.as_slice()),
            )
            .fields(self.finding_fields.iter().cloned())
            .build()?;

        let mut builder = OutputContract::builder(&self.name)
            .field(FieldSpec::string(&self.summary.name, &self.summary.description))
            .field(FieldSpec::list(
                &self.findings.name,
                FieldType::record(finding),
                &self.findings.description,
            ))
            .field(
                FieldSpec::list(
                    &self.recommendations.name,
                    FieldType::String,
                    &self.recommendations.description,
                )
                .with_default(json!([])),
            );

        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(score) = &self.score {
            builder = builder.field(
                FieldSpec::integer(&score.field.name, &score.field.description)
                    .bounded(score.min, score.max),
            );
        }

        builder.fields(self.extra.iter().cloned()).build()
    }

    /// Findings from a parsed report, most severe first
    pub fn findings_of(&self, output: &StructuredOutput) -> Vec<Finding> {
        let text = |item: &Value, key: &str| {
            item.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut findings: Vec<Finding> = output
            .list(&self.findings.name)
            .iter()
            .map(|item| {
                let severity = text(item, "severity");
                let rank = self
                    .severities
                    .iter()
                    .position(|s| *s == severity)
                    .unwrap_or_default();
                Finding {
                    title: text(item, "title"),
                    detail: text(item, "detail"),
                    severity,
                    rank,
                }
            })
            .collect();

        findings.sort_by(|a, b| b.rank.cmp(&a.rank));
        findings
    }

    pub fn summary_of<'a>(&self, output: &'a StructuredOutput) -> Option<&'a str> {
        output.str(&self.summary.name)
    }

    pub fn recommendations_of<'a>(&self, output: &'a StructuredOutput) -> Vec<&'a str> {
        output.strings(&self.recommendations.name)
    }

    pub fn score_of(&self, output: &StructuredOutput) -> Option<i64> {
        self.score
            .as_ref()
            .and_then(|score| output.i64(&score.field.name))
    }
}

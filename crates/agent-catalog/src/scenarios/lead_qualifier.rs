//! Lead Qualifier
//!
//! Scores a sales lead against fit criteria after researching the company.

use std::io::Write;

use serde::Deserialize;
use serde_json::json;

use agent_core::{
    Config, FieldSpec, FieldType, OutputContract, Result, StructuredOutput, ToolRegistry,
};

use super::{Scenario, rule, write_bullets};
use crate::svckit::{CompanyLookupTool, find_company};

/// Enriched company information
#[derive(Clone, Debug, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub estimated_size: String,
    pub website: Option<String>,
    #[serde(default)]
    pub recent_news: Vec<String>,
}

/// Lead qualification result
#[derive(Clone, Debug, Deserialize)]
pub struct LeadScore {
    pub company: CompanyInfo,
    pub qualification_score: i64,
    pub qualification_tier: String,
    pub fit_signals: Vec<String>,
    #[serde(default)]
    pub risk_signals: Vec<String>,
    pub recommended_action: String,
    pub reasoning: String,
}

pub struct LeadQualifier;

impl LeadQualifier {
    fn company_contract() -> Result<OutputContract> {
        OutputContract::builder("CompanyInfo")
            .description("Enriched company information")
            .field(FieldSpec::string("name", "Company name"))
            .field(FieldSpec::string("description", "Brief company description"))
            .field(FieldSpec::string("industry", "Primary industry"))
            .field(FieldSpec::string(
                "estimated_size",
                "Estimated company size (startup/SMB/enterprise)",
            ))
            .field(FieldSpec::string("website", "Company website if found").optional())
            .field(
                FieldSpec::list("recent_news", FieldType::String, "Recent news or updates")
                    .with_default(json!([])),
            )
            .build()
    }
}

impl Scenario for LeadQualifier {
    fn name(&self) -> &'static str {
        "lead_qualifier"
    }

    fn title(&self) -> &'static str {
        "Lead Qualifier"
    }

    fn description(&self) -> &'static str {
        "Score and qualify sales leads against fit criteria"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("company_name", "Acme Corp")
            .with("contact_email", "john@acme.com")
            .with("industry", "technology")
            .with("min_employees", 50)
    }

    fn instructions(&self, config: &Config) -> Result<Vec<String>> {
        let lines = [
            "You are an expert sales development representative (SDR) who qualifies leads.",
            "Use the company_lookup tool to research the company and gather relevant information.",
            "",
            "Qualification Criteria:",
            "- Target Industry: {industry}",
            "- Minimum Company Size: {min_employees} employees",
            "- Look for: funding news, hiring signals, tech stack mentions, pain points",
            "",
            "Scoring Guidelines:",
            "- 80-100 (HOT): Perfect fit, strong buying signals, decision-maker contact",
            "- 50-79 (WARM): Good fit, some interest indicators, worth nurturing",
            "- 0-49 (COLD): Poor fit, no signals, or disqualifying factors",
            "",
            "Be thorough but concise. Focus on actionable insights.",
        ];
        Ok(lines.iter().map(|line| config.render(line)).collect())
    }

    fn contract(&self) -> Result<OutputContract> {
        OutputContract::builder("LeadScore")
            .description("Lead qualification result")
            .field(FieldSpec::record(
                "company",
                Self::company_contract()?,
                "Enriched company information",
            ))
            .field(
                FieldSpec::integer("qualification_score", "Lead score 0-100").bounded(0.0, 100.0),
            )
            .field(
                FieldSpec::string("qualification_tier", "hot/warm/cold based on score")
                    .one_of(&["hot", "warm", "cold"]),
            )
            .field(FieldSpec::list("fit_signals", FieldType::String, "Positive fit indicators"))
            .field(
                FieldSpec::list("risk_signals", FieldType::String, "Concerns or red flags")
                    .with_default(json!([])),
            )
            .field(FieldSpec::string("recommended_action", "Suggested next step"))
            .field(FieldSpec::string("reasoning", "Explanation of the score"))
            .build()
    }

    fn tools(&self) -> ToolRegistry {
        ToolRegistry::new().with(CompanyLookupTool)
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Qualify this lead:\n- Company: {}\n- Contact Email: {}\n\n\
             Research the company, assess fit, and provide a qualification score.",
            config.get_str("company_name")?,
            config.get_str("contact_email")?,
        ))
    }

    fn sample_response(&self, config: &Config) -> Result<String> {
        let name = config.get_str("company_name")?;
        let email = config.get_str("contact_email")?;
        let min_employees = config.get_i64("min_employees")?;

        let payload = match find_company(&name).or_else(|| find_company(&email)) {
            Some(company) => {
                let big_enough = i64::from(company.employees) >= min_employees;
                let score = if big_enough { 82 } else { 41 };
                json!({
                    "company": {
                        "name": company.name,
                        "description": company.description,
                        "industry": company.industry,
                        "estimated_size": if company.employees >= 1_000 { "enterprise" } else if company.employees >= 100 { "SMB" } else { "startup" },
                        "website": format!("https://{}", company.domain),
                        "recent_news": company.recent_news,
                    },
                    "qualification_score": score,
                    "qualification_tier": if big_enough { "hot" } else { "cold" },
                    "fit_signals": [
                        format!("{} employees", company.employees),
                        format!("Operates in {}", company.industry),
                    ],
                    "risk_signals": if big_enough { json!([]) } else { json!([format!("Below {min_employees} employee minimum")]) },
                    "recommended_action": if big_enough { format!("Book a discovery call with {email}") } else { "Add to nurture sequence".to_string() },
                    "reasoning": "strong fit",
                })
            }
            None => json!({
                "company": {
                    "name": name,
                    "description": "No public profile found",
                    "industry": "unknown",
                    "estimated_size": "unknown",
                    "recent_news": [],
                },
                "qualification_score": 30,
                "qualification_tier": "cold",
                "fit_signals": [],
                "risk_signals": ["Company could not be researched"],
                "recommended_action": "Verify the company before outreach",
                "reasoning": "insufficient data",
            }),
        };
        Ok(payload.to_string())
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        let lead: LeadScore = output.deserialize()?;

        rule(out, 40)?;
        writeln!(
            out,
            "LEAD SCORE: {}/100 ({})",
            lead.qualification_score,
            lead.qualification_tier.to_uppercase()
        )?;
        rule(out, 40)?;

        let company = &lead.company;
        writeln!(out, "\nCompany: {}", company.name)?;
        writeln!(out, "Industry: {}", company.industry)?;
        writeln!(out, "Size: {}", company.estimated_size)?;
        if let Some(website) = &company.website {
            writeln!(out, "Website: {website}")?;
        }
        writeln!(out, "\nDescription:\n{}", company.description)?;

        if !company.recent_news.is_empty() {
            writeln!(out, "\nRecent News:")?;
            write_bullets(out, company.recent_news.iter().map(String::as_str), 3)?;
        }

        writeln!(out, "\nFit Signals:")?;
        write_bullets(out, lead.fit_signals.iter().map(String::as_str), usize::MAX)?;

        if !lead.risk_signals.is_empty() {
            writeln!(out, "\nRisk Signals:")?;
            write_bullets(out, lead.risk_signals.iter().map(String::as_str), usize::MAX)?;
        }

        writeln!(out, "\nRecommended Action:\n{}", lead.recommended_action)?;
        writeln!(out, "\nReasoning:\n{}", lead.reasoning)?;
        Ok(())
    }
}

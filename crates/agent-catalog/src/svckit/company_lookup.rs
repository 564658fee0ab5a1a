//! Company Lookup Tool
//!
//! Firmographic enrichment for lead research. Known companies come from a
//! small built-in directory; anything else returns the demo-mode payload
//! naming the CRM key that would enable live data.

use async_trait::async_trait;
use serde::Serialize;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};
use agent_runtime::credentials;

const CRM_SERVICE: &str = "hubspot";

/// A directory entry
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CompanyProfile {
    pub name: &'static str,
    pub domain: &'static str,
    pub industry: &'static str,
    pub employees: u32,
    pub description: &'static str,
    pub recent_news: &'static [&'static str],
}

const DIRECTORY: &[CompanyProfile] = &[
    CompanyProfile {
        name: "Acme Corp",
        domain: "acme.com",
        industry: "technology",
        employees: 420,
        description: "Workflow automation platform for mid-market operations teams",
        recent_news: &[
            "Raised a $40M Series C",
            "Hiring 30 engineers across data and platform teams",
        ],
    },
    CompanyProfile {
        name: "Globex",
        domain: "globex.io",
        industry: "manufacturing",
        employees: 2_300,
        description: "Industrial sensor maker moving its fleet analytics to the cloud",
        recent_news: &["Opened a plant in Monterrey"],
    },
    CompanyProfile {
        name: "Initech",
        domain: "initech.dev",
        industry: "technology",
        employees: 35,
        description: "Seed-stage developer tooling startup",
        recent_news: &[],
    },
];

/// Find a company by name or by the domain of a contact email
pub fn find_company(query: &str) -> Option<&'static CompanyProfile> {
    let query = query.trim().to_ascii_lowercase();
    let domain = query.rsplit_once('@').map_or(query.as_str(), |(_, d)| d);
    DIRECTORY
        .iter()
        .find(|c| c.name.to_ascii_lowercase() == query || c.domain == domain)
}

/// Tool for company research
pub struct CompanyLookupTool;

#[async_trait]
impl Tool for CompanyLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "company_lookup".into(),
            description: "Look up firmographics (industry, headcount, recent news) for a company by name or contact email.".into(),
            parameters: vec![ParameterSchema::required(
                "query",
                "string",
                "Company name or contact email (e.g., 'Acme Corp' or 'john@acme.com')",
            )],
            category: Some("research".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.arg_str("query")?;

        let Some(company) = find_company(query) else {
            tracing::debug!(query, "Company not in directory, returning demo payload");
            let payload = credentials::fallback_response(CRM_SERVICE, query);
            return Ok(ToolResult::success("company_lookup", payload.to_string()).with_data(payload));
        };

        let mut output = format!(
            "{} ({})\n  Industry:  {}\n  Employees: {}\n  About:     {}\n",
            company.name, company.domain, company.industry, company.employees, company.description
        );
        if !company.recent_news.is_empty() {
            output.push_str("  News:\n");
            for item in company.recent_news {
                output.push_str("    - ");
                output.push_str(item);
                output.push('\n');
            }
        }

        Ok(ToolResult::success("company_lookup", output).with_data(serde_json::to_value(company)?))
    }
}

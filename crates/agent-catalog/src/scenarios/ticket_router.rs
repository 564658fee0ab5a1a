//! Ticket Router
//!
//! Classifies, prioritizes and routes a support ticket. The answer nests
//! four records; urgency and impact are bounded 1-10.

use std::io::Write;

use serde_json::json;

use agent_core::{Config, FieldSpec, FieldType, OutputContract, Result, StructuredOutput};

use super::{Scenario, rule, write_bullets};

const CATEGORIES: [&str; 5] = ["billing", "technical", "account", "sales", "product"];
const PRIORITIES: [&str; 4] = ["critical", "high", "medium", "low"];

const SAMPLE_BODY: &str = "Hi,

I tried to reset my password yesterday but now I can't log in at all.
I've tried multiple times and even cleared my browser cache.
This is urgent as I have a presentation tomorrow and need to access
my files. I'm on the Enterprise plan.

Please help ASAP!

John Smith
Acme Corp";

pub struct TicketRouter;

fn classification() -> Result<OutputContract> {
    OutputContract::builder("TicketClassification")
        .field(
            FieldSpec::string("category", "Primary category (billing/technical/account/sales/product)")
                .one_of(&CATEGORIES),
        )
        .field(FieldSpec::string("subcategory", "More specific subcategory"))
        .field(FieldSpec::string("intent", "Customer's primary intent"))
        .field(
            FieldSpec::string("sentiment", "positive/neutral/negative/frustrated")
                .one_of(&["positive", "neutral", "negative", "frustrated"]),
        )
        .field(
            FieldSpec::string("complexity", "simple/moderate/complex")
                .one_of(&["simple", "moderate", "complex"]),
        )
        .build()
}

fn priority() -> Result<OutputContract> {
    OutputContract::builder("PriorityAssessment")
        .field(FieldSpec::string("priority", "critical/high/medium/low").one_of(&PRIORITIES))
        .field(FieldSpec::integer("urgency_score", "Urgency 1-10").bounded(1.0, 10.0))
        .field(FieldSpec::integer("impact_score", "Business impact 1-10").bounded(1.0, 10.0))
        .field(FieldSpec::string("sla_tier", "SLA tier based on customer type"))
        .field(FieldSpec::string("response_target", "Target response time"))
        .build()
}

fn extracted_info() -> Result<OutputContract> {
    let empty = || json!([]);
    OutputContract::builder("ExtractedInfo")
        .field(FieldSpec::string("customer_name", "Customer name if mentioned").optional())
        .field(FieldSpec::string("company", "Company name if mentioned").optional())
        .field(FieldSpec::string("product_area", "Product/feature mentioned").optional())
        .field(
            FieldSpec::list("error_messages", FieldType::String, "Any error messages")
                .with_default(empty()),
        )
        .field(
            FieldSpec::list("steps_tried", FieldType::String, "Steps customer already tried")
                .with_default(empty()),
        )
        .field(FieldSpec::string("timeline", "When issue started or deadline").optional())
        .build()
}

fn routing() -> Result<OutputContract> {
    OutputContract::builder("RoutingDecision")
        .field(FieldSpec::string("primary_team", "Team to route to"))
        .field(FieldSpec::string("backup_team", "Backup team if primary unavailable").optional())
        .field(FieldSpec::boolean("specialist_needed", "Requires specialist attention"))
        .field(FieldSpec::string("escalation_path", "Escalation path if needed"))
        .build()
}

impl Scenario for TicketRouter {
    fn name(&self) -> &'static str {
        "ticket_router"
    }

    fn title(&self) -> &'static str {
        "Ticket Router"
    }

    fn description(&self) -> &'static str {
        "Classify, prioritize and route support tickets"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("ticket_subject", "Cannot access my account after password reset")
            .with("ticket_body", SAMPLE_BODY)
            .with("customer_tier", "enterprise")
            .with("teams", CATEGORIES.join(","))
    }

    fn instructions(&self, config: &Config) -> Result<Vec<String>> {
        Ok(vec![
            "You are an expert support ticket router and classifier.".into(),
            "Analyze tickets to determine optimal routing and priority.".into(),
            String::new(),
            format!("Available Teams: {}", config.get_str("teams")?),
            format!("Customer Tier: {}", config.get_str("customer_tier")?),
            String::new(),
            "Classification Categories:".into(),
            "- billing: Payment, invoices, subscriptions, refunds".into(),
            "- technical: Bugs, errors, integrations, performance".into(),
            "- account: Login, access, settings, permissions".into(),
            "- sales: Upgrades, quotes, enterprise features".into(),
            "- product: Feature requests, feedback, roadmap questions".into(),
            String::new(),
            "Priority Guidelines:".into(),
            "- CRITICAL: System down, data loss, security breach".into(),
            "- HIGH: Major feature broken, blocking customer work".into(),
            "- MEDIUM: Feature degraded, workaround available".into(),
            "- LOW: Questions, minor issues, feature requests".into(),
            String::new(),
            "SLA Tiers:".into(),
            "- Enterprise: 1hr response, 4hr resolution".into(),
            "- Professional: 4hr response, 24hr resolution".into(),
            "- Standard: 24hr response, 72hr resolution".into(),
            String::new(),
            "Extract all relevant information and route appropriately.".into(),
        ])
    }

    fn contract(&self) -> Result<OutputContract> {
        OutputContract::builder("TicketRouting")
            .description("Complete ticket routing decision")
            .field(FieldSpec::string("ticket_id", "Generated ticket reference"))
            .field(FieldSpec::record("classification", classification()?, "Ticket classification"))
            .field(FieldSpec::record("priority", priority()?, "Priority assessment"))
            .field(FieldSpec::record("extracted_info", extracted_info()?, "Extracted information"))
            .field(FieldSpec::record("routing", routing()?, "Routing decision"))
            .field(FieldSpec::string("suggested_response_template", "Suggested initial response"))
            .field(FieldSpec::string("similar_tickets_hint", "Hint about similar past issues"))
            .field(FieldSpec::boolean(
                "auto_resolution_possible",
                "Can be auto-resolved with KB article",
            ))
            .field(FieldSpec::list(
                "recommended_kb_articles",
                FieldType::String,
                "Relevant knowledge base articles",
            ))
            .build()
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Route this support ticket:\n\nCustomer Tier: {}\nSubject: {}\n\nBody:\n{}\n\n\
             Classify, prioritize, and route this ticket appropriately.",
            config.get_str("customer_tier")?,
            config.get_str("ticket_subject")?,
            config.get_str("ticket_body")?,
        ))
    }

    fn sample_response(&self, config: &Config) -> Result<String> {
        let tier = config.get_str("customer_tier")?;
        let (sla, target) = match tier.to_ascii_lowercase().as_str() {
            "enterprise" => ("Enterprise", "1 hour"),
            "professional" => ("Professional", "4 hours"),
            _ => ("Standard", "24 hours"),
        };

        Ok(json!({
            "ticket_id": "TKT-20241-0042",
            "classification": {
                "category": "account",
                "subcategory": "password reset",
                "intent": "Regain access to account",
                "sentiment": "frustrated",
                "complexity": "simple",
            },
            "priority": {
                "priority": "high",
                "urgency_score": 8,
                "impact_score": 6,
                "sla_tier": sla,
                "response_target": target,
            },
            "extracted_info": {
                "customer_name": "John Smith",
                "company": "Acme Corp",
                "product_area": "Authentication",
                "steps_tried": ["Multiple login attempts", "Cleared browser cache"],
                "timeline": "Presentation tomorrow",
            },
            "routing": {
                "primary_team": "account",
                "backup_team": "technical",
                "specialist_needed": false,
                "escalation_path": "Account team lead, then identity engineering",
            },
            "suggested_response_template": "Hi John, sorry for the trouble logging in after your reset. We have invalidated the old reset token and sent a fresh link to your email.",
            "similar_tickets_hint": "Stale sessions after reset are usually fixed by a new reset link",
            "auto_resolution_possible": true,
            "recommended_kb_articles": ["Resetting your password", "Clearing stale sessions"],
        })
        .to_string())
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        let text = |record: &Option<StructuredOutput>, field: &str| {
            record
                .as_ref()
                .and_then(|r| r.str(field))
                .unwrap_or_default()
                .to_string()
        };

        rule(out, 50)?;
        writeln!(out, "TICKET: {}", output.str("ticket_id").unwrap_or("-"))?;
        rule(out, 50)?;

        let c = output.record("classification");
        writeln!(out, "\nClassification:")?;
        writeln!(out, "  Category: {} -> {}", text(&c, "category"), text(&c, "subcategory"))?;
        writeln!(out, "  Intent: {}", text(&c, "intent"))?;
        writeln!(
            out,
            "  Sentiment: {} | Complexity: {}",
            text(&c, "sentiment"),
            text(&c, "complexity")
        )?;

        if let Some(p) = output.record("priority") {
            writeln!(out, "\nPriority: {}", p.str("priority").unwrap_or_default().to_uppercase())?;
            writeln!(
                out,
                "  Urgency: {}/10 | Impact: {}/10",
                p.i64("urgency_score").unwrap_or_default(),
                p.i64("impact_score").unwrap_or_default()
            )?;
            writeln!(
                out,
                "  SLA: {} - Response within {}",
                p.str("sla_tier").unwrap_or_default(),
                p.str("response_target").unwrap_or_default()
            )?;
        }

        if let Some(e) = output.record("extracted_info") {
            writeln!(out, "\nExtracted Info:")?;
            for (label, field) in [
                ("Customer", "customer_name"),
                ("Company", "company"),
                ("Product Area", "product_area"),
                ("Timeline", "timeline"),
            ] {
                if let Some(value) = e.str(field) {
                    writeln!(out, "  {label}: {value}")?;
                }
            }
            let tried = e.strings("steps_tried");
            if !tried.is_empty() {
                writeln!(out, "  Already Tried: {}", tried.join(", "))?;
            }
        }

        if let Some(r) = output.record("routing") {
            writeln!(out, "\nRouting Decision:")?;
            writeln!(out, "  Route to: {}", r.str("primary_team").unwrap_or_default().to_uppercase())?;
            if let Some(backup) = r.str("backup_team") {
                writeln!(out, "  Backup: {backup}")?;
            }
            let specialist = if r.bool("specialist_needed").unwrap_or_default() { "Yes" } else { "No" };
            writeln!(out, "  Specialist Needed: {specialist}")?;
            writeln!(out, "  Escalation Path: {}", r.str("escalation_path").unwrap_or_default())?;
        }

        let resolution = if output.bool("auto_resolution_possible").unwrap_or_default() {
            "Possible"
        } else {
            "Manual handling required"
        };
        writeln!(out, "\nAuto-Resolution: {resolution}")?;

        let articles = output.strings("recommended_kb_articles");
        if !articles.is_empty() {
            writeln!(out, "\nKB Articles:")?;
            write_bullets(out, articles, 3)?;
        }

        let template = output.str("suggested_response_template").unwrap_or_default();
        let preview: String = template.chars().take(200).collect();
        writeln!(out, "\nSuggested Response:")?;
        if preview.len() < template.len() {
            writeln!(out, "  {preview}...")?;
        } else {
            writeln!(out, "  {preview}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> StructuredOutput {
        TicketRouter.contract().unwrap().parse(raw).unwrap()
    }

    #[test]
    fn test_sla_follows_customer_tier() {
        let config = TicketRouter.defaults().with("customer_tier", "standard");
        let output = parsed(&TicketRouter.sample_response(&config).unwrap());

        let priority = output.record("priority").unwrap();
        assert_eq!(priority.str("sla_tier"), Some("Standard"));
        assert_eq!(priority.str("response_target"), Some("24 hours"));
    }

    #[test]
    fn test_nested_scores_are_clamped() {
        let mut sample: serde_json::Value =
            serde_json::from_str(&TicketRouter.sample_response(&TicketRouter.defaults()).unwrap())
                .unwrap();
        sample["priority"]["urgency_score"] = json!(14);
        sample["priority"]["impact_score"] = json!(0);

        let priority = parsed(&sample.to_string()).record("priority").unwrap();
        assert_eq!(priority.i64("urgency_score"), Some(10));
        assert_eq!(priority.i64("impact_score"), Some(1));
    }

    #[test]
    fn test_missing_optional_fields_render_cleanly() {
        let mut sample: serde_json::Value =
            serde_json::from_str(&TicketRouter.sample_response(&TicketRouter.defaults()).unwrap())
                .unwrap();
        sample["extracted_info"] = json!({});
        sample["routing"].as_object_mut().unwrap().remove("backup_team");

        let mut buf = Vec::new();
        TicketRouter.render(&parsed(&sample.to_string()), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Category: account -> password reset"));
        assert!(text.contains("Route to: ACCOUNT"));
        assert!(!text.contains("Backup:"));
        assert!(!text.contains("Customer:"));
        assert!(text.contains("Auto-Resolution: Possible"));
    }

    #[test]
    fn test_instructions_list_teams() {
        let config = TicketRouter.defaults().with("teams", "billing,technical");
        let lines = TicketRouter.instructions(&config).unwrap();
        assert!(lines.contains(&"Available Teams: billing,technical".to_string()));
    }
}

//! End-to-end behaviour of single-shot agents against the scripted endpoint.

use std::sync::{Arc, Mutex};

use agent_core::{
    Agent, AgentError, Config, FieldSpec, FieldType, FunctionTool, InvocationResult,
    OutputContract, ParameterSchema, ScriptedProvider, resolve,
};
use serde_json::{Value, json};

fn lead_score() -> OutputContract {
    OutputContract::builder("LeadScore")
        .field(FieldSpec::integer("score", "Qualification score 0-100").bounded(0.0, 100.0))
        .field(FieldSpec::boolean("qualified", "Whether the lead is qualified"))
        .field(FieldSpec::string("reasoning", "Why"))
        .build()
        .unwrap()
}

fn lead_agent(provider: Arc<ScriptedProvider>) -> Agent {
    Agent::builder()
        .name("Lead Qualifier")
        .provider(provider)
        .instruction("You are a B2B lead qualification specialist.")
        .contract(lead_score())
        .build()
        .unwrap()
}

#[test]
fn test_override_wins_for_every_shared_key() {
    let cases = [
        (
            Config::new().with("a", 1).with("b", "x"),
            Some(Config::new().with("b", "y").with("c", true)),
        ),
        (Config::new(), Some(Config::new().with("only", 2.5))),
        (Config::new().with("a", 1), None),
        (
            Config::new().with("industry", "technology"),
            Some(Config::new().with("industry", "healthcare")),
        ),
    ];

    for (defaults, overrides) in &cases {
        let merged = resolve(defaults, overrides.as_ref());
        for (key, value) in defaults.iter() {
            let expected = overrides
                .as_ref()
                .and_then(|o| o.get(key))
                .unwrap_or(value);
            assert_eq!(merged.get(key), Some(expected), "key {key}");
        }
        if let Some(overrides) = overrides {
            for (key, value) in overrides.iter() {
                assert_eq!(merged.get(key), Some(value), "key {key}");
            }
        }
    }
}

#[test]
fn test_valid_payload_round_trips_field_for_field() {
    let company = OutputContract::builder("CompanyInfo")
        .field(FieldSpec::string("name", "Company name"))
        .field(FieldSpec::integer("employee_count", "Head count").optional())
        .build()
        .unwrap();
    let contract = OutputContract::builder("Profile")
        .field(FieldSpec::record("company", company, "Company details"))
        .field(FieldSpec::float("growth", "Growth rate"))
        .field(FieldSpec::boolean("public", "Listed"))
        .field(FieldSpec::list("tags", FieldType::String, "Tags"))
        .build()
        .unwrap();

    let original = json!({
        "company": {"name": "Acme Corp", "employee_count": 250},
        "growth": 3.5,
        "public": false,
        "tags": ["saas", "b2b"]
    });

    let parsed = contract.parse(&original.to_string()).unwrap();
    assert_eq!(parsed.to_json(), original);

    let wrapped = format!("Here you go:\n```json\n{original:#}\n```");
    assert_eq!(contract.parse(&wrapped).unwrap(), parsed);
}

#[tokio::test]
async fn test_undecodable_answers_never_raise_schema_mismatch() {
    let answers = [
        "I think this company is a great fit.",
        r#"{"score": "very high", "qualified": true, "reasoning": "x"}"#,
        r#"{"score": 82, "qualified": true"#,
        r#"[{"score": 82}]"#,
        r#"{"score": 82, "reasoning": "missing qualified"}"#,
        "",
    ];

    for answer in answers {
        let agent = lead_agent(Arc::new(ScriptedProvider::new().reply(answer)));
        match agent.invoke("Qualify company X").await {
            Ok(InvocationResult::Unstructured(text)) => assert_eq!(text, answer),
            other => panic!("expected unstructured result for {answer:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_duplicate_field_names_fail_at_construction() {
    let result = OutputContract::builder("Dup")
        .field(FieldSpec::string("score", "first"))
        .field(FieldSpec::integer("score", "second"))
        .build();
    assert!(matches!(result, Err(AgentError::ContractDefinition(_))));
}

#[tokio::test]
async fn test_same_request_twice_gives_equal_results() {
    let provider = Arc::new(ScriptedProvider::repeating(
        r#"{"score": 64, "qualified": false, "reasoning": "too small"}"#,
    ));
    let agent = lead_agent(provider);

    let first = agent.invoke("Qualify company X").await.unwrap();
    let second = agent.invoke("Qualify company X").await.unwrap();
    assert_eq!(first, second);
    assert!(first.is_structured());
}

#[tokio::test]
async fn test_lead_qualifier_reads_structured_payload() {
    let provider = Arc::new(ScriptedProvider::new().reply(
        r#"{"score": 82, "qualified": true, "reasoning": "strong fit"}"#,
    ));
    let agent = lead_agent(Arc::clone(&provider));

    let result = agent
        .invoke("Qualify company X with attribute Y")
        .await
        .unwrap();
    let output = result.structured().expect("structured result");
    assert_eq!(output.i64("score"), Some(82));
    assert_eq!(output.bool("qualified"), Some(true));
    assert_eq!(output.str("reasoning"), Some("strong fit"));

    let request = &provider.requests()[0];
    assert_eq!(
        request.last_user_message(),
        Some("Qualify company X with attribute Y")
    );
}

#[tokio::test]
async fn test_prose_answer_is_returned_verbatim() {
    let prose = "Company X looks promising, but I could not produce a score.";
    let agent = lead_agent(Arc::new(ScriptedProvider::new().reply(prose)));

    let result = agent.invoke("Qualify company X").await.unwrap();
    assert_eq!(result, InvocationResult::Unstructured(prose.to_string()));
}

#[tokio::test]
async fn test_add_tool_is_called_once_and_result_surfaces() {
    let seen: Arc<Mutex<Vec<(f64, f64)>>> = Arc::default();
    let recorder = Arc::clone(&seen);
    let add = FunctionTool::new(
        "add",
        "Add two numbers",
        vec![
            ParameterSchema::required("a", "number", "First addend"),
            ParameterSchema::required("b", "number", "Second addend"),
        ],
        move |call| {
            let (a, b) = (call.arg_f64("a")?, call.arg_f64("b")?);
            recorder.lock().unwrap().push((a, b));
            Ok((a + b).to_string())
        },
    );

    let contract = OutputContract::builder("Sum")
        .field(FieldSpec::string("explanation", "How the answer was found"))
        .build()
        .unwrap();

    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(
                "I'll add those.\n```tool\n{\"tool\": \"add\", \"arguments\": {\"a\": 17, \"b\": 25}}\n```",
            )
            .reply(r#"{"explanation": "17 + 25 = 42"}"#),
    );
    let agent = Agent::builder()
        .provider(Arc::clone(&provider) as Arc<dyn agent_core::LlmProvider>)
        .instruction("Use the add tool for arithmetic.")
        .tool(add)
        .contract(contract)
        .build()
        .unwrap();

    let invocation = agent.run("What is 17 plus 25?").await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(17.0, 25.0)]);
    assert_eq!(invocation.tool_trace.len(), 1);
    assert_eq!(invocation.tool_trace[0].result.output, "42");

    let explanation = invocation
        .result
        .structured()
        .and_then(|o| o.str("explanation"))
        .unwrap();
    assert!(explanation.contains("42"));

    let tool_turn = provider.requests()[1].messages.last().cloned().unwrap();
    assert_eq!(tool_turn.content, "[Tool 'add' returned]\n42");
}

#[tokio::test]
async fn test_out_of_range_score_is_clamped() {
    let agent = lead_agent(Arc::new(ScriptedProvider::new().reply(
        r#"{"score": 140, "qualified": "yes", "reasoning": "over the top"}"#,
    )));

    let result = agent.invoke("Qualify company X").await.unwrap();
    let output = result.into_structured().unwrap();
    assert_eq!(output.get("score"), Some(&Value::from(100)));
    assert_eq!(output.bool("qualified"), Some(true));
}

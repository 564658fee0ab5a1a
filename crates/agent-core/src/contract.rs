//! Output Contracts
//!
//! An [`OutputContract`] is the declared shape a model response must take:
//! a named record with ordered, typed, described fields. Contracts are data,
//! not Rust types, so one agent crate can carry dozens of scenario shapes
//! without a struct per scenario.
//!
//! The same contract is used three ways:
//!
//! - rendered to JSON Schema for providers with a native structured mode,
//! - rendered to prompt text for providers without one,
//! - used to decode and coerce the raw response into a [`StructuredOutput`].
//!
//! ```rust,ignore
//! let contract = OutputContract::builder("LeadScore")
//!     .field(FieldSpec::integer("score", "Lead score 0-100").bounded(0.0, 100.0))
//!     .field(FieldSpec::boolean("qualified", "Worth pursuing"))
//!     .field(FieldSpec::string("reasoning", "Explanation of the score"))
//!     .build()?;
//!
//! let output = contract.parse(r#"{"score": 82, "qualified": true, "reasoning": "strong fit"}"#)?;
//! assert_eq!(output.i64("score"), Some(82));
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value, json};

use crate::error::{AgentError, Result, SchemaMismatch};

/// Semantic type of a contract field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List(Box<FieldType>),
    Record(Box<OutputContract>),
}

impl FieldType {
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    pub fn record(contract: OutputContract) -> Self {
        Self::Record(Box::new(contract))
    }

    /// The scalar type at the bottom of any list nesting
    fn scalar(&self) -> &Self {
        match self {
            Self::List(inner) => inner.scalar(),
            other => other,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self.scalar(), Self::Integer | Self::Float)
    }

    fn is_textual(&self) -> bool {
        matches!(self.scalar(), Self::String)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Record(contract) => write!(f, "record {}", contract.name),
        }
    }
}

/// Inclusive numeric bounds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    fn contains(&self, n: f64) -> bool {
        self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n <= max)
    }

    fn clamp(&self, n: f64) -> f64 {
        let n = self.min.map_or(n, |min| n.max(min));
        self.max.map_or(n, |max| n.min(max))
    }

    /// Inclusive whole-number range, for integer fields
    #[allow(clippy::cast_possible_truncation)]
    fn integer_range(&self) -> (i64, i64) {
        (
            self.min.map_or(i64::MIN, |min| min.ceil() as i64),
            self.max.map_or(i64::MAX, |max| max.floor() as i64),
        )
    }
}

/// What to do with a numeric value outside its declared bounds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Pull the value to the nearest bound and log a warning
    #[default]
    Clamp,
    /// Treat the value as a schema mismatch
    Reject,
}

/// A single field declaration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    /// May be omitted (or null) in the response
    pub optional: bool,
    /// Value used when an optional field is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Allowed values for string fields (matched case-insensitively)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
            optional: false,
            default: None,
            bounds: None,
            allowed: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer, description)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean, description)
    }

    pub fn list(name: impl Into<String>, item: FieldType, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::list(item), description)
    }

    pub fn record(
        name: impl Into<String>,
        contract: OutputContract,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, FieldType::record(contract), description)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Optional with a fallback value
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.optional = true;
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn bounded(mut self, min: f64, max: f64) -> Self {
        self.bounds = Some(Bounds::between(min, max));
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    #[must_use]
    pub fn one_of<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.allowed = values.iter().map(|v| v.as_ref().to_string()).collect();
        self
    }

    fn validate(&self, contract: &str) -> Result<()> {
        let err = |msg: String| {
            Err(AgentError::ContractDefinition(format!(
                "{contract}.{}: {msg}",
                self.name
            )))
        };

        if self.name.trim().is_empty() {
            return Err(AgentError::ContractDefinition(format!(
                "{contract}: field names must not be empty"
            )));
        }

        if let Some(bounds) = &self.bounds {
            if !self.field_type.is_numeric() {
                return err(format!("bounds declared on non-numeric type {}", self.field_type));
            }
            let finite = bounds.min.is_none_or(f64::is_finite) && bounds.max.is_none_or(f64::is_finite);
            if !finite {
                return err("bounds must be finite".into());
            }
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return err(format!("min {min} exceeds max {max}"));
                }
            }
        }

        if !self.allowed.is_empty() {
            if !self.field_type.is_textual() {
                return err(format!(
                    "allowed values declared on non-string type {}",
                    self.field_type
                ));
            }
            if self.allowed.iter().any(|v| v.trim().is_empty()) {
                return err("allowed values must not be empty".into());
            }
        }

        if let Some(default) = &self.default {
            if !default.is_null() {
                if let Err(mismatch) =
                    coerce(&self.field_type, default, self, BoundsPolicy::Reject, &self.name)
                {
                    return err(format!("default value invalid: {}", mismatch.reason));
                }
            }
        }

        Ok(())
    }
}

/// A declared response shape
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputContract {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    fields: Vec<FieldSpec>,
    bounds_policy: BoundsPolicy,
}

impl OutputContract {
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub const fn bounds_policy(&self) -> BoundsPolicy {
        self.bounds_policy
    }

    /// Decode a raw model response and coerce it into this contract.
    ///
    /// Accepts bare JSON, a fenced ```json block, or JSON embedded in prose
    /// (the outermost `{...}` span).
    pub fn parse(&self, raw: &str) -> std::result::Result<StructuredOutput, SchemaMismatch> {
        let value = extract_json_object(raw)
            .ok_or_else(|| SchemaMismatch::new("$", "no JSON object found in response"))?;
        self.from_value(&value)
    }

    /// Coerce an already-decoded JSON value into this contract
    pub fn from_value(&self, value: &Value) -> std::result::Result<StructuredOutput, SchemaMismatch> {
        self.coerce_object(value, "")
    }

    fn coerce_object(
        &self,
        value: &Value,
        prefix: &str,
    ) -> std::result::Result<StructuredOutput, SchemaMismatch> {
        let at = if prefix.is_empty() { "$" } else { prefix };
        let object = value
            .as_object()
            .ok_or_else(|| SchemaMismatch::new(at, format!("expected object for {}", self.name)))?;

        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let path = if prefix.is_empty() {
                spec.name.clone()
            } else {
                format!("{prefix}.{}", spec.name)
            };

            let coerced = match object.get(&spec.name) {
                None | Some(Value::Null) if spec.optional => {
                    spec.default.clone().unwrap_or(Value::Null)
                }
                None | Some(Value::Null) => {
                    return Err(SchemaMismatch::new(path, "missing required field"));
                }
                Some(raw) => coerce(&spec.field_type, raw, spec, self.bounds_policy, &path)?,
            };
            fields.push((spec.name.clone(), coerced));
        }

        Ok(StructuredOutput {
            contract: self.name.clone(),
            fields,
        })
    }

    /// JSON Schema for providers with a native structured-output mode
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|spec| (spec.name.clone(), field_schema(&spec.field_type, spec)))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| !f.optional)
            .map(|f| f.name.as_str())
            .collect();

        let mut schema = json!({
            "type": "object",
            "title": self.name,
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        });
        if let Some(description) = &self.description {
            schema["description"] = json!(description);
        }
        schema
    }

    /// Prompt text describing the expected response, for providers that
    /// only take free-form instructions.
    pub fn prompt_section(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.json_schema()).unwrap_or_default();

        let mut section = String::from("## Response Format\n\n");
        section.push_str(&format!(
            "Respond with a single JSON object matching the `{}` schema below.\n\n",
            self.name
        ));
        section.push_str("```json\n");
        section.push_str(&schema);
        section.push_str("\n```\n\n");
        section.push_str("Rules:\n");
        section.push_str("1. Output only the JSON object, optionally wrapped in a ```json block\n");
        section.push_str("2. Every required field must be present\n");
        section.push_str("3. Field types must match the schema exactly\n");
        section
    }
}

/// Builder for [`OutputContract`]; `build` validates the declaration
#[derive(Debug)]
pub struct ContractBuilder {
    name: String,
    description: Option<String>,
    fields: Vec<FieldSpec>,
    bounds_policy: BoundsPolicy,
}

impl ContractBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            bounds_policy: BoundsPolicy::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    #[must_use]
    pub fn bounds_policy(mut self, policy: BoundsPolicy) -> Self {
        self.bounds_policy = policy;
        self
    }

    pub fn build(self) -> Result<OutputContract> {
        if self.name.trim().is_empty() {
            return Err(AgentError::ContractDefinition(
                "contract name must not be empty".into(),
            ));
        }
        if self.fields.is_empty() {
            return Err(AgentError::ContractDefinition(format!(
                "{} declares no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(AgentError::ContractDefinition(format!(
                    "{}: duplicate field '{}'",
                    self.name, field.name
                )));
            }
            field.validate(&self.name)?;
        }

        Ok(OutputContract {
            name: self.name,
            description: self.description,
            fields: self.fields,
            bounds_policy: self.bounds_policy,
        })
    }
}

/// A response coerced into a contract, fields in declaration order
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredOutput {
    contract: String,
    fields: Vec<(String, Value)>,
}

impl StructuredOutput {
    pub fn contract_name(&self) -> &str {
        &self.contract
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// List items; empty when the field is absent or null
    pub fn list(&self, name: &str) -> &[Value] {
        self.get(name)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// String items of a list field
    pub fn strings(&self, name: &str) -> Vec<&str> {
        self.list(name).iter().filter_map(Value::as_str).collect()
    }

    /// Nested record as its own view
    pub fn record(&self, name: &str) -> Option<Self> {
        let object = self.get(name)?.as_object()?;
        Some(Self {
            contract: name.to_string(),
            fields: object.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        })
    }

    /// Re-encode as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect())
    }

    /// Deserialize into a caller-defined type
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl Serialize for StructuredOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn coerce(
    field_type: &FieldType,
    raw: &Value,
    spec: &FieldSpec,
    policy: BoundsPolicy,
    path: &str,
) -> std::result::Result<Value, SchemaMismatch> {
    let mismatch = |expected: &str| {
        SchemaMismatch::new(path, format!("expected {expected}, got {}", describe(raw)))
    };

    match field_type {
        FieldType::String => {
            let text = raw.as_str().ok_or_else(|| mismatch("string"))?;
            if spec.allowed.is_empty() {
                return Ok(Value::String(text.to_string()));
            }
            spec.allowed
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(text.trim()))
                .map(|allowed| Value::String(allowed.clone()))
                .ok_or_else(|| {
                    SchemaMismatch::new(
                        path,
                        format!("'{text}' is not one of {}", spec.allowed.join("/")),
                    )
                })
        }
        FieldType::Integer => {
            let n = integer_of(raw).ok_or_else(|| mismatch("integer"))?;
            Ok(Value::Number(apply_integer_bounds(n, spec, policy, path)?.into()))
        }
        FieldType::Float => {
            let n = float_of(raw).ok_or_else(|| mismatch("float"))?;
            let bounded = apply_bounds(n, spec, policy, path)?;
            Number::from_f64(bounded)
                .map(Value::Number)
                .ok_or_else(|| mismatch("finite float"))
        }
        FieldType::Boolean => bool_of(raw)
            .map(Value::Bool)
            .ok_or_else(|| mismatch("boolean")),
        FieldType::List(inner) => {
            let items = raw.as_array().ok_or_else(|| mismatch("list"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce(inner, item, spec, policy, &format!("{path}[{i}]")))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        FieldType::Record(contract) => contract
            .coerce_object(raw, path)
            .map(|output| output.to_json()),
    }
}

fn apply_bounds(
    n: f64,
    spec: &FieldSpec,
    policy: BoundsPolicy,
    path: &str,
) -> std::result::Result<f64, SchemaMismatch> {
    let Some(bounds) = spec.bounds else {
        return Ok(n);
    };
    if bounds.contains(n) {
        return Ok(n);
    }
    match policy {
        BoundsPolicy::Reject => Err(SchemaMismatch::new(
            path,
            format!("{n} outside bounds {}", describe_bounds(&bounds)),
        )),
        BoundsPolicy::Clamp => {
            let clamped = bounds.clamp(n);
            tracing::warn!(field = %path, value = n, clamped, "Clamped out-of-bounds value");
            Ok(clamped)
        }
    }
}

fn apply_integer_bounds(
    n: i64,
    spec: &FieldSpec,
    policy: BoundsPolicy,
    path: &str,
) -> std::result::Result<i64, SchemaMismatch> {
    let Some(bounds) = spec.bounds else {
        return Ok(n);
    };
    let (min, max) = bounds.integer_range();
    if (min..=max).contains(&n) {
        return Ok(n);
    }
    match policy {
        BoundsPolicy::Reject => Err(SchemaMismatch::new(
            path,
            format!("{n} outside bounds {}", describe_bounds(&bounds)),
        )),
        BoundsPolicy::Clamp => {
            let clamped = n.clamp(min, max);
            tracing::warn!(field = %path, value = n, clamped, "Clamped out-of-bounds value");
            Ok(clamped)
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integer_of(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn float_of(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn bool_of(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => {
            let preview: String = s.chars().take(40).collect();
            format!("string \"{preview}\"")
        }
        Value::Array(_) => "list".into(),
        Value::Object(_) => "object".into(),
    }
}

fn describe_bounds(bounds: &Bounds) -> String {
    match (bounds.min, bounds.max) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => "(none)".into(),
    }
}

fn field_schema(field_type: &FieldType, spec: &FieldSpec) -> Value {
    let mut schema = item_schema(field_type, spec);
    if let Some(object) = schema.as_object_mut() {
        object.insert("description".into(), json!(spec.description));
    }
    schema
}

fn item_schema(field_type: &FieldType, spec: &FieldSpec) -> Value {
    match field_type {
        FieldType::String => {
            let mut s = json!({ "type": "string" });
            if !spec.allowed.is_empty() {
                s["enum"] = json!(spec.allowed);
            }
            s
        }
        FieldType::Integer | FieldType::Float => {
            let kind = if *field_type == FieldType::Integer { "integer" } else { "number" };
            let mut s = json!({ "type": kind });
            if let Some(bounds) = spec.bounds {
                if let Some(min) = bounds.min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = bounds.max {
                    s["maximum"] = json!(max);
                }
            }
            s
        }
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::List(inner) => json!({
            "type": "array",
            "items": item_schema(inner, spec),
        }),
        FieldType::Record(contract) => contract.json_schema(),
    }
}

/// Locate the JSON object in a model response
pub(crate) fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    for fence in ["```json", "```JSON", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body = &trimmed[start + fence.len()..];
            if let Some(end) = body.find("```") {
                if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body[..end].trim()) {
                    return Some(value);
                }
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

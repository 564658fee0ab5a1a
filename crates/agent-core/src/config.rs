//! Agent Configuration
//!
//! Every agent ships a table of built-in defaults. Callers (CLI flags, tests,
//! other programs) pass overrides that are shallowly merged on top with
//! [`resolve`]. Values are plain scalars so the same table can be driven
//! from `--set key=value` flags, JSON, or code.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// A single configuration value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    /// Infer a value from command-line text.
    ///
    /// `true`/`false` become booleans, integral text becomes an integer,
    /// other numeric text a float, anything else stays a string.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        Self::String(trimmed.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered option-name → value mapping
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a `key=value` assignment (as passed to `--set`)
    pub fn parse_assignment(raw: &str) -> Result<(String, ConfigValue)> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| AgentError::Config(format!("expected key=value, got '{raw}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AgentError::Config(format!("empty key in '{raw}'")));
        }
        Ok((key.to_string(), ConfigValue::parse_literal(value)))
    }

    /// Required string value. Non-string scalars are rendered as text.
    pub fn get_str(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(ToString::to_string)
            .ok_or_else(|| missing(key))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        let value = self.get(key).ok_or_else(|| missing(key))?;
        value
            .as_i64()
            .ok_or_else(|| AgentError::Config(format!("'{key}' must be an integer, got {value}")))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        let value = self.get(key).ok_or_else(|| missing(key))?;
        value
            .as_f64()
            .ok_or_else(|| AgentError::Config(format!("'{key}' must be a number, got {value}")))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get(key).ok_or_else(|| missing(key))?;
        value
            .as_bool()
            .ok_or_else(|| AgentError::Config(format!("'{key}' must be a boolean, got {value}")))
    }

    /// Substitute `{key}` placeholders with configuration values.
    ///
    /// Unknown placeholders are left untouched. Substituted values are
    /// inserted verbatim and never expanded again.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let found = after
                .find('}')
                .and_then(|close| self.values.get(&after[..close]).map(|value| (close, value)));
            match found {
                Some((close, value)) => {
                    out.push_str(&value.to_string());
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn missing(key: &str) -> AgentError {
    AgentError::Config(format!("missing configuration key '{key}'"))
}

/// Merge caller overrides on top of built-in defaults.
///
/// Every default key is kept, an override replaces the value for its key,
/// and override keys unknown to the defaults are carried through.
pub fn resolve(defaults: &Config, overrides: Option<&Config>) -> Config {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        for (key, value) in &overrides.values {
            merged.values.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        Config::new()
            .with("company_name", "Acme Corp")
            .with("industry", "technology")
            .with("min_employees", 50)
    }

    #[test]
    fn test_override_wins_per_key() {
        let overrides = Config::new().with("industry", "healthcare");
        let merged = resolve(&defaults(), Some(&overrides));

        assert_eq!(merged.get_str("industry").unwrap(), "healthcare");
        assert_eq!(merged.get_str("company_name").unwrap(), "Acme Corp");
        assert_eq!(merged.get_i64("min_employees").unwrap(), 50);
    }

    #[test]
    fn test_unknown_override_keys_are_kept() {
        let overrides = Config::new().with("region", "EMEA");
        let merged = resolve(&defaults(), Some(&overrides));

        assert_eq!(merged.len(), 4);
        assert_eq!(merged.get_str("region").unwrap(), "EMEA");
    }

    #[test]
    fn test_absent_overrides_return_defaults() {
        assert_eq!(resolve(&defaults(), None), defaults());
        assert_eq!(resolve(&defaults(), Some(&Config::new())), defaults());
    }

    #[test]
    fn test_merged_keys_are_the_union() {
        let d = defaults();
        let o = Config::new().with("industry", "retail").with("tier", "gold");
        let merged = resolve(&d, Some(&o));

        for key in d.keys().chain(o.keys()) {
            assert!(merged.contains_key(key), "missing {key}");
        }
        for (key, value) in o.iter() {
            assert_eq!(merged.get(key), Some(value));
        }
    }

    #[test]
    fn test_parses_assignments_with_type_inference() {
        assert_eq!(
            Config::parse_assignment("min_employees=200").unwrap(),
            ("min_employees".into(), ConfigValue::Integer(200))
        );
        assert_eq!(
            Config::parse_assignment("strict=true").unwrap().1,
            ConfigValue::Bool(true)
        );
        assert_eq!(
            Config::parse_assignment("ratio=0.25").unwrap().1,
            ConfigValue::Float(0.25)
        );
        assert_eq!(
            Config::parse_assignment("email=a=b@example.com").unwrap().1,
            ConfigValue::String("a=b@example.com".into())
        );
        assert_eq!(
            Config::parse_assignment("name= Acme ").unwrap().1,
            ConfigValue::String("Acme".into())
        );
        assert!(Config::parse_assignment("no-equals").is_err());
        assert!(Config::parse_assignment("=value").is_err());
    }

    #[test]
    fn test_typed_getters_reject_wrong_types() {
        let cfg = defaults();
        assert!(cfg.get_i64("industry").is_err());
        assert!(cfg.get_bool("missing").is_err());
        assert_eq!(cfg.get_f64("min_employees").unwrap(), 50.0);
    }

    #[test]
    fn test_renders_placeholders() {
        let cfg = defaults();
        assert_eq!(
            cfg.render("- Target Industry: {industry} ({min_employees}+ staff) {unknown}"),
            "- Target Industry: technology (50+ staff) {unknown}"
        );
    }

    #[test]
    fn test_rendered_values_are_not_expanded_again() {
        let cfg = Config::new()
            .with("company_name", "{industry} Labs")
            .with("industry", "tech");
        assert_eq!(cfg.render("Company: {company_name}"), "Company: {industry} Labs");
        assert_eq!(cfg.render("{{industry}} in {industry}"), "{tech} in tech");
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let json = serde_json::to_value(defaults()).unwrap();
        assert_eq!(json["min_employees"], 50);
        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back, defaults());
    }
}

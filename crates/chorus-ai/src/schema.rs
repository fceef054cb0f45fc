//! Declarative parameter schemas.
//!
//! Model parameters, extension parameters and tool inputs all share one
//! schema type. A schema parses loosely-typed JSON into a validated
//! [`Params`] object, filling defaults along the way. Defaults may be read
//! from the engine's environment map at parse time, which is how provider
//! credentials reach a model without being part of the user's selection.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::error::{ValidationError, ValidationIssue};

/// Validated parameter object.
pub type Params = Map<String, Value>;

/// Environment map consulted by [`DefaultValue::FromEnv`].
pub type Env = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Number { min: Option<f64>, max: Option<f64> },
    Integer { min: Option<i64>, max: Option<i64> },
    String,
    Boolean,
    Enum(Vec<String>),
}

impl FieldKind {
    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Number { .. } => "number",
            FieldKind::Integer { .. } => "integer",
            FieldKind::String | FieldKind::Enum(_) => "string",
            FieldKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(Value),
    /// Read `key` from the environment, falling back to `fallback`.
    FromEnv { key: String, fallback: Option<Value> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub default: Option<DefaultValue>,
    pub optional: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            default: None,
            optional: false,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number { min: None, max: None })
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer { min: None, max: None })
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Enum(variants.iter().map(|v| v.to_string()).collect()),
        )
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Inclusive bounds. Ignored for non-numeric kinds.
    pub fn range(mut self, lower: f64, upper: f64) -> Self {
        match &mut self.kind {
            FieldKind::Number { min, max } => {
                *min = Some(lower);
                *max = Some(upper);
            }
            FieldKind::Integer { min, max } => {
                *min = Some(lower as i64);
                *max = Some(upper as i64);
            }
            _ => {}
        }
        self
    }

    pub fn min(mut self, lower: f64) -> Self {
        match &mut self.kind {
            FieldKind::Number { min, .. } => *min = Some(lower),
            FieldKind::Integer { min, .. } => *min = Some(lower as i64),
            _ => {}
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_from_env(mut self, key: impl Into<String>, fallback: Option<Value>) -> Self {
        self.default = Some(DefaultValue::FromEnv {
            key: key.into(),
            fallback,
        });
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn resolve_default(&self, env: &Env) -> Option<Value> {
        match self.default.as_ref()? {
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::FromEnv { key, fallback } => match env.get(key) {
                Some(raw) => Some(self.coerce_env(raw)),
                None => fallback.clone(),
            },
        }
    }

    /// Environment values are strings; numeric and boolean fields parse them.
    fn coerce_env(&self, raw: &str) -> Value {
        match self.kind {
            FieldKind::Number { .. } | FieldKind::Integer { .. } | FieldKind::Boolean => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            }
            _ => Value::String(raw.to_string()),
        }
    }

    /// Whole floats given for an integer field are stored as integers, so
    /// readers using `as_i64`/`as_u64` see them.
    fn normalize(&self, value: Value) -> Value {
        match self.kind {
            FieldKind::Integer { .. } if !value.is_i64() && !value.is_u64() => {
                as_integer(&value).map(Value::from).unwrap_or(value)
            }
            _ => value,
        }
    }

    fn check(&self, value: &Value, issues: &mut Vec<ValidationIssue>) {
        let path = self.name.as_str();
        let mismatch = || {
            ValidationIssue::new(
                path,
                format!(
                    "expected {}, received {}",
                    self.kind.type_name(),
                    json_type(value)
                ),
            )
        };

        match &self.kind {
            FieldKind::Number { min, max } => {
                let Some(n) = value.as_f64() else {
                    issues.push(mismatch());
                    return;
                };
                if let Some(min) = min.filter(|min| n < *min) {
                    issues.push(ValidationIssue::new(path, format!("must be >= {min}")));
                }
                if let Some(max) = max.filter(|max| n > *max) {
                    issues.push(ValidationIssue::new(path, format!("must be <= {max}")));
                }
            }
            FieldKind::Integer { min, max } => {
                let Some(n) = as_integer(value) else {
                    issues.push(mismatch());
                    return;
                };
                if let Some(min) = min.filter(|min| n < *min) {
                    issues.push(ValidationIssue::new(path, format!("must be >= {min}")));
                }
                if let Some(max) = max.filter(|max| n > *max) {
                    issues.push(ValidationIssue::new(path, format!("must be <= {max}")));
                }
            }
            FieldKind::String => {
                if !value.is_string() {
                    issues.push(mismatch());
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    issues.push(mismatch());
                }
            }
            FieldKind::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => {}
                Some(s) => issues.push(ValidationIssue::new(
                    path,
                    format!("expected one of {}, received '{s}'", variants.join(" | ")),
                )),
                None => issues.push(mismatch()),
            },
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = json!({ "type": self.kind.type_name() });
        if !self.description.is_empty() {
            prop["description"] = json!(self.description);
        }
        match &self.kind {
            FieldKind::Number { min, max } => {
                if let Some(min) = min {
                    prop["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    prop["maximum"] = json!(max);
                }
            }
            FieldKind::Integer { min, max } => {
                if let Some(min) = min {
                    prop["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    prop["maximum"] = json!(max);
                }
            }
            FieldKind::Enum(variants) => prop["enum"] = json!(variants),
            FieldKind::String | FieldKind::Boolean => {}
        }
        // Environment-backed defaults are never rendered.
        if let Some(DefaultValue::Value(value)) = &self.default {
            prop["default"] = value.clone();
        }
        prop
    }
}

/// Ordered collection of fields describing a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    fields: Vec<FieldSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate `value` and return it with defaults applied.
    ///
    /// `null` parses as an empty object. Unknown keys are dropped. All
    /// issues are collected before returning.
    pub fn parse(&self, value: &Value, env: &Env) -> Result<Params, ValidationError> {
        let empty = Map::new();
        let input = match value {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::single(
                    "",
                    format!("expected object, received {}", json_type(other)),
                ))
            }
        };

        let mut issues = Vec::new();
        let mut parsed = Params::new();
        for field in &self.fields {
            let supplied = input.get(&field.name).filter(|v| !v.is_null()).cloned();
            let Some(value) = supplied.or_else(|| field.resolve_default(env)) else {
                if !field.optional {
                    issues.push(ValidationIssue::new(&field.name, "required"));
                }
                continue;
            };
            let value = field.normalize(value);
            field.check(&value, &mut issues);
            parsed.insert(field.name.clone(), value);
        }

        if issues.is_empty() {
            Ok(parsed)
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Draft-07 JSON Schema for this object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| !f.optional && f.default.is_none())
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_like() -> ParameterSchema {
        ParameterSchema::new()
            .field(FieldSpec::number("temperature").range(0.0, 2.0).default_value(0.5))
            .field(FieldSpec::integer("maxTokens").min(-1.0).default_value(-1))
            .field(FieldSpec::string("apiKey").default_from_env("MODEL_TEST_KEY", Some(json!(""))))
    }

    #[test]
    fn null_parses_as_defaults() {
        let params = openai_like().parse(&Value::Null, &Env::new()).unwrap();
        assert_eq!(params["temperature"], json!(0.5));
        assert_eq!(params["maxTokens"], json!(-1));
        assert_eq!(params["apiKey"], json!(""));
    }

    #[test]
    fn env_default_is_read_at_parse_time() {
        let schema = openai_like();
        let mut env = Env::new();
        env.insert("MODEL_TEST_KEY".into(), "sk-test".into());
        let params = schema.parse(&json!({}), &env).unwrap();
        assert_eq!(params["apiKey"], json!("sk-test"));

        // A supplied value wins over the environment.
        let params = schema.parse(&json!({ "apiKey": "explicit" }), &env).unwrap();
        assert_eq!(params["apiKey"], json!("explicit"));
    }

    #[test]
    fn numeric_env_defaults_are_coerced() {
        let schema = ParameterSchema::new()
            .field(FieldSpec::integer("retries").default_from_env("RETRIES", Some(json!(1))));
        let mut env = Env::new();
        env.insert("RETRIES".into(), "4".into());
        let params = schema.parse(&Value::Null, &env).unwrap();
        assert_eq!(params["retries"], json!(4));
    }

    #[test]
    fn collects_all_issues() {
        let err = openai_like()
            .parse(&json!({ "temperature": 3.5, "maxTokens": "100" }), &Env::new())
            .unwrap_err();
        let paths: Vec<_> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["temperature", "maxTokens"]);
        assert_eq!(err.issues[0].message, "must be <= 2");
        assert_eq!(err.issues[1].message, "expected integer, received string");
    }

    #[test]
    fn rejects_non_objects() {
        let err = openai_like().parse(&json!([1, 2]), &Env::new()).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "");
    }

    #[test]
    fn drops_unknown_keys() {
        let params = openai_like()
            .parse(&json!({ "stray": true }), &Env::new())
            .unwrap();
        assert!(!params.contains_key("stray"));
    }

    #[test]
    fn required_and_optional_fields() {
        let schema = ParameterSchema::new()
            .field(FieldSpec::string("city"))
            .field(FieldSpec::boolean("metric").optional());
        let err = schema.parse(&json!({}), &Env::new()).unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::new("city", "required")]);

        let params = schema.parse(&json!({ "city": "Oslo" }), &Env::new()).unwrap();
        assert!(!params.contains_key("metric"));
    }

    #[test]
    fn integers_reject_fractions() {
        let schema = ParameterSchema::new().field(FieldSpec::integer("n"));
        assert!(schema.parse(&json!({ "n": 2.0 }), &Env::new()).is_ok());
        assert!(schema.parse(&json!({ "n": 2.5 }), &Env::new()).is_err());
    }

    #[test]
    fn whole_floats_are_stored_as_integers() {
        let params = openai_like()
            .parse(&json!({ "maxTokens": 256.0 }), &Env::new())
            .unwrap();
        assert_eq!(params["maxTokens"].as_i64(), Some(256));
        assert_eq!(params["maxTokens"].as_u64(), Some(256));

        let schema = ParameterSchema::new()
            .field(FieldSpec::integer("retries").default_from_env("RETRIES", None));
        let mut env = Env::new();
        env.insert("RETRIES".into(), "3.0".into());
        let params = schema.parse(&Value::Null, &env).unwrap();
        assert_eq!(params["retries"].as_i64(), Some(3));
    }

    #[test]
    fn enum_values_are_checked() {
        let schema = ParameterSchema::new().field(
            FieldSpec::enumeration("version", &["auto", "v4", "v7"]).default_value("auto"),
        );
        assert_eq!(
            schema.parse(&Value::Null, &Env::new()).unwrap()["version"],
            json!("auto")
        );
        let err = schema
            .parse(&json!({ "version": "v9" }), &Env::new())
            .unwrap_err();
        assert!(err.issues[0].message.contains("auto | v4 | v7"));
    }

    #[test]
    fn json_schema_shape() {
        let schema = openai_like()
            .field(FieldSpec::string("city").describe("City name"))
            .to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["temperature"]["maximum"], json!(2.0));
        assert_eq!(schema["properties"]["temperature"]["default"], json!(0.5));
        assert_eq!(schema["properties"]["city"]["description"], "City name");
        assert!(schema["properties"]["apiKey"].get("default").is_none());
        assert_eq!(schema["required"], json!(["city"]));
    }
}

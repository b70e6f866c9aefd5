// Declarative tool input schemas and the single validator that interprets them

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
}

impl ParamType {
    fn json_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

/// One named parameter and its constraints.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: Vec<Value>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub min_length: Option<usize>,
}

impl ParamSpec {
    fn new(name: &'static str, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name,
            param_type,
            description: description.into(),
            required: false,
            default: None,
            allowed: Vec::new(),
            minimum: None,
            maximum: None,
            min_length: None,
        }
    }

    pub fn string(name: &'static str, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: &'static str, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: i64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    fn to_json(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.param_type.json_name()));
        schema.insert("description".into(), json!(self.description));
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if !self.allowed.is_empty() {
            schema.insert("enum".into(), Value::Array(self.allowed.clone()));
        }
        if let Some(minimum) = self.minimum {
            schema.insert("minimum".into(), json!(minimum));
        }
        if let Some(maximum) = self.maximum {
            schema.insert("maximum".into(), json!(maximum));
        }
        if let Some(min_length) = self.min_length {
            schema.insert("minLength".into(), json!(min_length));
        }
        Value::Object(schema)
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.matches(value) {
            return Err(format!("expected {}", self.param_type.json_name()));
        }

        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            let options = self
                .allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(format!("must be one of {}", options));
        }

        if let Some(n) = value.as_i64() {
            if let Some(minimum) = self.minimum {
                if n < minimum {
                    return Err(format!("must be >= {}", minimum));
                }
            }
            if let Some(maximum) = self.maximum {
                if n > maximum {
                    return Err(format!("must be <= {}", maximum));
                }
            }
        } else if value.is_u64() && self.maximum.is_some() {
            // Larger than i64::MAX
            return Err(format!("must be <= {}", self.maximum.unwrap_or(i64::MAX)));
        }

        if let (Some(min_length), Some(s)) = (self.min_length, value.as_str()) {
            if s.trim().chars().count() < min_length {
                return Err(if min_length == 1 {
                    "must not be empty".to_string()
                } else {
                    format!("must be at least {} characters", min_length)
                });
            }
        }

        Ok(())
    }
}

/// Validation failure naming the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("field `{field}` {reason}")]
pub struct SchemaViolation {
    pub field: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Ordered parameter list for one tool.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// JSON Schema rendering advertised through `tools/list`.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.to_json()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Check `arguments` against the schema and fill in defaults.
    ///
    /// `null` counts as absent. Unknown keys are kept untouched.
    pub fn validate(&self, arguments: &Value) -> Result<Arguments, SchemaViolation> {
        let mut values = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(SchemaViolation::new("arguments", "must be an object")),
        };

        for spec in &self.params {
            match values.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => spec
                    .check(value)
                    .map_err(|reason| SchemaViolation::new(spec.name, reason))?,
                None if spec.required => {
                    return Err(SchemaViolation::new(spec.name, "is required"));
                }
                None => match &spec.default {
                    Some(default) => {
                        values.insert(spec.name.to_string(), default.clone());
                    }
                    None => {
                        values.remove(spec.name);
                    }
                },
            }
        }

        for key in values.keys() {
            if !self.params.iter().any(|p| p.name == key) {
                tracing::debug!(field = %key, "Ignoring unknown argument");
            }
        }

        Ok(Arguments(values))
    }
}

/// Arguments that passed validation, defaults applied.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Non-empty string after trimming.
    pub fn non_empty_str(&self, name: &str) -> Option<String> {
        self.str(name)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }
}

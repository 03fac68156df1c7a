//! Argument schemas
//!
//! Declarative validation contract for tool arguments. Rendered as a JSON
//! schema object for the reasoning capability and checked before dispatch.

use serde_json::{json, Map, Value};

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Anything, including null
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    /// Allowed string values, empty for unrestricted
    pub allowed: Vec<String>,
}

/// Validation contract for one tool's arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    params: Vec<Param>,
    deny_unknown: bool,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter of any type
    pub fn with_param(mut self, name: &str, kind: ParamType, description: &str, required: bool) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required,
            allowed: Vec::new(),
        });
        self
    }

    /// Add a string parameter
    pub fn with_string_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(name, ParamType::String, description, required)
    }

    /// Add an integer parameter
    pub fn with_int_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(name, ParamType::Integer, description, required)
    }

    /// Add a boolean parameter
    pub fn with_bool_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(name, ParamType::Boolean, description, required)
    }

    /// Add a string parameter restricted to the given values
    pub fn with_enum_param(
        mut self,
        name: &str,
        description: &str,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            kind: ParamType::String,
            description: description.to_string(),
            required,
            allowed: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    /// Reject argument keys that are not declared
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Check `args` against the contract
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        let obj = match args {
            Value::Object(obj) => obj,
            Value::Null if self.params.iter().all(|p| !p.required) => return Ok(()),
            other => return Err(format!("arguments must be an object, got {}", type_name(other))),
        };

        for param in &self.params {
            match obj.get(&param.name) {
                None if param.required => {
                    return Err(format!("missing required parameter '{}'", param.name));
                }
                None => {}
                Some(value) => {
                    if !param.kind.accepts(value) {
                        return Err(format!(
                            "parameter '{}' has wrong type, expected {} but got {}",
                            param.name,
                            param.kind.as_str(),
                            type_name(value)
                        ));
                    }
                    if !param.allowed.is_empty() {
                        let ok = value
                            .as_str()
                            .map(|s| param.allowed.iter().any(|a| a == s))
                            .unwrap_or(false);
                        if !ok {
                            return Err(format!(
                                "parameter '{}' must be one of: {}",
                                param.name,
                                param.allowed.join(", ")
                            ));
                        }
                    }
                }
            }
        }

        if self.deny_unknown {
            if let Some(extra) = obj
                .keys()
                .find(|k| !self.params.iter().any(|p| &p.name == *k))
            {
                return Err(format!("unexpected parameter '{}'", extra));
            }
        }

        Ok(())
    }

    /// Render as a JSON schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = Map::new();
            if param.kind != ParamType::Any {
                prop.insert("type".to_string(), json!(param.kind.as_str()));
            }
            prop.insert("description".to_string(), json!(param.description));
            if !param.allowed.is_empty() {
                prop.insert("enum".to_string(), json!(param.allowed));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": !self.deny_unknown,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validation() {
        let schema = ArgumentSchema::new()
            .with_string_param("name", "Name", true)
            .with_int_param("age", "Age", false);

        assert!(schema.validate(&json!({"name": "Alice"})).is_ok());
        assert!(schema.validate(&json!({"name": "Alice", "age": 3})).is_ok());

        let err = schema.validate(&json!({})).unwrap_err();
        assert!(err.contains("missing required parameter 'name'"));

        let err = schema.validate(&json!({"name": 123})).unwrap_err();
        assert!(err.contains("expected string but got integer"));

        assert!(schema.validate(&json!({"name": "a", "age": 1.5})).is_err());
        assert!(schema.validate(&json!("Alice")).is_err());
    }

    #[test]
    fn test_null_args_allowed_without_required_params() {
        let schema = ArgumentSchema::new().with_string_param("reason", "Why", false);
        assert!(schema.validate(&Value::Null).is_ok());
        assert!(ArgumentSchema::new()
            .with_string_param("x", "X", true)
            .validate(&Value::Null)
            .is_err());
    }

    #[test]
    fn test_enum_and_unknown_keys() {
        let schema = ArgumentSchema::new()
            .with_enum_param("mode", "Mode", &["fast", "slow"], true)
            .deny_unknown();

        assert!(schema.validate(&json!({"mode": "fast"})).is_ok());
        assert!(schema.validate(&json!({"mode": "medium"})).is_err());
        let err = schema
            .validate(&json!({"mode": "slow", "extra": 1}))
            .unwrap_err();
        assert_eq!(err, "unexpected parameter 'extra'");
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = ArgumentSchema::new()
            .with_string_param("query", "Search query", true)
            .with_bool_param("exact", "Exact match", false);

        let rendered = schema.to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["query"]["type"], "string");
        assert_eq!(rendered["required"], json!(["query"]));
        assert_eq!(rendered["additionalProperties"], true);
    }
}

//! A deliberately small JSON Schema validator.
//!
//! Only the subset tools actually use: `type`, `required`, `properties`,
//! and `items`. Good enough to catch the common shape errors (missing
//! field, wrong primitive type) without pulling in a full draft-2020-12
//! implementation for a runtime that never needs `$ref` or `oneOf`.

use serde_json::Value;

/// Why a value failed to validate against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation(pub String);

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate `value` against `schema`. Returns the first violation found,
/// if any.
pub fn validate(schema: &Value, value: &Value) -> Result<(), SchemaViolation> {
    validate_at(schema, value, "$")
}

fn validate_at(schema: &Value, value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };

    if let Some(ty) = schema_obj.get("type").and_then(Value::as_str) {
        if !type_matches(ty, value) {
            return Err(SchemaViolation(format!(
                "{path}: expected type `{ty}`, got `{}`",
                type_name(value)
            )));
        }
    }

    if let Some(props) = schema_obj.get("properties").and_then(Value::as_object) {
        let obj = value.as_object();
        if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
            for name in required {
                let Some(name) = name.as_str() else { continue };
                if obj.map(|o| !o.contains_key(name)).unwrap_or(true) {
                    return Err(SchemaViolation(format!(
                        "{path}: missing required field `{name}`"
                    )));
                }
            }
        }
        if let Some(obj) = obj {
            for (key, prop_schema) in props {
                if let Some(v) = obj.get(key) {
                    validate_at(prop_schema, v, &format!("{path}.{key}"))?;
                }
            }
        }
    }

    if let Some(items_schema) = schema_obj.get("items") {
        if let Some(arr) = value.as_array() {
            for (i, item) in arr.iter().enumerate() {
                validate_at(items_schema, item, &format!("{path}[{i}]"))?;
            }
        }
    }

    Ok(())
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match ty {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

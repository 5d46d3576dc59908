//! Validation rules applied to a (possibly transformed) field value before
//! it's accepted into a canonical record.
//!
//! `validation_rules` is a free-form JSON object; recognised keys are
//! `type_check`, `min_value`/`max_value`, `min_length`/`max_length`,
//! `pattern`, and `allowed_values`. Unrecognised keys are ignored.

use regex::Regex;
use serde_json::Value;
use sf_core::types::FieldType;

use crate::transform::convert_to_type;

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub error_messages: Vec<String>,
}

/// Validates `field_value` against `rules`. A `None` or empty-string value is
/// rejected only when `required` is set; otherwise validation is skipped.
pub fn validate_field_value(
    field_value: Option<&Value>,
    rules: &Value,
    field_type: FieldType,
    required: bool,
) -> ValidationOutcome {
    let is_empty = matches!(field_value, None | Some(Value::Null))
        || matches!(field_value, Some(Value::String(s)) if s.is_empty());

    if required && is_empty {
        return ValidationOutcome {
            is_valid: false,
            error_messages: vec!["field is required but no value was provided".to_string()],
        };
    }
    if is_empty {
        return ValidationOutcome { is_valid: true, error_messages: Vec::new() };
    }

    apply_validation_rules(field_value.unwrap(), rules, field_type)
}

fn apply_validation_rules(value: &Value, rules: &Value, field_type: FieldType) -> ValidationOutcome {
    let mut errors = Vec::new();

    if rules.get("type_check").and_then(Value::as_bool).unwrap_or(false) {
        let coerced = convert_to_type(value, field_type);
        if coerced.is_null() && !value.is_null() {
            errors.push(format!("value cannot be converted to {field_type:?}"));
        }
    }

    if matches!(field_type, FieldType::Integer | FieldType::Float) {
        if let Some(n) = as_f64(value) {
            if let Some(min) = rules.get("min_value").and_then(Value::as_f64) {
                if n < min {
                    errors.push(format!("value {n} is less than minimum {min}"));
                }
            }
            if let Some(max) = rules.get("max_value").and_then(Value::as_f64) {
                if n > max {
                    errors.push(format!("value {n} is greater than maximum {max}"));
                }
            }
        }
    }

    if field_type == FieldType::String {
        let s = as_string(value);
        if let Some(min) = rules.get("min_length").and_then(Value::as_u64) {
            if (s.len() as u64) < min {
                errors.push(format!("value length is less than minimum {min}"));
            }
        }
        if let Some(max) = rules.get("max_length").and_then(Value::as_u64) {
            if (s.len() as u64) > max {
                errors.push(format!("value length is greater than maximum {max}"));
            }
        }
        if let Some(pattern) = rules.get("pattern").and_then(Value::as_str) {
            match Regex::new(pattern) {
                Ok(re) if !re.is_match(&s) => errors.push("value does not match required pattern".to_string()),
                Err(_) => errors.push(format!("invalid validation pattern '{pattern}'")),
                _ => {}
            }
        }
    }

    if let Some(allowed) = rules.get("allowed_values").and_then(Value::as_array) {
        if !allowed.iter().any(|a| a == value) {
            errors.push(format!("value must be one of: {allowed:?}"));
        }
    }

    ValidationOutcome { is_valid: errors.is_empty(), error_messages: errors }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_field_missing_fails() {
        let out = validate_field_value(None, &json!({}), FieldType::String, true);
        assert!(!out.is_valid);
    }

    #[test]
    fn optional_field_missing_passes() {
        let out = validate_field_value(None, &json!({}), FieldType::String, false);
        assert!(out.is_valid);
    }

    #[test]
    fn numeric_range_rejects_out_of_bounds() {
        let rules = json!({"min_value": 1, "max_value": 10});
        let out = validate_field_value(Some(&json!(20)), &rules, FieldType::Integer, true);
        assert!(!out.is_valid);
    }

    #[test]
    fn pattern_rejects_non_matching_string() {
        let rules = json!({"pattern": "^[A-Z]+$"});
        let out = validate_field_value(Some(&json!("lowercase")), &rules, FieldType::String, true);
        assert!(!out.is_valid);
    }

    #[test]
    fn allowed_values_accepts_member() {
        let rules = json!({"allowed_values": ["red", "green", "blue"]});
        let out = validate_field_value(Some(&json!("green")), &rules, FieldType::String, true);
        assert!(out.is_valid);
    }
}

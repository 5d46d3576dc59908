//! Transformation and type-coercion pipeline applied to raw tracker field
//! values before they're written into canonical domain fields.
//!
//! Transformation types mirror the five kinds a `FieldMapping` can name in
//! its `transformation_config.type`: `direct`, `extract_object_value`,
//! `string_format`, `numeric_conversion`, `date_format`, `conditional`.

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use sf_core::types::FieldType;

const DEFAULT_DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const DEFAULT_DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

/// Applies the named transformation, then coerces the result to `field_type`.
pub fn transform_field_value(
    source_value: &Value,
    transformation_type: &str,
    config: &Value,
    field_type: FieldType,
) -> Value {
    let transformed = apply_transformation(source_value, transformation_type, config, field_type);
    convert_to_type(&transformed, field_type)
}

fn apply_transformation(value: &Value, transformation_type: &str, config: &Value, field_type: FieldType) -> Value {
    match transformation_type {
        "direct" => value.clone(),

        "extract_object_value" => {
            let key = config.get("key").and_then(Value::as_str).unwrap_or("value");
            value.get(key).cloned().unwrap_or_else(|| value.clone())
        }

        "string_format" => match config.get("template").and_then(Value::as_str) {
            Some(template) => Value::String(template.replace("{value}", &scalar_to_string(value))),
            None => Value::String(scalar_to_string(value)),
        },

        "numeric_conversion" => numeric_conversion(value, config, field_type),

        "date_format" => date_format(value, config),

        "conditional" => conditional(value, config),

        _ => value.clone(),
    }
}

fn numeric_conversion(value: &Value, config: &Value, field_type: FieldType) -> Value {
    let as_f64 = value_as_f64(value);
    match field_type {
        FieldType::Integer => match as_f64 {
            Some(f) => json!(f as i64),
            None => config.get("default").cloned().unwrap_or(json!(0)),
        },
        FieldType::Float => match as_f64 {
            Some(f) => json!(f),
            None => config.get("default").cloned().unwrap_or(json!(0.0)),
        },
        _ => value.clone(),
    }
}

fn date_format(value: &Value, config: &Value) -> Value {
    let Some(s) = value.as_str() else { return value.clone() };
    let input_format = config
        .get("input_format")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DATE_INPUT_FORMAT);
    let output_format = config
        .get("output_format")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DATE_OUTPUT_FORMAT);

    match NaiveDateTime::parse_from_str(s, input_format) {
        Ok(dt) => Value::String(dt.format(output_format).to_string()),
        Err(_) => value.clone(),
    }
}

fn conditional(value: &Value, config: &Value) -> Value {
    let conditions = config.get("conditions").and_then(Value::as_array).cloned().unwrap_or_default();
    for condition in &conditions {
        if evaluate_condition(value, condition) {
            return condition.get("result").cloned().unwrap_or_else(|| value.clone());
        }
    }
    config.get("default").cloned().unwrap_or_else(|| value.clone())
}

fn evaluate_condition(value: &Value, condition: &Value) -> bool {
    let operator = condition.get("operator").and_then(Value::as_str).unwrap_or("equals");
    let expected = condition.get("value").cloned().unwrap_or(Value::Null);

    match operator {
        "equals" => *value == expected,
        "not_equals" => *value != expected,
        "contains" => scalar_to_string(value).contains(&scalar_to_string(&expected)),
        "starts_with" => scalar_to_string(value).starts_with(&scalar_to_string(&expected)),
        "ends_with" => scalar_to_string(value).ends_with(&scalar_to_string(&expected)),
        "greater_than" => match (value_as_f64(value), value_as_f64(&expected)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        "less_than" => match (value_as_f64(value), value_as_f64(&expected)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        _ => false,
    }
}

/// Coerces a (possibly already-transformed) value into the shape
/// `field_type` expects. Falls back to the input value when coercion fails,
/// rather than dropping the field entirely.
pub fn convert_to_type(value: &Value, field_type: FieldType) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match field_type {
        FieldType::String => Value::String(scalar_to_string(value)),
        FieldType::Integer => value_as_f64(value).map(|f| json!(f as i64)).unwrap_or_else(|| value.clone()),
        FieldType::Float => value_as_f64(value).map(|f| json!(f)).unwrap_or_else(|| value.clone()),
        FieldType::Boolean => Value::Bool(value_as_bool(value)),
        FieldType::List => match value {
            Value::Array(_) => value.clone(),
            Value::String(s) => Value::Array(s.split(',').map(|p| Value::String(p.to_string())).collect()),
            other => Value::Array(vec![other.clone()]),
        },
        FieldType::Object => match value {
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
            other => other.clone(),
        },
        FieldType::Date | FieldType::DateTime => value.clone(),
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_passes_value_through_then_coerces() {
        let out = transform_field_value(&json!("42"), "direct", &json!({}), FieldType::Integer);
        assert_eq!(out, json!(42));
    }

    #[test]
    fn extract_object_value_reads_configured_key() {
        let value = json!({"value": "Frontend Team"});
        let out = transform_field_value(&value, "extract_object_value", &json!({}), FieldType::String);
        assert_eq!(out, json!("Frontend Team"));
    }

    #[test]
    fn numeric_conversion_falls_back_to_configured_default() {
        let out = transform_field_value(&json!("not-a-number"), "numeric_conversion", &json!({"default": 7}), FieldType::Integer);
        assert_eq!(out, json!(7));
    }

    #[test]
    fn date_format_rewrites_between_formats() {
        let out = transform_field_value(&json!("2026-01-15T10:30:00.000Z"), "date_format", &json!({}), FieldType::String);
        assert_eq!(out, json!("2026-01-15"));
    }

    #[test]
    fn date_format_leaves_unparseable_value_untouched() {
        let out = transform_field_value(&json!("not-a-date"), "date_format", &json!({}), FieldType::String);
        assert_eq!(out, json!("not-a-date"));
    }

    #[test]
    fn conditional_picks_first_matching_condition_result() {
        let config = json!({
            "conditions": [
                {"operator": "equals", "value": "Done", "result": "completed"},
                {"operator": "equals", "value": "Open", "result": "open"}
            ],
            "default": "unknown"
        });
        let out = transform_field_value(&json!("Done"), "conditional", &config, FieldType::String);
        assert_eq!(out, json!("completed"));
    }

    #[test]
    fn conditional_falls_back_to_default_when_nothing_matches() {
        let config = json!({"conditions": [], "default": "unknown"});
        let out = transform_field_value(&json!("whatever"), "conditional", &config, FieldType::String);
        assert_eq!(out, json!("unknown"));
    }

    #[test]
    fn boolean_coercion_accepts_common_truthy_strings() {
        assert_eq!(convert_to_type(&json!("yes"), FieldType::Boolean), json!(true));
        assert_eq!(convert_to_type(&json!("0"), FieldType::Boolean), json!(false));
    }

    #[test]
    fn list_coercion_splits_comma_separated_strings() {
        let out = convert_to_type(&json!("a,b,c"), FieldType::List);
        assert_eq!(out, json!(["a", "b", "c"]));
    }
}

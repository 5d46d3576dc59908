//! Applies a template's active field mappings to a raw tracker payload,
//! producing a canonical `target_field -> value` object.

use serde_json::{Map, Value};
use sf_core::types::{FieldMapping, MappingType};
use tracing::warn;

use crate::transform::transform_field_value;
use crate::validate::validate_field_value;

/// Applies every mapping in `mappings` to `tracker_data`. A mapping whose
/// value can't be resolved or that fails validation with no default is
/// skipped rather than aborting the whole pass - one bad field shouldn't
/// block the rest of the record.
pub fn apply_field_mappings(tracker_data: &Value, mappings: &[FieldMapping]) -> Value {
    let mut result = Map::new();

    for mapping in mappings {
        let mut value = extract_field_value(tracker_data, &mapping.tracker_field_id);

        if value.is_none() {
            if let Some(default) = &mapping.default_value {
                value = Some(default.clone());
            }
        }

        let Some(mut value) = value else {
            if mapping.required {
                warn!(target_field = %mapping.target_field, "required field mapping produced no value");
            }
            continue;
        };

        if mapping.mapping_type == MappingType::Transformation {
            let transformation_type = mapping
                .transformation_config
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("direct");
            value = transform_field_value(&value, transformation_type, &mapping.transformation_config, mapping.field_type);
        }

        if !mapping.validation_rules.is_null() && mapping.validation_rules != Value::Object(Map::new()) {
            let outcome = validate_field_value(Some(&value), &mapping.validation_rules, mapping.field_type, mapping.required);
            if !outcome.is_valid {
                warn!(target_field = %mapping.target_field, errors = ?outcome.error_messages, "field mapping validation failed");
                match &mapping.default_value {
                    Some(default) => value = default.clone(),
                    None => continue,
                }
            }
        }

        result.insert(mapping.target_field.clone(), value);
    }

    Value::Object(result)
}

/// Reads `field_id` from a tracker payload, checking `fields.<id>` first
/// (the shape of an issue/sprint response) then a top-level key.
fn extract_field_value(tracker_data: &Value, field_id: &str) -> Option<Value> {
    if let Some(v) = tracker_data.get("fields").and_then(|f| f.get(field_id)) {
        if !v.is_null() {
            return Some(v.clone());
        }
    }
    tracker_data.get(field_id).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sf_core::types::FieldType;

    fn mapping(tracker_field_id: &str, target_field: &str, mapping_type: MappingType) -> FieldMapping {
        FieldMapping {
            id: 1,
            template_id: 1,
            tracker_field_id: tracker_field_id.to_string(),
            target_field: target_field.to_string(),
            field_type: FieldType::String,
            mapping_type,
            transformation_config: json!({}),
            validation_rules: json!({}),
            default_value: None,
            required: false,
            is_active: true,
        }
    }

    #[test]
    fn direct_mapping_copies_nested_field_value() {
        let data = json!({"fields": {"customfield_100": "Frontend"}});
        let mappings = vec![mapping("customfield_100", "team", MappingType::Direct)];
        let out = apply_field_mappings(&data, &mappings);
        assert_eq!(out["team"], json!("Frontend"));
    }

    #[test]
    fn missing_optional_field_is_skipped() {
        let data = json!({"fields": {}});
        let mappings = vec![mapping("customfield_999", "team", MappingType::Direct)];
        let out = apply_field_mappings(&data, &mappings);
        assert!(out.get("team").is_none());
    }

    #[test]
    fn missing_field_falls_back_to_default_value() {
        let data = json!({"fields": {}});
        let mut m = mapping("customfield_999", "team", MappingType::Direct);
        m.default_value = Some(json!("Unassigned"));
        let out = apply_field_mappings(&data, &[m]);
        assert_eq!(out["team"], json!("Unassigned"));
    }

    #[test]
    fn transformation_mapping_extracts_object_value() {
        let data = json!({"fields": {"customfield_200": {"value": "Backend"}}});
        let mut m = mapping("customfield_200", "team", MappingType::Transformation);
        m.transformation_config = json!({"type": "extract_object_value"});
        let out = apply_field_mappings(&data, &[m]);
        assert_eq!(out["team"], json!("Backend"));
    }

    #[test]
    fn failed_validation_without_default_skips_field() {
        let data = json!({"fields": {"customfield_300": "not-a-color"}});
        let mut m = mapping("customfield_300", "color", MappingType::Direct);
        m.validation_rules = json!({"allowed_values": ["red", "green"]});
        let out = apply_field_mappings(&data, &[m]);
        assert!(out.get("color").is_none());
    }
}

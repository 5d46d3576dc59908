//! CRUD over field mapping templates and mappings, with every mutation
//! recorded as a `FieldMappingVersion` row.

use chrono::Utc;
use serde_json::{json, Value};
use sf_core::db::SprintforgeDb;
use sf_core::types::{FieldMapping, FieldMappingTemplate, FieldMappingVersion, FieldType, MappingChangeType, MappingType};

use crate::error::{MapperError, Result};

pub struct NewFieldMapping {
    pub template_id: i64,
    pub tracker_field_id: String,
    pub target_field: String,
    pub field_type: FieldType,
    pub mapping_type: MappingType,
    pub transformation_config: Value,
    pub validation_rules: Value,
    pub default_value: Option<Value>,
    pub required: bool,
}

/// Partial update over an existing mapping. `None` fields are left
/// unchanged, mirroring an exclude-unset patch.
#[derive(Default)]
pub struct FieldMappingUpdate {
    pub target_field: Option<String>,
    pub field_type: Option<FieldType>,
    pub mapping_type: Option<MappingType>,
    pub transformation_config: Option<Value>,
    pub validation_rules: Option<Value>,
    pub default_value: Option<Option<Value>>,
    pub required: Option<bool>,
}

pub async fn create_template(db: &SprintforgeDb, name: &str) -> Result<FieldMappingTemplate> {
    if db.get_field_mapping_template_by_name(name).await?.is_some() {
        return Err(MapperError::TemplateAlreadyExists(name.to_string()));
    }
    let now = Utc::now();
    let id = db.upsert_field_mapping_template(name, true, now).await?;
    Ok(FieldMappingTemplate { id, name: name.to_string(), is_active: true, created_at: now })
}

pub async fn create_mapping(db: &SprintforgeDb, new: NewFieldMapping) -> Result<FieldMapping> {
    if db.get_field_mapping_by_key(new.template_id, &new.tracker_field_id).await?.is_some() {
        return Err(MapperError::AlreadyExists(new.tracker_field_id));
    }

    let mut mapping = FieldMapping {
        id: 0,
        template_id: new.template_id,
        tracker_field_id: new.tracker_field_id,
        target_field: new.target_field,
        field_type: new.field_type,
        mapping_type: new.mapping_type,
        transformation_config: new.transformation_config,
        validation_rules: new.validation_rules,
        default_value: new.default_value,
        required: new.required,
        is_active: true,
    };
    mapping.id = db.insert_field_mapping(&mapping).await?;

    record_version(db, mapping.id, MappingChangeType::Create, "initial creation", None, Some(&mapping)).await?;
    Ok(mapping)
}

pub async fn update_mapping(db: &SprintforgeDb, mapping_id: i64, update: FieldMappingUpdate) -> Result<FieldMapping> {
    let mut mapping = db
        .get_field_mapping_by_id(mapping_id)
        .await?
        .ok_or(MapperError::NotFound(mapping_id))?;
    let previous = mapping.clone();

    if let Some(v) = update.target_field { mapping.target_field = v; }
    if let Some(v) = update.field_type { mapping.field_type = v; }
    if let Some(v) = update.mapping_type { mapping.mapping_type = v; }
    if let Some(v) = update.transformation_config { mapping.transformation_config = v; }
    if let Some(v) = update.validation_rules { mapping.validation_rules = v; }
    if let Some(v) = update.default_value { mapping.default_value = v; }
    if let Some(v) = update.required { mapping.required = v; }

    db.update_field_mapping(&mapping).await?;
    record_version(db, mapping_id, MappingChangeType::Update, "field mapping updated", Some(&previous), Some(&mapping)).await?;
    Ok(mapping)
}

/// Soft-deletes a mapping by deactivating it. The row and its version
/// history are kept for audit purposes.
pub async fn delete_mapping(db: &SprintforgeDb, mapping_id: i64) -> Result<()> {
    if db.get_field_mapping_by_id(mapping_id).await?.is_none() {
        return Err(MapperError::NotFound(mapping_id));
    }
    db.deactivate_field_mapping(mapping_id).await?;
    record_version(db, mapping_id, MappingChangeType::Delete, "field mapping deactivated", None, None).await?;
    Ok(())
}

async fn record_version(
    db: &SprintforgeDb,
    mapping_id: i64,
    change_type: MappingChangeType,
    description: &str,
    previous: Option<&FieldMapping>,
    new: Option<&FieldMapping>,
) -> Result<()> {
    let version = FieldMappingVersion {
        id: 0,
        mapping_id,
        change_type,
        description: description.to_string(),
        previous_config: previous.map(|m| json!(m)),
        new_config: new.map(|m| json!(m)),
        created_at: Utc::now(),
    };
    db.insert_field_mapping_version(&version).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_template(db: &SprintforgeDb) -> i64 {
        create_template(db, "jira-default").await.unwrap().id
    }

    fn sample_new_mapping(template_id: i64) -> NewFieldMapping {
        NewFieldMapping {
            template_id,
            tracker_field_id: "customfield_100".to_string(),
            target_field: "team".to_string(),
            field_type: FieldType::String,
            mapping_type: MappingType::Direct,
            transformation_config: json!({}),
            validation_rules: json!({}),
            default_value: None,
            required: false,
        }
    }

    #[tokio::test]
    async fn create_mapping_rejects_duplicate_tracker_field_on_same_template() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let template_id = seeded_template(&db).await;
        create_mapping(&db, sample_new_mapping(template_id)).await.unwrap();

        let err = create_mapping(&db, sample_new_mapping(template_id)).await.unwrap_err();
        assert!(matches!(err, MapperError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_then_delete_each_write_a_version_record() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let template_id = seeded_template(&db).await;
        let mapping = create_mapping(&db, sample_new_mapping(template_id)).await.unwrap();

        let updated = update_mapping(&db, mapping.id, FieldMappingUpdate {
            target_field: Some("owning_team".to_string()),
            ..Default::default()
        }).await.unwrap();
        assert_eq!(updated.target_field, "owning_team");

        delete_mapping(&db, mapping.id).await.unwrap();
        let after_delete = db.get_field_mapping_by_id(mapping.id).await.unwrap().unwrap();
        assert!(!after_delete.is_active);
    }

    #[tokio::test]
    async fn create_template_rejects_duplicate_name() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_template(&db, "jira-default").await.unwrap();
        let err = create_template(&db, "jira-default").await.unwrap_err();
        assert!(matches!(err, MapperError::TemplateAlreadyExists(_)));
    }
}

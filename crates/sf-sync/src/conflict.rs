//! Conflict resolution strategy application. `unresolved -> resolved` is the
//! whole state machine; `resolution_strategy` picks `resolved_value`.

use chrono::Utc;
use serde_json::Value;
use sf_core::types::{ConflictResolution, ResolutionStrategy};

use crate::error::{Result, SyncError};

/// Computes the value a conflict resolves to under `strategy`, without
/// persisting anything - callers write the result back via
/// `SprintforgeDb::update_conflict_resolution`.
pub fn resolve(
    conflict: &ConflictResolution,
    strategy: ResolutionStrategy,
    supplied_value: Option<Value>,
) -> Result<Value> {
    match strategy {
        ResolutionStrategy::LocalWins => Ok(conflict.local_value.clone()),
        ResolutionStrategy::RemoteWins => Ok(conflict.remote_value.clone()),
        ResolutionStrategy::Manual => {
            supplied_value.ok_or_else(|| SyncError::Validation("resolved_value required".into()))
        }
        ResolutionStrategy::Merge => Err(SyncError::MergeNotImplemented),
    }
}

/// Applies `resolve` and returns the conflict with resolution fields set,
/// ready for `update_conflict_resolution`.
pub fn apply(
    mut conflict: ConflictResolution,
    strategy: ResolutionStrategy,
    supplied_value: Option<Value>,
    resolver: Option<String>,
    notes: Option<String>,
) -> Result<ConflictResolution> {
    let resolved_value = resolve(&conflict, strategy, supplied_value)?;
    conflict.resolution_strategy = strategy;
    conflict.resolved_value = Some(resolved_value);
    conflict.resolver = resolver;
    conflict.resolved_at = Some(Utc::now());
    conflict.resolved = true;
    conflict.notes = notes;
    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sf_core::types::ConflictType;

    fn sample() -> ConflictResolution {
        ConflictResolution {
            id: 1,
            sync_metadata_id: 1,
            conflict_type: ConflictType::FieldConflict,
            field_name: "name".to_string(),
            local_value: json!("Local Name"),
            remote_value: json!("Remote Name"),
            resolution_strategy: ResolutionStrategy::RemoteWins,
            resolved_value: None,
            resolver: None,
            resolved_at: None,
            resolved: false,
            notes: None,
        }
    }

    #[test]
    fn remote_wins_picks_remote_value() {
        let v = resolve(&sample(), ResolutionStrategy::RemoteWins, None).unwrap();
        assert_eq!(v, json!("Remote Name"));
    }

    #[test]
    fn local_wins_picks_local_value() {
        let v = resolve(&sample(), ResolutionStrategy::LocalWins, None).unwrap();
        assert_eq!(v, json!("Local Name"));
    }

    #[test]
    fn manual_without_supplied_value_errors() {
        let err = resolve(&sample(), ResolutionStrategy::Manual, None).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn manual_with_supplied_value_uses_it() {
        let v = resolve(&sample(), ResolutionStrategy::Manual, Some(json!("Custom"))).unwrap();
        assert_eq!(v, json!("Custom"));
    }

    #[test]
    fn merge_is_not_implemented() {
        let err = resolve(&sample(), ResolutionStrategy::Merge, None).unwrap_err();
        assert!(matches!(err, SyncError::MergeNotImplemented));
    }

    #[test]
    fn apply_marks_conflict_resolved() {
        let resolved = apply(sample(), ResolutionStrategy::RemoteWins, None, Some("system".into()), None).unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.resolved_value, Some(json!("Remote Name")));
    }
}

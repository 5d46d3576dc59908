//! Canonical domain entities shared across the sync, analytics, audit and
//! mapping crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintState {
    Future,
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: i64,
    pub tracker_sprint_id: i64,
    pub name: String,
    pub state: SprintState,
    pub goal: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub board_id: i64,
    pub tracker_last_modified: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub tracker_board_name: Option<String>,
    pub tracker_project_key: Option<String>,
    pub tracker_api_version: Option<String>,
}

impl Sprint {
    /// `name` trims non-empty; `start <= end`; `complete >= start`.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("sprint name must not be empty".into());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err("sprint start must be <= end".into());
            }
        }
        if let (Some(start), Some(complete)) = (self.start_date, self.complete_date) {
            if complete < start {
                return Err("sprint complete must be >= start".into());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SprintAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    DisciplineTeam,
    Capacity,
    Velocity,
    Burndown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintAnalysis {
    pub id: i64,
    pub sprint_id: i64,
    pub analysis_type: AnalysisType,
    pub issue_total: i64,
    pub story_point_total: f64,
    pub discipline_breakdown: Value,
    pub filter_predicate: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ProjectWorkstream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkstreamType {
    Standard,
    Epic,
    Initiative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWorkstream {
    pub id: i64,
    pub project_key: String,
    pub project_name: String,
    pub tracker_board_id: Option<i64>,
    pub tracker_board_name: Option<String>,
    pub workstream_type: WorkstreamType,
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// ProjectSprintAssociation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    Primary,
    Secondary,
    Dependency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSprintAssociation {
    pub id: i64,
    pub sprint_id: i64,
    pub project_workstream_id: i64,
    pub association_type: AssociationType,
    pub priority: i64,
    pub expected_story_points: f64,
    pub actual_story_points: f64,
}

// ---------------------------------------------------------------------------
// ProjectSprintMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSprintMetrics {
    pub id: i64,
    pub sprint_id: i64,
    pub project_workstream_id: i64,
    pub metric_date: DateTime<Utc>,
    pub issues_total: i64,
    pub issues_completed: i64,
    pub issues_in_progress: i64,
    pub issues_blocked: i64,
    pub story_points_total: f64,
    pub story_points_completed: f64,
    pub completion_percentage: f64,
    pub velocity: f64,
    pub burndown_rate: f64,
    pub scope_added: i64,
    pub scope_removed: i64,
    pub details: Value,
}

impl ProjectSprintMetrics {
    pub fn completion_percentage_invariant_holds(&self) -> bool {
        self.issues_completed <= self.issues_total
            && self.story_points_completed <= self.story_points_total
            && (0.0..=100.0).contains(&self.completion_percentage)
    }
}

// ---------------------------------------------------------------------------
// DisciplineTeamCapacity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityType {
    StoryPoints,
    Hours,
    Issues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisciplineTeamCapacity {
    pub id: i64,
    pub sprint_id: i64,
    pub team_name: String,
    pub capacity_points: f64,
    pub capacity_type: CapacityType,
    pub allocated: f64,
    pub notes: Option<String>,
}

impl DisciplineTeamCapacity {
    pub fn remaining(&self) -> f64 {
        (self.capacity_points - self.allocated).max(0.0)
    }

    pub fn utilization_percentage(&self) -> f64 {
        if self.capacity_points <= 0.0 {
            0.0
        } else {
            (self.allocated / self.capacity_points) * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectCapacityAllocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCapacityAllocation {
    pub id: i64,
    pub sprint_id: i64,
    pub project_workstream_id: i64,
    pub team_capacity_id: i64,
    pub allocated: f64,
    pub utilized: f64,
    pub remaining: f64,
    pub priority: i64,
    pub trend: CapacityTrend,
}

// ---------------------------------------------------------------------------
// SyncMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Sprint,
    Issue,
    Project,
    Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    LocalToRemote,
    RemoteToLocal,
    Bidirectional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub tracker_id: i64,
    pub sync_status: SyncStatus,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_successful: Option<DateTime<Utc>>,
    pub local_modified: Option<DateTime<Utc>>,
    pub remote_modified: Option<DateTime<Utc>>,
    pub error_count: i64,
    pub last_error: Option<String>,
    pub sync_direction: SyncDirection,
    pub content_hash: Option<String>,
    pub batch_id: Option<Uuid>,
}

impl SyncMetadata {
    pub fn mark_success(&mut self, now: DateTime<Utc>, content_hash: String) {
        self.sync_status = SyncStatus::Completed;
        self.last_successful = Some(now);
        self.error_count = 0;
        self.content_hash = Some(content_hash);
    }

    pub fn mark_failure(&mut self, error: String) {
        self.sync_status = SyncStatus::Failed;
        self.error_count += 1;
        self.last_error = Some(error);
    }
}

// ---------------------------------------------------------------------------
// ConflictResolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    FieldConflict,
    DeletionConflict,
    CreationConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    LocalWins,
    RemoteWins,
    Manual,
    Merge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub id: i64,
    pub sync_metadata_id: i64,
    pub conflict_type: ConflictType,
    pub field_name: String,
    pub local_value: Value,
    pub remote_value: Value,
    pub resolution_strategy: ResolutionStrategy,
    pub resolved_value: Option<Value>,
    pub resolver: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// SyncHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    FullSync,
    IncrementalSync,
    ConflictResolution,
    WebhookSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncHistory {
    pub id: i64,
    pub batch_id: Uuid,
    pub operation_type: OperationType,
    pub entities_processed: i64,
    pub entities_created: i64,
    pub entities_updated: i64,
    pub entities_deleted: i64,
    pub entities_skipped: i64,
    pub conflicts_detected: i64,
    pub conflicts_resolved: i64,
    pub duration_seconds: f64,
    pub api_calls_made: i64,
    pub status: BatchStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncHistory {
    pub fn new(operation_type: OperationType, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            batch_id: Uuid::new_v4(),
            operation_type,
            entities_processed: 0,
            entities_created: 0,
            entities_updated: 0,
            entities_deleted: 0,
            entities_skipped: 0,
            conflicts_detected: 0,
            conflicts_resolved: 0,
            duration_seconds: 0.0,
            api_calls_made: 0,
            status: BatchStatus::InProgress,
            error_message: None,
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub payload: Value,
    pub processing_status: ProcessingStatus,
    pub attempts: i64,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub processed_data: Option<Value>,
    pub received_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SecurityEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecuritySeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: i64,
    pub event_type: String,
    pub category: String,
    pub severity: SecuritySeverity,
    pub actor: Value,
    pub resource: Value,
    pub success: bool,
    pub description: String,
    pub metadata: Value,
    pub compliance_tags: Vec<String>,
    pub correlation_id: Uuid,
    pub checksum: Option<String>,
    pub previous_checksum: Option<String>,
    pub retention_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FieldMapping / Template / Version
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Direct,
    Transformation,
    Lookup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub id: i64,
    pub template_id: i64,
    pub tracker_field_id: String,
    pub target_field: String,
    pub field_type: FieldType,
    pub mapping_type: MappingType,
    pub transformation_config: Value,
    pub validation_rules: Value,
    pub default_value: Option<Value>,
    pub required: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappingTemplate {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingChangeType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappingVersion {
    pub id: i64,
    pub mapping_id: i64,
    pub change_type: MappingChangeType,
    pub description: String,
    pub previous_config: Option<Value>,
    pub new_config: Option<Value>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CachedSprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSprint {
    pub id: i64,
    pub tracker_sprint_id: i64,
    pub raw_payload: Value,
    pub last_fetched_at: DateTime<Utc>,
    pub error_count: i64,
    pub last_error: Option<String>,
}

impl CachedSprint {
    pub const DEFAULT_STALENESS: chrono::Duration = chrono::Duration::hours(2);

    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now - self.last_fetched_at > threshold
    }
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<String>,
    pub is_system_role: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    pub id: i64,
    pub user_id: String,
    pub role_id: i64,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<String>,
}

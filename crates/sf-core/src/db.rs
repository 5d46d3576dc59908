//! Async SQLite-backed repository for every entity in [`crate::types`].
//!
//! Schema is created idempotently on open (no migration framework, per the
//! scope of this crate). Enum columns round-trip through their `snake_case`
//! JSON string representation, mirroring the pattern used for status
//! columns elsewhere in this codebase's lineage.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::types::*;

pub struct SprintforgeDb {
    conn: Connection,
}

// ---------------------------------------------------------------------------
// enum <-> SQL helpers
// ---------------------------------------------------------------------------

fn enum_to_sql<T: serde::Serialize>(val: &T) -> String {
    let s = serde_json::to_string(val).expect("serialize enum");
    s.trim_matches('"').to_string()
}

fn enum_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    let quoted = format!("\"{}\"", raw);
    serde_json::from_str(&quoted).expect("deserialize enum")
}

fn dt_to_sql(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn opt_dt_to_sql(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(dt_to_sql)
}

fn dt_from_sql(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).expect("valid date").with_timezone(&Utc)
}

fn opt_dt_from_sql(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.map(|s| dt_from_sql(&s))
}

fn json_to_sql(v: &Value) -> String {
    v.to_string()
}

fn json_from_sql(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

impl SprintforgeDb {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, tokio_rusqlite::Error> {
        let conn = Connection::open(path.as_ref()).await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    pub async fn new_in_memory() -> Result<Self, tokio_rusqlite::Error> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA cache_size=-64000;
                    PRAGMA mmap_size=268435456;
                    PRAGMA temp_store=MEMORY;
                    PRAGMA busy_timeout=5000;

                    CREATE TABLE IF NOT EXISTS sprints (
                        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                        tracker_sprint_id       INTEGER NOT NULL UNIQUE,
                        name                    TEXT NOT NULL,
                        state                   TEXT NOT NULL,
                        goal                    TEXT,
                        start_date              TEXT,
                        end_date                TEXT,
                        complete_date           TEXT,
                        board_id                INTEGER NOT NULL,
                        tracker_last_modified   TEXT,
                        sync_status             TEXT NOT NULL,
                        tracker_board_name      TEXT,
                        tracker_project_key     TEXT,
                        tracker_api_version     TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_sprints_state ON sprints(state);
                    CREATE INDEX IF NOT EXISTS idx_sprints_board ON sprints(board_id);

                    CREATE TABLE IF NOT EXISTS sync_metadata (
                        id                INTEGER PRIMARY KEY AUTOINCREMENT,
                        entity_type       TEXT NOT NULL,
                        entity_id         INTEGER NOT NULL,
                        tracker_id        INTEGER NOT NULL,
                        sync_status       TEXT NOT NULL,
                        last_attempt      TEXT,
                        last_successful   TEXT,
                        local_modified    TEXT,
                        remote_modified   TEXT,
                        error_count       INTEGER NOT NULL DEFAULT 0,
                        last_error        TEXT,
                        sync_direction    TEXT NOT NULL,
                        content_hash      TEXT,
                        batch_id          TEXT,
                        UNIQUE(entity_type, entity_id)
                    );
                    CREATE INDEX IF NOT EXISTS idx_sync_meta_tracker ON sync_metadata(entity_type, tracker_id);

                    CREATE TABLE IF NOT EXISTS conflict_resolutions (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        sync_metadata_id    INTEGER NOT NULL,
                        conflict_type       TEXT NOT NULL,
                        field_name          TEXT NOT NULL,
                        local_value         TEXT NOT NULL,
                        remote_value        TEXT NOT NULL,
                        resolution_strategy TEXT NOT NULL,
                        resolved_value      TEXT,
                        resolver            TEXT,
                        resolved_at         TEXT,
                        resolved            INTEGER NOT NULL DEFAULT 0,
                        notes               TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_conflicts_meta ON conflict_resolutions(sync_metadata_id);

                    CREATE TABLE IF NOT EXISTS sync_history (
                        id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                        batch_id             TEXT NOT NULL UNIQUE,
                        operation_type       TEXT NOT NULL,
                        entities_processed   INTEGER NOT NULL DEFAULT 0,
                        entities_created     INTEGER NOT NULL DEFAULT 0,
                        entities_updated     INTEGER NOT NULL DEFAULT 0,
                        entities_deleted     INTEGER NOT NULL DEFAULT 0,
                        entities_skipped     INTEGER NOT NULL DEFAULT 0,
                        conflicts_detected   INTEGER NOT NULL DEFAULT 0,
                        conflicts_resolved   INTEGER NOT NULL DEFAULT 0,
                        duration_seconds     REAL NOT NULL DEFAULT 0,
                        api_calls_made       INTEGER NOT NULL DEFAULT 0,
                        status               TEXT NOT NULL,
                        error_message        TEXT,
                        created_at           TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_sync_history_created ON sync_history(created_at);

                    CREATE TABLE IF NOT EXISTS webhook_events (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        event_id            TEXT NOT NULL UNIQUE,
                        event_type          TEXT NOT NULL,
                        payload             TEXT NOT NULL,
                        processing_status   TEXT NOT NULL,
                        attempts            INTEGER NOT NULL DEFAULT 0,
                        last_processed_at   TEXT,
                        error               TEXT,
                        processed_data      TEXT,
                        received_at         TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_webhook_status ON webhook_events(processing_status);
                    CREATE INDEX IF NOT EXISTS idx_webhook_received ON webhook_events(received_at);

                    CREATE TABLE IF NOT EXISTS security_events (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        event_type          TEXT NOT NULL,
                        category            TEXT NOT NULL,
                        severity            TEXT NOT NULL,
                        actor               TEXT NOT NULL,
                        resource            TEXT NOT NULL,
                        success             INTEGER NOT NULL,
                        description         TEXT NOT NULL,
                        metadata            TEXT NOT NULL,
                        compliance_tags     TEXT NOT NULL,
                        correlation_id      TEXT NOT NULL,
                        checksum            TEXT,
                        previous_checksum   TEXT,
                        retention_date      TEXT NOT NULL,
                        created_at          TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_security_retention ON security_events(retention_date);

                    CREATE TABLE IF NOT EXISTS field_mapping_templates (
                        id          INTEGER PRIMARY KEY AUTOINCREMENT,
                        name        TEXT NOT NULL UNIQUE,
                        is_active   INTEGER NOT NULL DEFAULT 0,
                        created_at  TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS field_mappings (
                        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                        template_id             INTEGER NOT NULL,
                        tracker_field_id        TEXT NOT NULL,
                        target_field            TEXT NOT NULL,
                        field_type              TEXT NOT NULL,
                        mapping_type            TEXT NOT NULL,
                        transformation_config   TEXT NOT NULL,
                        validation_rules        TEXT NOT NULL,
                        default_value           TEXT,
                        required                INTEGER NOT NULL DEFAULT 0,
                        is_active               INTEGER NOT NULL DEFAULT 1
                    );
                    CREATE INDEX IF NOT EXISTS idx_mappings_template ON field_mappings(template_id, tracker_field_id);

                    CREATE TABLE IF NOT EXISTS field_mapping_versions (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        mapping_id          INTEGER NOT NULL,
                        change_type         TEXT NOT NULL,
                        description         TEXT NOT NULL,
                        previous_config     TEXT,
                        new_config          TEXT,
                        created_at          TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_versions_mapping ON field_mapping_versions(mapping_id);

                    CREATE TABLE IF NOT EXISTS cached_sprints (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        tracker_sprint_id   INTEGER NOT NULL UNIQUE,
                        raw_payload         TEXT NOT NULL,
                        last_fetched_at     TEXT NOT NULL,
                        error_count         INTEGER NOT NULL DEFAULT 0,
                        last_error          TEXT
                    );

                    CREATE TABLE IF NOT EXISTS project_workstreams (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        project_key         TEXT NOT NULL UNIQUE,
                        project_name        TEXT NOT NULL,
                        tracker_board_id    INTEGER,
                        tracker_board_name  TEXT,
                        workstream_type     TEXT NOT NULL,
                        category            TEXT
                    );

                    CREATE TABLE IF NOT EXISTS project_sprint_associations (
                        id                          INTEGER PRIMARY KEY AUTOINCREMENT,
                        sprint_id                   INTEGER NOT NULL,
                        project_workstream_id       INTEGER NOT NULL,
                        association_type            TEXT NOT NULL,
                        priority                    INTEGER NOT NULL,
                        expected_story_points       REAL NOT NULL DEFAULT 0,
                        actual_story_points         REAL NOT NULL DEFAULT 0,
                        UNIQUE(sprint_id, project_workstream_id)
                    );

                    CREATE TABLE IF NOT EXISTS project_sprint_metrics (
                        id                          INTEGER PRIMARY KEY AUTOINCREMENT,
                        sprint_id                   INTEGER NOT NULL,
                        project_workstream_id       INTEGER NOT NULL,
                        metric_date                 TEXT NOT NULL,
                        issues_total                INTEGER NOT NULL DEFAULT 0,
                        issues_completed            INTEGER NOT NULL DEFAULT 0,
                        issues_in_progress          INTEGER NOT NULL DEFAULT 0,
                        issues_blocked              INTEGER NOT NULL DEFAULT 0,
                        story_points_total          REAL NOT NULL DEFAULT 0,
                        story_points_completed      REAL NOT NULL DEFAULT 0,
                        completion_percentage       REAL NOT NULL DEFAULT 0,
                        velocity                    REAL NOT NULL DEFAULT 0,
                        burndown_rate               REAL NOT NULL DEFAULT 0,
                        scope_added                 INTEGER NOT NULL DEFAULT 0,
                        scope_removed               INTEGER NOT NULL DEFAULT 0,
                        details                     TEXT NOT NULL,
                        UNIQUE(sprint_id, project_workstream_id, metric_date)
                    );

                    CREATE TABLE IF NOT EXISTS discipline_team_capacities (
                        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                        sprint_id           INTEGER NOT NULL,
                        team_name           TEXT NOT NULL,
                        capacity_points     REAL NOT NULL DEFAULT 0,
                        capacity_type       TEXT NOT NULL,
                        allocated           REAL NOT NULL DEFAULT 0,
                        notes               TEXT,
                        UNIQUE(sprint_id, team_name)
                    );

                    CREATE TABLE IF NOT EXISTS project_capacity_allocations (
                        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                        sprint_id               INTEGER NOT NULL,
                        project_workstream_id   INTEGER NOT NULL,
                        team_capacity_id        INTEGER NOT NULL,
                        allocated               REAL NOT NULL DEFAULT 0,
                        utilized                REAL NOT NULL DEFAULT 0,
                        remaining               REAL NOT NULL DEFAULT 0,
                        priority                INTEGER NOT NULL DEFAULT 0,
                        trend                   TEXT NOT NULL,
                        UNIQUE(sprint_id, project_workstream_id, team_capacity_id)
                    );

                    CREATE TABLE IF NOT EXISTS roles (
                        id              INTEGER PRIMARY KEY AUTOINCREMENT,
                        name            TEXT NOT NULL UNIQUE,
                        permissions     TEXT NOT NULL,
                        is_system_role  INTEGER NOT NULL DEFAULT 0
                    );

                    CREATE TABLE IF NOT EXISTS user_role_assignments (
                        id          INTEGER PRIMARY KEY AUTOINCREMENT,
                        user_id     TEXT NOT NULL,
                        role_id     INTEGER NOT NULL,
                        granted_at  TEXT NOT NULL,
                        granted_by  TEXT,
                        UNIQUE(user_id, role_id)
                    );
                    ",
                )?;
                Ok(())
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Sprints
    // -----------------------------------------------------------------------

    pub async fn upsert_sprint(&self, sprint: &Sprint) -> Result<i64, tokio_rusqlite::Error> {
        let tracker_id = sprint.tracker_sprint_id;
        let name = sprint.name.clone();
        let state = enum_to_sql(&sprint.state);
        let goal = sprint.goal.clone();
        let start = opt_dt_to_sql(sprint.start_date);
        let end = opt_dt_to_sql(sprint.end_date);
        let complete = opt_dt_to_sql(sprint.complete_date);
        let board_id = sprint.board_id;
        let last_modified = opt_dt_to_sql(sprint.tracker_last_modified);
        let sync_status = enum_to_sql(&sprint.sync_status);
        let board_name = sprint.tracker_board_name.clone();
        let project_key = sprint.tracker_project_key.clone();
        let api_version = sprint.tracker_api_version.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sprints (tracker_sprint_id, name, state, goal, start_date,
                        end_date, complete_date, board_id, tracker_last_modified, sync_status,
                        tracker_board_name, tracker_project_key, tracker_api_version)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
                     ON CONFLICT(tracker_sprint_id) DO UPDATE SET
                        name=excluded.name, state=excluded.state, goal=excluded.goal,
                        start_date=excluded.start_date, end_date=excluded.end_date,
                        complete_date=excluded.complete_date, board_id=excluded.board_id,
                        tracker_last_modified=excluded.tracker_last_modified,
                        sync_status=excluded.sync_status, tracker_board_name=excluded.tracker_board_name,
                        tracker_project_key=excluded.tracker_project_key,
                        tracker_api_version=excluded.tracker_api_version",
                    rusqlite::params![
                        tracker_id, name, state, goal, start, end, complete, board_id,
                        last_modified, sync_status, board_name, project_key, api_version,
                    ],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM sprints WHERE tracker_sprint_id = ?1",
                    rusqlite::params![tracker_id],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn get_sprint(&self, id: i64) -> Result<Option<Sprint>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(Self::SPRINT_COLUMNS_SQL_BY_ID)?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_sprint(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn get_sprint_by_tracker_id(
        &self,
        tracker_sprint_id: i64,
    ) -> Result<Option<Sprint>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tracker_sprint_id, name, state, goal, start_date, end_date,
                        complete_date, board_id, tracker_last_modified, sync_status,
                        tracker_board_name, tracker_project_key, tracker_api_version
                     FROM sprints WHERE tracker_sprint_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![tracker_sprint_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_sprint(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn list_sprints_by_project(
        &self,
        project_key: &str,
        states: Option<Vec<SprintState>>,
    ) -> Result<Vec<Sprint>, tokio_rusqlite::Error> {
        let project_key = project_key.to_string();
        let state_filter: Option<Vec<String>> =
            states.map(|ss| ss.iter().map(enum_to_sql).collect());
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tracker_sprint_id, name, state, goal, start_date, end_date,
                        complete_date, board_id, tracker_last_modified, sync_status,
                        tracker_board_name, tracker_project_key, tracker_api_version
                     FROM sprints WHERE tracker_project_key = ?1 ORDER BY start_date DESC",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_key])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let s = row_to_sprint(row)?;
                    if let Some(filter) = &state_filter {
                        let state_str = enum_to_sql(&s.state);
                        if !filter.contains(&state_str) {
                            continue;
                        }
                    }
                    out.push(s);
                }
                Ok(out)
            })
            .await
    }

    const SPRINT_COLUMNS_SQL_BY_ID: &'static str = "SELECT id, tracker_sprint_id, name, state, goal, start_date, end_date,
                        complete_date, board_id, tracker_last_modified, sync_status,
                        tracker_board_name, tracker_project_key, tracker_api_version
                     FROM sprints WHERE id = ?1";

    // -----------------------------------------------------------------------
    // Sync metadata
    // -----------------------------------------------------------------------

    pub async fn list_sprints_by_board(&self, board_id: i64) -> Result<Vec<Sprint>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tracker_sprint_id, name, state, goal, start_date, end_date,
                        complete_date, board_id, tracker_last_modified, sync_status,
                        tracker_board_name, tracker_project_key, tracker_api_version
                     FROM sprints WHERE board_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![board_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_sprint(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn get_sync_metadata_by_tracker(
        &self,
        entity_type: EntityType,
        tracker_id: i64,
    ) -> Result<Option<SyncMetadata>, tokio_rusqlite::Error> {
        let entity_type_str = enum_to_sql(&entity_type);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, entity_type, entity_id, tracker_id, sync_status, last_attempt,
                        last_successful, local_modified, remote_modified, error_count, last_error,
                        sync_direction, content_hash, batch_id
                     FROM sync_metadata WHERE entity_type = ?1 AND tracker_id = ?2",
                )?;
                let mut rows = stmt.query(rusqlite::params![entity_type_str, tracker_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_sync_metadata(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn upsert_sync_metadata(
        &self,
        meta: &SyncMetadata,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let entity_type = enum_to_sql(&meta.entity_type);
        let entity_id = meta.entity_id;
        let tracker_id = meta.tracker_id;
        let sync_status = enum_to_sql(&meta.sync_status);
        let last_attempt = opt_dt_to_sql(meta.last_attempt);
        let last_successful = opt_dt_to_sql(meta.last_successful);
        let local_modified = opt_dt_to_sql(meta.local_modified);
        let remote_modified = opt_dt_to_sql(meta.remote_modified);
        let error_count = meta.error_count;
        let last_error = meta.last_error.clone();
        let sync_direction = enum_to_sql(&meta.sync_direction);
        let content_hash = meta.content_hash.clone();
        let batch_id = meta.batch_id.map(|u| u.to_string());

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_metadata (entity_type, entity_id, tracker_id, sync_status,
                        last_attempt, last_successful, local_modified, remote_modified,
                        error_count, last_error, sync_direction, content_hash, batch_id)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
                     ON CONFLICT(entity_type, entity_id) DO UPDATE SET
                        tracker_id=excluded.tracker_id, sync_status=excluded.sync_status,
                        last_attempt=excluded.last_attempt, last_successful=excluded.last_successful,
                        local_modified=excluded.local_modified, remote_modified=excluded.remote_modified,
                        error_count=excluded.error_count, last_error=excluded.last_error,
                        sync_direction=excluded.sync_direction, content_hash=excluded.content_hash,
                        batch_id=excluded.batch_id",
                    rusqlite::params![
                        entity_type, entity_id, tracker_id, sync_status, last_attempt,
                        last_successful, local_modified, remote_modified, error_count, last_error,
                        sync_direction, content_hash, batch_id,
                    ],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM sync_metadata WHERE entity_type = ?1 AND entity_id = ?2",
                    rusqlite::params![entity_type, entity_id],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Sync history
    // -----------------------------------------------------------------------

    pub async fn insert_sync_history(
        &self,
        history: &SyncHistory,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let batch_id = history.batch_id.to_string();
        let operation_type = enum_to_sql(&history.operation_type);
        let status = enum_to_sql(&history.status);
        let created_at = dt_to_sql(history.created_at);
        let h = history.clone_for_insert();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_history (batch_id, operation_type, entities_processed,
                        entities_created, entities_updated, entities_deleted, entities_skipped,
                        conflicts_detected, conflicts_resolved, duration_seconds, api_calls_made,
                        status, error_message, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
                    rusqlite::params![
                        batch_id, operation_type, h.entities_processed, h.entities_created,
                        h.entities_updated, h.entities_deleted, h.entities_skipped,
                        h.conflicts_detected, h.conflicts_resolved, h.duration_seconds,
                        h.api_calls_made, status, h.error_message, created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    pub async fn update_sync_history(
        &self,
        history: &SyncHistory,
    ) -> Result<(), tokio_rusqlite::Error> {
        let id = history.id;
        let status = enum_to_sql(&history.status);
        let h = history.clone_for_insert();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE sync_history SET entities_processed=?2, entities_created=?3,
                        entities_updated=?4, entities_deleted=?5, entities_skipped=?6,
                        conflicts_detected=?7, conflicts_resolved=?8, duration_seconds=?9,
                        api_calls_made=?10, status=?11, error_message=?12 WHERE id=?1",
                    rusqlite::params![
                        id, h.entities_processed, h.entities_created, h.entities_updated,
                        h.entities_deleted, h.entities_skipped, h.conflicts_detected,
                        h.conflicts_resolved, h.duration_seconds, h.api_calls_made, status,
                        h.error_message,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn last_successful_sync_at(
        &self,
    ) -> Result<Option<DateTime<Utc>>, tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                let result: rusqlite::Result<String> = conn.query_row(
                    "SELECT created_at FROM sync_history WHERE status = 'completed'
                     ORDER BY created_at DESC LIMIT 1",
                    [],
                    |r| r.get(0),
                );
                match result {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(tokio_rusqlite::Error::Rusqlite(e)),
                }
            })
            .await
            .map(|opt| opt.map(|s| dt_from_sql(&s)))
    }

    // -----------------------------------------------------------------------
    // Conflict resolutions
    // -----------------------------------------------------------------------

    pub async fn insert_conflict_resolution(
        &self,
        conflict: &ConflictResolution,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let sync_metadata_id = conflict.sync_metadata_id;
        let conflict_type = enum_to_sql(&conflict.conflict_type);
        let field_name = conflict.field_name.clone();
        let local_value = json_to_sql(&conflict.local_value);
        let remote_value = json_to_sql(&conflict.remote_value);
        let resolution_strategy = enum_to_sql(&conflict.resolution_strategy);
        let resolved_value = conflict.resolved_value.as_ref().map(json_to_sql);
        let resolver = conflict.resolver.clone();
        let resolved_at = opt_dt_to_sql(conflict.resolved_at);
        let resolved = conflict.resolved as i64;
        let notes = conflict.notes.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conflict_resolutions (sync_metadata_id, conflict_type, field_name,
                        local_value, remote_value, resolution_strategy, resolved_value, resolver,
                        resolved_at, resolved, notes)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                    rusqlite::params![
                        sync_metadata_id, conflict_type, field_name, local_value, remote_value,
                        resolution_strategy, resolved_value, resolver, resolved_at, resolved, notes,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    pub async fn get_conflict(
        &self,
        id: i64,
    ) -> Result<Option<ConflictResolution>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sync_metadata_id, conflict_type, field_name, local_value,
                        remote_value, resolution_strategy, resolved_value, resolver, resolved_at,
                        resolved, notes FROM conflict_resolutions WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_conflict(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn update_conflict_resolution(
        &self,
        conflict: &ConflictResolution,
    ) -> Result<(), tokio_rusqlite::Error> {
        let id = conflict.id;
        let resolution_strategy = enum_to_sql(&conflict.resolution_strategy);
        let resolved_value = conflict.resolved_value.as_ref().map(json_to_sql);
        let resolver = conflict.resolver.clone();
        let resolved_at = opt_dt_to_sql(conflict.resolved_at);
        let resolved = conflict.resolved as i64;
        let notes = conflict.notes.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE conflict_resolutions SET resolution_strategy=?2, resolved_value=?3,
                        resolver=?4, resolved_at=?5, resolved=?6, notes=?7 WHERE id=?1",
                    rusqlite::params![
                        id, resolution_strategy, resolved_value, resolver, resolved_at, resolved, notes,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Webhook events
    // -----------------------------------------------------------------------

    /// Returns `(local_id, was_new)`.
    pub async fn insert_webhook_event_idempotent(
        &self,
        event: &WebhookEvent,
    ) -> Result<(i64, bool), tokio_rusqlite::Error> {
        let event_id = event.event_id.clone();
        let event_type = event.event_type.clone();
        let payload = json_to_sql(&event.payload);
        let processing_status = enum_to_sql(&event.processing_status);
        let received_at = dt_to_sql(event.received_at);

        self.conn
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO webhook_events (event_id, event_type, payload,
                        processing_status, attempts, last_processed_at, error, processed_data,
                        received_at)
                     VALUES (?1,?2,?3,?4,0,NULL,NULL,NULL,?5)",
                    rusqlite::params![event_id, event_type, payload, processing_status, received_at],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM webhook_events WHERE event_id = ?1",
                    rusqlite::params![event_id],
                    |r| r.get(0),
                )?;
                Ok((id, inserted > 0))
            })
            .await
    }

    pub async fn get_webhook_event(
        &self,
        id: i64,
    ) -> Result<Option<WebhookEvent>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(Self::WEBHOOK_COLUMNS_BY_ID)?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_webhook_event(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    const WEBHOOK_COLUMNS_BY_ID: &'static str = "SELECT id, event_id, event_type, payload, processing_status, attempts,
                        last_processed_at, error, processed_data, received_at
                     FROM webhook_events WHERE id = ?1";

    pub async fn update_webhook_event(
        &self,
        event: &WebhookEvent,
    ) -> Result<(), tokio_rusqlite::Error> {
        let id = event.id;
        let processing_status = enum_to_sql(&event.processing_status);
        let attempts = event.attempts;
        let last_processed_at = opt_dt_to_sql(event.last_processed_at);
        let error = event.error.clone();
        let processed_data = event.processed_data.as_ref().map(json_to_sql);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE webhook_events SET processing_status=?2, attempts=?3,
                        last_processed_at=?4, error=?5, processed_data=?6 WHERE id=?1",
                    rusqlite::params![id, processing_status, attempts, last_processed_at, error, processed_data],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn list_retryable_webhook_events(
        &self,
        max_attempts: i64,
        received_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, tokio_rusqlite::Error> {
        let received_after = dt_to_sql(received_after);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, event_id, event_type, payload, processing_status, attempts,
                        last_processed_at, error, processed_data, received_at
                     FROM webhook_events
                     WHERE processing_status = 'failed' AND attempts < ?1 AND received_at >= ?2
                     ORDER BY received_at ASC LIMIT ?3",
                )?;
                let mut rows = stmt.query(rusqlite::params![max_attempts, received_after, limit])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_webhook_event(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn count_webhook_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<(i64, i64), tokio_rusqlite::Error> {
        let since = dt_to_sql(since);
        self.conn
            .call(move |conn| {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM webhook_events WHERE received_at >= ?1",
                    rusqlite::params![since],
                    |r| r.get(0),
                )?;
                let failed: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM webhook_events WHERE received_at >= ?1 AND processing_status = 'failed'",
                    rusqlite::params![since],
                    |r| r.get(0),
                )?;
                Ok((total, failed))
            })
            .await
    }

    pub async fn cleanup_webhook_events_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, tokio_rusqlite::Error> {
        let cutoff = dt_to_sql(cutoff);
        self.conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM webhook_events WHERE received_at < ?1
                     AND processing_status IN ('completed', 'failed')",
                    rusqlite::params![cutoff],
                )?;
                Ok(n)
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Security events (audit chain)
    // -----------------------------------------------------------------------

    pub async fn insert_security_event_pending(
        &self,
        event: &SecurityEvent,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let event_type = event.event_type.clone();
        let category = event.category.clone();
        let severity = enum_to_sql(&event.severity);
        let actor = json_to_sql(&event.actor);
        let resource = json_to_sql(&event.resource);
        let success = event.success as i64;
        let description = event.description.clone();
        let metadata = json_to_sql(&event.metadata);
        let compliance_tags = serde_json::to_string(&event.compliance_tags).unwrap();
        let correlation_id = event.correlation_id.to_string();
        let retention_date = dt_to_sql(event.retention_date);
        let created_at = dt_to_sql(event.created_at);
        let previous_checksum = event.previous_checksum.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO security_events (event_type, category, severity, actor, resource,
                        success, description, metadata, compliance_tags, correlation_id, checksum,
                        previous_checksum, retention_date, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,NULL,?11,?12,?13)",
                    rusqlite::params![
                        event_type, category, severity, actor, resource, success, description,
                        metadata, compliance_tags, correlation_id, previous_checksum, retention_date,
                        created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    pub async fn set_security_event_checksum(
        &self,
        id: i64,
        checksum: String,
    ) -> Result<(), tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE security_events SET checksum = ?2 WHERE id = ?1",
                    rusqlite::params![id, checksum],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_security_event(
        &self,
        id: i64,
    ) -> Result<Option<SecurityEvent>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(Self::SECURITY_COLUMNS_BY_ID)?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_security_event(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    const SECURITY_COLUMNS_BY_ID: &'static str = "SELECT id, event_type, category, severity, actor, resource, success,
                        description, metadata, compliance_tags, correlation_id, checksum,
                        previous_checksum, retention_date, created_at
                     FROM security_events WHERE id = ?1";

    pub async fn latest_security_event(
        &self,
    ) -> Result<Option<SecurityEvent>, tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, event_type, category, severity, actor, resource, success,
                        description, metadata, compliance_tags, correlation_id, checksum,
                        previous_checksum, retention_date, created_at
                     FROM security_events ORDER BY id DESC LIMIT 1",
                )?;
                let mut rows = stmt.query([])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_security_event(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn list_security_events_asc(
        &self,
    ) -> Result<Vec<SecurityEvent>, tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, event_type, category, severity, actor, resource, success,
                        description, metadata, compliance_tags, correlation_id, checksum,
                        previous_checksum, retention_date, created_at
                     FROM security_events ORDER BY id ASC",
                )?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_security_event(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn list_security_events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SecurityEvent>, tokio_rusqlite::Error> {
        let from = dt_to_sql(from);
        let to = dt_to_sql(to);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, event_type, category, severity, actor, resource, success,
                        description, metadata, compliance_tags, correlation_id, checksum,
                        previous_checksum, retention_date, created_at
                     FROM security_events WHERE created_at >= ?1 AND created_at <= ?2 ORDER BY id ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![from, to])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_security_event(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn delete_security_events_due_for_retention(
        &self,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Vec<SecurityEvent>, tokio_rusqlite::Error> {
        let now_str = dt_to_sql(now);
        let due = self
            .conn
            .call({
                let now_str = now_str.clone();
                move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, event_type, category, severity, actor, resource, success,
                            description, metadata, compliance_tags, correlation_id, checksum,
                            previous_checksum, retention_date, created_at
                         FROM security_events WHERE retention_date <= ?1 ORDER BY id ASC",
                    )?;
                    let mut rows = stmt.query(rusqlite::params![now_str])?;
                    let mut out = Vec::new();
                    while let Some(row) = rows.next()? {
                        out.push(row_to_security_event(row)?);
                    }
                    Ok(out)
                }
            })
            .await?;

        if !dry_run && !due.is_empty() {
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "DELETE FROM security_events WHERE retention_date <= ?1",
                        rusqlite::params![now_str],
                    )?;
                    Ok(())
                })
                .await?;
        }
        Ok(due)
    }

    // -----------------------------------------------------------------------
    // Field mapping templates / mappings / versions
    // -----------------------------------------------------------------------

    pub async fn upsert_field_mapping_template(
        &self,
        name: &str,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let name = name.to_string();
        let now_str = dt_to_sql(now);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO field_mapping_templates (name, is_active, created_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET is_active=excluded.is_active",
                    rusqlite::params![name, is_active as i64, now_str],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM field_mapping_templates WHERE name = ?1",
                    rusqlite::params![name],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn get_field_mapping_template_by_name(
        &self,
        name: &str,
    ) -> Result<Option<FieldMappingTemplate>, tokio_rusqlite::Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, is_active, created_at FROM field_mapping_templates
                     WHERE name = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![name])?;
                match rows.next()? {
                    Some(row) => Ok(Some(FieldMappingTemplate {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_active: row.get::<_, i64>(2)? != 0,
                        created_at: dt_from_sql(&row.get::<_, String>(3)?),
                    })),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn get_field_mapping_by_id(
        &self,
        id: i64,
    ) -> Result<Option<FieldMapping>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, template_id, tracker_field_id, target_field, field_type,
                        mapping_type, transformation_config, validation_rules, default_value,
                        required, is_active
                     FROM field_mappings WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_field_mapping(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn update_field_mapping(
        &self,
        mapping: &FieldMapping,
    ) -> Result<(), tokio_rusqlite::Error> {
        let id = mapping.id;
        let target_field = mapping.target_field.clone();
        let field_type = enum_to_sql(&mapping.field_type);
        let mapping_type = enum_to_sql(&mapping.mapping_type);
        let transformation_config = json_to_sql(&mapping.transformation_config);
        let validation_rules = json_to_sql(&mapping.validation_rules);
        let default_value = mapping.default_value.as_ref().map(json_to_sql);
        let required = mapping.required as i64;
        let is_active = mapping.is_active as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE field_mappings SET target_field=?2, field_type=?3, mapping_type=?4,
                        transformation_config=?5, validation_rules=?6, default_value=?7,
                        required=?8, is_active=?9
                     WHERE id=?1",
                    rusqlite::params![
                        id, target_field, field_type, mapping_type, transformation_config,
                        validation_rules, default_value, required, is_active,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_field_mapping_by_key(
        &self,
        template_id: i64,
        tracker_field_id: &str,
    ) -> Result<Option<FieldMapping>, tokio_rusqlite::Error> {
        let tracker_field_id = tracker_field_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, template_id, tracker_field_id, target_field, field_type,
                        mapping_type, transformation_config, validation_rules, default_value,
                        required, is_active
                     FROM field_mappings
                     WHERE template_id = ?1 AND tracker_field_id = ?2 AND is_active = 1",
                )?;
                let mut rows = stmt.query(rusqlite::params![template_id, tracker_field_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_field_mapping(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn insert_field_mapping(
        &self,
        mapping: &FieldMapping,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let template_id = mapping.template_id;
        let tracker_field_id = mapping.tracker_field_id.clone();
        let target_field = mapping.target_field.clone();
        let field_type = enum_to_sql(&mapping.field_type);
        let mapping_type = enum_to_sql(&mapping.mapping_type);
        let transformation_config = json_to_sql(&mapping.transformation_config);
        let validation_rules = json_to_sql(&mapping.validation_rules);
        let default_value = mapping.default_value.as_ref().map(json_to_sql);
        let required = mapping.required as i64;
        let is_active = mapping.is_active as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO field_mappings (template_id, tracker_field_id, target_field,
                        field_type, mapping_type, transformation_config, validation_rules,
                        default_value, required, is_active)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                    rusqlite::params![
                        template_id, tracker_field_id, target_field, field_type, mapping_type,
                        transformation_config, validation_rules, default_value, required, is_active,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    pub async fn deactivate_field_mapping(&self, id: i64) -> Result<(), tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE field_mappings SET is_active = 0 WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn list_active_mappings_for_template(
        &self,
        template_id: i64,
    ) -> Result<Vec<FieldMapping>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, template_id, tracker_field_id, target_field, field_type,
                        mapping_type, transformation_config, validation_rules, default_value,
                        required, is_active
                     FROM field_mappings WHERE template_id = ?1 AND is_active = 1",
                )?;
                let mut rows = stmt.query(rusqlite::params![template_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_field_mapping(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn insert_field_mapping_version(
        &self,
        version: &FieldMappingVersion,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let mapping_id = version.mapping_id;
        let change_type = enum_to_sql(&version.change_type);
        let description = version.description.clone();
        let previous_config = version.previous_config.as_ref().map(json_to_sql);
        let new_config = version.new_config.as_ref().map(json_to_sql);
        let created_at = dt_to_sql(version.created_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO field_mapping_versions (mapping_id, change_type, description,
                        previous_config, new_config, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    rusqlite::params![mapping_id, change_type, description, previous_config, new_config, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Cached sprints
    // -----------------------------------------------------------------------

    pub async fn upsert_cached_sprint(
        &self,
        cached: &CachedSprint,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let tracker_sprint_id = cached.tracker_sprint_id;
        let raw_payload = json_to_sql(&cached.raw_payload);
        let last_fetched_at = dt_to_sql(cached.last_fetched_at);
        let error_count = cached.error_count;
        let last_error = cached.last_error.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO cached_sprints (tracker_sprint_id, raw_payload, last_fetched_at,
                        error_count, last_error)
                     VALUES (?1,?2,?3,?4,?5)
                     ON CONFLICT(tracker_sprint_id) DO UPDATE SET
                        raw_payload=excluded.raw_payload, last_fetched_at=excluded.last_fetched_at,
                        error_count=excluded.error_count, last_error=excluded.last_error",
                    rusqlite::params![tracker_sprint_id, raw_payload, last_fetched_at, error_count, last_error],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM cached_sprints WHERE tracker_sprint_id = ?1",
                    rusqlite::params![tracker_sprint_id],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn get_cached_sprint(
        &self,
        tracker_sprint_id: i64,
    ) -> Result<Option<CachedSprint>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tracker_sprint_id, raw_payload, last_fetched_at, error_count, last_error
                     FROM cached_sprints WHERE tracker_sprint_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![tracker_sprint_id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(CachedSprint {
                        id: row.get(0)?,
                        tracker_sprint_id: row.get(1)?,
                        raw_payload: json_from_sql(&row.get::<_, String>(2)?),
                        last_fetched_at: dt_from_sql(&row.get::<_, String>(3)?),
                        error_count: row.get(4)?,
                        last_error: row.get(5)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Project workstreams / associations / metrics / capacity
    // -----------------------------------------------------------------------

    pub async fn upsert_project_workstream(
        &self,
        ws: &ProjectWorkstream,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let project_key = ws.project_key.clone();
        let project_name = ws.project_name.clone();
        let tracker_board_id = ws.tracker_board_id;
        let tracker_board_name = ws.tracker_board_name.clone();
        let workstream_type = enum_to_sql(&ws.workstream_type);
        let category = ws.category.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO project_workstreams (project_key, project_name, tracker_board_id,
                        tracker_board_name, workstream_type, category)
                     VALUES (?1,?2,?3,?4,?5,?6)
                     ON CONFLICT(project_key) DO UPDATE SET
                        project_name=excluded.project_name, tracker_board_id=excluded.tracker_board_id,
                        tracker_board_name=excluded.tracker_board_name,
                        workstream_type=excluded.workstream_type, category=excluded.category",
                    rusqlite::params![project_key, project_name, tracker_board_id, tracker_board_name, workstream_type, category],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM project_workstreams WHERE project_key = ?1",
                    rusqlite::params![project_key],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn get_project_workstream_by_key(
        &self,
        project_key: &str,
    ) -> Result<Option<ProjectWorkstream>, tokio_rusqlite::Error> {
        let project_key = project_key.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_key, project_name, tracker_board_id, tracker_board_name,
                        workstream_type, category
                     FROM project_workstreams WHERE project_key = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(ProjectWorkstream {
                        id: row.get(0)?,
                        project_key: row.get(1)?,
                        project_name: row.get(2)?,
                        tracker_board_id: row.get(3)?,
                        tracker_board_name: row.get(4)?,
                        workstream_type: enum_from_sql(&row.get::<_, String>(5)?),
                        category: row.get(6)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
    }

    pub async fn list_project_workstreams(&self) -> Result<Vec<ProjectWorkstream>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_key, project_name, tracker_board_id, tracker_board_name,
                        workstream_type, category
                     FROM project_workstreams ORDER BY project_key ASC",
                )?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(ProjectWorkstream {
                        id: row.get(0)?,
                        project_key: row.get(1)?,
                        project_name: row.get(2)?,
                        tracker_board_id: row.get(3)?,
                        tracker_board_name: row.get(4)?,
                        workstream_type: enum_from_sql(&row.get::<_, String>(5)?),
                        category: row.get(6)?,
                    });
                }
                Ok(out)
            })
            .await
    }

    pub async fn upsert_project_sprint_association(
        &self,
        assoc: &ProjectSprintAssociation,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let sprint_id = assoc.sprint_id;
        let project_workstream_id = assoc.project_workstream_id;
        let association_type = enum_to_sql(&assoc.association_type);
        let priority = assoc.priority;
        let expected = assoc.expected_story_points;
        let actual = assoc.actual_story_points;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO project_sprint_associations (sprint_id, project_workstream_id,
                        association_type, priority, expected_story_points, actual_story_points)
                     VALUES (?1,?2,?3,?4,?5,?6)
                     ON CONFLICT(sprint_id, project_workstream_id) DO UPDATE SET
                        association_type=excluded.association_type, priority=excluded.priority,
                        expected_story_points=excluded.expected_story_points,
                        actual_story_points=excluded.actual_story_points",
                    rusqlite::params![sprint_id, project_workstream_id, association_type, priority, expected, actual],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM project_sprint_associations WHERE sprint_id = ?1 AND project_workstream_id = ?2",
                    rusqlite::params![sprint_id, project_workstream_id],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn list_associations_for_sprint(
        &self,
        sprint_id: i64,
    ) -> Result<Vec<ProjectSprintAssociation>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sprint_id, project_workstream_id, association_type, priority,
                        expected_story_points, actual_story_points
                     FROM project_sprint_associations WHERE sprint_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![sprint_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(ProjectSprintAssociation {
                        id: row.get(0)?,
                        sprint_id: row.get(1)?,
                        project_workstream_id: row.get(2)?,
                        association_type: enum_from_sql(&row.get::<_, String>(3)?),
                        priority: row.get(4)?,
                        expected_story_points: row.get(5)?,
                        actual_story_points: row.get(6)?,
                    });
                }
                Ok(out)
            })
            .await
    }

    pub async fn insert_project_sprint_metrics(
        &self,
        m: &ProjectSprintMetrics,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let sprint_id = m.sprint_id;
        let project_workstream_id = m.project_workstream_id;
        let metric_date = dt_to_sql(m.metric_date);
        let issues_total = m.issues_total;
        let issues_completed = m.issues_completed;
        let issues_in_progress = m.issues_in_progress;
        let issues_blocked = m.issues_blocked;
        let story_points_total = m.story_points_total;
        let story_points_completed = m.story_points_completed;
        let completion_percentage = m.completion_percentage;
        let velocity = m.velocity;
        let burndown_rate = m.burndown_rate;
        let scope_added = m.scope_added;
        let scope_removed = m.scope_removed;
        let details = json_to_sql(&m.details);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO project_sprint_metrics (sprint_id, project_workstream_id,
                        metric_date, issues_total, issues_completed, issues_in_progress,
                        issues_blocked, story_points_total, story_points_completed,
                        completion_percentage, velocity, burndown_rate, scope_added,
                        scope_removed, details)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                     ON CONFLICT(sprint_id, project_workstream_id, metric_date) DO UPDATE SET
                        issues_total=excluded.issues_total, issues_completed=excluded.issues_completed,
                        issues_in_progress=excluded.issues_in_progress, issues_blocked=excluded.issues_blocked,
                        story_points_total=excluded.story_points_total,
                        story_points_completed=excluded.story_points_completed,
                        completion_percentage=excluded.completion_percentage, velocity=excluded.velocity,
                        burndown_rate=excluded.burndown_rate, scope_added=excluded.scope_added,
                        scope_removed=excluded.scope_removed, details=excluded.details",
                    rusqlite::params![
                        sprint_id, project_workstream_id, metric_date, issues_total, issues_completed,
                        issues_in_progress, issues_blocked, story_points_total, story_points_completed,
                        completion_percentage, velocity, burndown_rate, scope_added, scope_removed, details,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    pub async fn list_metrics_for_sprint_project(
        &self,
        sprint_id: i64,
        project_workstream_id: i64,
    ) -> Result<Vec<ProjectSprintMetrics>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sprint_id, project_workstream_id, metric_date, issues_total,
                        issues_completed, issues_in_progress, issues_blocked, story_points_total,
                        story_points_completed, completion_percentage, velocity, burndown_rate,
                        scope_added, scope_removed, details
                     FROM project_sprint_metrics WHERE sprint_id = ?1 AND project_workstream_id = ?2
                     ORDER BY metric_date ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![sprint_id, project_workstream_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_metrics(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn upsert_discipline_team_capacity(
        &self,
        c: &DisciplineTeamCapacity,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let sprint_id = c.sprint_id;
        let team_name = c.team_name.clone();
        let capacity_points = c.capacity_points;
        let capacity_type = enum_to_sql(&c.capacity_type);
        let allocated = c.allocated;
        let notes = c.notes.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO discipline_team_capacities (sprint_id, team_name, capacity_points,
                        capacity_type, allocated, notes)
                     VALUES (?1,?2,?3,?4,?5,?6)
                     ON CONFLICT(sprint_id, team_name) DO UPDATE SET
                        capacity_points=excluded.capacity_points, capacity_type=excluded.capacity_type,
                        allocated=excluded.allocated, notes=excluded.notes",
                    rusqlite::params![sprint_id, team_name, capacity_points, capacity_type, allocated, notes],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM discipline_team_capacities WHERE sprint_id = ?1 AND team_name = ?2",
                    rusqlite::params![sprint_id, team_name],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn list_capacities_for_sprint(
        &self,
        sprint_id: i64,
    ) -> Result<Vec<DisciplineTeamCapacity>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sprint_id, team_name, capacity_points, capacity_type, allocated, notes
                     FROM discipline_team_capacities WHERE sprint_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![sprint_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(DisciplineTeamCapacity {
                        id: row.get(0)?,
                        sprint_id: row.get(1)?,
                        team_name: row.get(2)?,
                        capacity_points: row.get(3)?,
                        capacity_type: enum_from_sql(&row.get::<_, String>(4)?),
                        allocated: row.get(5)?,
                        notes: row.get(6)?,
                    });
                }
                Ok(out)
            })
            .await
    }

    pub async fn upsert_project_capacity_allocation(
        &self,
        a: &ProjectCapacityAllocation,
    ) -> Result<i64, tokio_rusqlite::Error> {
        let sprint_id = a.sprint_id;
        let project_workstream_id = a.project_workstream_id;
        let team_capacity_id = a.team_capacity_id;
        let allocated = a.allocated;
        let utilized = a.utilized;
        let remaining = a.remaining;
        let priority = a.priority;
        let trend = enum_to_sql(&a.trend);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO project_capacity_allocations (sprint_id, project_workstream_id,
                        team_capacity_id, allocated, utilized, remaining, priority, trend)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
                     ON CONFLICT(sprint_id, project_workstream_id, team_capacity_id) DO UPDATE SET
                        allocated=excluded.allocated, utilized=excluded.utilized,
                        remaining=excluded.remaining, priority=excluded.priority, trend=excluded.trend",
                    rusqlite::params![sprint_id, project_workstream_id, team_capacity_id, allocated, utilized, remaining, priority, trend],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM project_capacity_allocations
                     WHERE sprint_id = ?1 AND project_workstream_id = ?2 AND team_capacity_id = ?3",
                    rusqlite::params![sprint_id, project_workstream_id, team_capacity_id],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn list_allocations_for_sprint(
        &self,
        sprint_id: i64,
    ) -> Result<Vec<ProjectCapacityAllocation>, tokio_rusqlite::Error> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sprint_id, project_workstream_id, team_capacity_id, allocated,
                        utilized, remaining, priority, trend
                     FROM project_capacity_allocations WHERE sprint_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![sprint_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(ProjectCapacityAllocation {
                        id: row.get(0)?,
                        sprint_id: row.get(1)?,
                        project_workstream_id: row.get(2)?,
                        team_capacity_id: row.get(3)?,
                        allocated: row.get(4)?,
                        utilized: row.get(5)?,
                        remaining: row.get(6)?,
                        priority: row.get(7)?,
                        trend: enum_from_sql(&row.get::<_, String>(8)?),
                    });
                }
                Ok(out)
            })
            .await
    }

    // -----------------------------------------------------------------------
    // RBAC
    // -----------------------------------------------------------------------

    pub async fn upsert_role(&self, role: &Role) -> Result<i64, tokio_rusqlite::Error> {
        let name = role.name.clone();
        let permissions = serde_json::to_string(&role.permissions).unwrap();
        let is_system_role = role.is_system_role as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO roles (name, permissions, is_system_role) VALUES (?1,?2,?3)
                     ON CONFLICT(name) DO UPDATE SET permissions=excluded.permissions,
                        is_system_role=excluded.is_system_role",
                    rusqlite::params![name, permissions, is_system_role],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM roles WHERE name = ?1",
                    rusqlite::params![name],
                    |r| r.get(0),
                )?;
                Ok(id)
            })
            .await
    }

    pub async fn assign_role(
        &self,
        user_id: &str,
        role_id: i64,
        granted_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), tokio_rusqlite::Error> {
        let user_id = user_id.to_string();
        let granted_by = granted_by.map(|s| s.to_string());
        let now_str = dt_to_sql(now);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO user_role_assignments (user_id, role_id, granted_at, granted_by)
                     VALUES (?1,?2,?3,?4)",
                    rusqlite::params![user_id, role_id, now_str, granted_by],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn list_roles_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Role>, tokio_rusqlite::Error> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT r.id, r.name, r.permissions, r.is_system_role
                     FROM roles r
                     JOIN user_role_assignments ura ON ura.role_id = r.id
                     WHERE ura.user_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![user_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let permissions_str: String = row.get(2)?;
                    out.push(Role {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        permissions: serde_json::from_str(&permissions_str).unwrap_or_default(),
                        is_system_role: row.get::<_, i64>(3)? != 0,
                    });
                }
                Ok(out)
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// SyncHistory helper (Clone subset used for param binding; avoids cloning Uuid/enum twice)
// ---------------------------------------------------------------------------

struct SyncHistoryFields {
    entities_processed: i64,
    entities_created: i64,
    entities_updated: i64,
    entities_deleted: i64,
    entities_skipped: i64,
    conflicts_detected: i64,
    conflicts_resolved: i64,
    duration_seconds: f64,
    api_calls_made: i64,
    error_message: Option<String>,
}

impl SyncHistory {
    fn clone_for_insert(&self) -> SyncHistoryFields {
        SyncHistoryFields {
            entities_processed: self.entities_processed,
            entities_created: self.entities_created,
            entities_updated: self.entities_updated,
            entities_deleted: self.entities_deleted,
            entities_skipped: self.entities_skipped,
            conflicts_detected: self.conflicts_detected,
            conflicts_resolved: self.conflicts_resolved,
            duration_seconds: self.duration_seconds,
            api_calls_made: self.api_calls_made,
            error_message: self.error_message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn row_to_sprint(row: &rusqlite::Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get(0)?,
        tracker_sprint_id: row.get(1)?,
        name: row.get(2)?,
        state: enum_from_sql(&row.get::<_, String>(3)?),
        goal: row.get(4)?,
        start_date: opt_dt_from_sql(row.get(5)?),
        end_date: opt_dt_from_sql(row.get(6)?),
        complete_date: opt_dt_from_sql(row.get(7)?),
        board_id: row.get(8)?,
        tracker_last_modified: opt_dt_from_sql(row.get(9)?),
        sync_status: enum_from_sql(&row.get::<_, String>(10)?),
        tracker_board_name: row.get(11)?,
        tracker_project_key: row.get(12)?,
        tracker_api_version: row.get(13)?,
    })
}

fn row_to_sync_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncMetadata> {
    let batch_id: Option<String> = row.get(13)?;
    Ok(SyncMetadata {
        id: row.get(0)?,
        entity_type: enum_from_sql(&row.get::<_, String>(1)?),
        entity_id: row.get(2)?,
        tracker_id: row.get(3)?,
        sync_status: enum_from_sql(&row.get::<_, String>(4)?),
        last_attempt: opt_dt_from_sql(row.get(5)?),
        last_successful: opt_dt_from_sql(row.get(6)?),
        local_modified: opt_dt_from_sql(row.get(7)?),
        remote_modified: opt_dt_from_sql(row.get(8)?),
        error_count: row.get(9)?,
        last_error: row.get(10)?,
        sync_direction: enum_from_sql(&row.get::<_, String>(11)?),
        content_hash: row.get(12)?,
        batch_id: batch_id.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
    })
}

fn row_to_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConflictResolution> {
    Ok(ConflictResolution {
        id: row.get(0)?,
        sync_metadata_id: row.get(1)?,
        conflict_type: enum_from_sql(&row.get::<_, String>(2)?),
        field_name: row.get(3)?,
        local_value: json_from_sql(&row.get::<_, String>(4)?),
        remote_value: json_from_sql(&row.get::<_, String>(5)?),
        resolution_strategy: enum_from_sql(&row.get::<_, String>(6)?),
        resolved_value: row.get::<_, Option<String>>(7)?.map(|s| json_from_sql(&s)),
        resolver: row.get(8)?,
        resolved_at: opt_dt_from_sql(row.get(9)?),
        resolved: row.get::<_, i64>(10)? != 0,
        notes: row.get(11)?,
    })
}

fn row_to_webhook_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<WebhookEvent> {
    Ok(WebhookEvent {
        id: row.get(0)?,
        event_id: row.get(1)?,
        event_type: row.get(2)?,
        payload: json_from_sql(&row.get::<_, String>(3)?),
        processing_status: enum_from_sql(&row.get::<_, String>(4)?),
        attempts: row.get(5)?,
        last_processed_at: opt_dt_from_sql(row.get(6)?),
        error: row.get(7)?,
        processed_data: row.get::<_, Option<String>>(8)?.map(|s| json_from_sql(&s)),
        received_at: dt_from_sql(&row.get::<_, String>(9)?),
    })
}

fn row_to_security_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<SecurityEvent> {
    let compliance_tags: String = row.get(9)?;
    Ok(SecurityEvent {
        id: row.get(0)?,
        event_type: row.get(1)?,
        category: row.get(2)?,
        severity: enum_from_sql(&row.get::<_, String>(3)?),
        actor: json_from_sql(&row.get::<_, String>(4)?),
        resource: json_from_sql(&row.get::<_, String>(5)?),
        success: row.get::<_, i64>(6)? != 0,
        description: row.get(7)?,
        metadata: json_from_sql(&row.get::<_, String>(8)?),
        compliance_tags: serde_json::from_str(&compliance_tags).unwrap_or_default(),
        correlation_id: Uuid::parse_str(&row.get::<_, String>(10)?).expect("valid uuid"),
        checksum: row.get(11)?,
        previous_checksum: row.get(12)?,
        retention_date: dt_from_sql(&row.get::<_, String>(13)?),
        created_at: dt_from_sql(&row.get::<_, String>(14)?),
    })
}

fn row_to_field_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<FieldMapping> {
    Ok(FieldMapping {
        id: row.get(0)?,
        template_id: row.get(1)?,
        tracker_field_id: row.get(2)?,
        target_field: row.get(3)?,
        field_type: enum_from_sql(&row.get::<_, String>(4)?),
        mapping_type: enum_from_sql(&row.get::<_, String>(5)?),
        transformation_config: json_from_sql(&row.get::<_, String>(6)?),
        validation_rules: json_from_sql(&row.get::<_, String>(7)?),
        default_value: row.get::<_, Option<String>>(8)?.map(|s| json_from_sql(&s)),
        required: row.get::<_, i64>(9)? != 0,
        is_active: row.get::<_, i64>(10)? != 0,
    })
}

fn row_to_metrics(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectSprintMetrics> {
    Ok(ProjectSprintMetrics {
        id: row.get(0)?,
        sprint_id: row.get(1)?,
        project_workstream_id: row.get(2)?,
        metric_date: dt_from_sql(&row.get::<_, String>(3)?),
        issues_total: row.get(4)?,
        issues_completed: row.get(5)?,
        issues_in_progress: row.get(6)?,
        issues_blocked: row.get(7)?,
        story_points_total: row.get(8)?,
        story_points_completed: row.get(9)?,
        completion_percentage: row.get(10)?,
        velocity: row.get(11)?,
        burndown_rate: row.get(12)?,
        scope_added: row.get(13)?,
        scope_removed: row.get(14)?,
        details: json_from_sql(&row.get::<_, String>(15)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sprint(tracker_id: i64) -> Sprint {
        Sprint {
            id: 0,
            tracker_sprint_id: tracker_id,
            name: "S1".into(),
            state: SprintState::Active,
            goal: None,
            start_date: None,
            end_date: None,
            complete_date: None,
            board_id: 1,
            tracker_last_modified: None,
            sync_status: SyncStatus::Completed,
            tracker_board_name: Some("Board 1".into()),
            tracker_project_key: Some("PROJ".into()),
            tracker_api_version: Some("3".into()),
        }
    }

    #[tokio::test]
    async fn upsert_sprint_assigns_local_id_and_is_idempotent_by_tracker_id() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let id1 = db.upsert_sprint(&sample_sprint(10)).await.unwrap();
        let mut updated = sample_sprint(10);
        updated.name = "S1 renamed".into();
        let id2 = db.upsert_sprint(&updated).await.unwrap();
        assert_eq!(id1, id2);

        let fetched = db.get_sprint(id1).await.unwrap().unwrap();
        assert_eq!(fetched.name, "S1 renamed");
    }

    #[tokio::test]
    async fn webhook_event_insert_is_idempotent_by_event_id() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = WebhookEvent {
            id: 0,
            event_id: "evt-1".into(),
            event_type: "jira:issue_updated".into(),
            payload: serde_json::json!({}),
            processing_status: ProcessingStatus::Pending,
            attempts: 0,
            last_processed_at: None,
            error: None,
            processed_data: None,
            received_at: Utc::now(),
        };
        let (id1, new1) = db.insert_webhook_event_idempotent(&event).await.unwrap();
        let (id2, new2) = db.insert_webhook_event_idempotent(&event).await.unwrap();
        assert!(new1);
        assert!(!new2);
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn security_event_chain_fields_roundtrip() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let now = Utc::now();
        let event = SecurityEvent {
            id: 0,
            event_type: "auth.login".into(),
            category: "authentication".into(),
            severity: SecuritySeverity::Info,
            actor: serde_json::json!({"user_id": "u1"}),
            resource: serde_json::json!({"type": "session"}),
            success: true,
            description: "login".into(),
            metadata: serde_json::json!({}),
            compliance_tags: vec!["soc2".into()],
            correlation_id: Uuid::new_v4(),
            checksum: None,
            previous_checksum: None,
            retention_date: now + chrono::Duration::days(365),
            created_at: now,
        };
        let id = db.insert_security_event_pending(&event).await.unwrap();
        db.set_security_event_checksum(id, "abc123".into()).await.unwrap();
        let fetched = db.get_security_event(id).await.unwrap().unwrap();
        assert_eq!(fetched.checksum.as_deref(), Some("abc123"));
        assert_eq!(fetched.compliance_tags, vec!["soc2"]);
    }
}

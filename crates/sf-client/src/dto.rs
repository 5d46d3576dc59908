//! Raw wire shapes returned by the tracker's REST/Agile API. These stay
//! close to the tracker's own JSON; translation into canonical domain
//! fields is `sf-mapper`'s job, not this crate's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintDTO {
    pub id: i64,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(default, rename = "completeDate")]
    pub complete_date: Option<String>,
    #[serde(rename = "originBoardId")]
    pub origin_board_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDTO {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: String,
    #[serde(default)]
    pub location: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDTO {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDTO {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default, rename = "schema")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDTO {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogItem {
    pub field: String,
    #[serde(default, rename = "fieldtype")]
    pub field_type: Option<String>,
    #[serde(default, rename = "fromString")]
    pub from_string: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_string: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub items: Vec<ChangelogItem>,
}

/// Inbound webhook envelope, per the external webhook surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "webhookEvent")]
    pub webhook_event: String,
    pub timestamp: i64,
    #[serde(default)]
    pub issue: Option<IssueDTO>,
    #[serde(default)]
    pub sprint: Option<SprintDTO>,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

// ---------------------------------------------------------------------------
// Generic paginated envelope shared by /agile/1.0/board and /agile/1.0/sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ValuesPage<T> {
    #[serde(rename = "startAt")]
    pub start_at: i64,
    #[serde(rename = "maxResults")]
    pub max_results: i64,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default, rename = "isLast")]
    pub is_last: Option<bool>,
    pub values: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(rename = "startAt")]
    pub start_at: i64,
    #[serde(rename = "maxResults")]
    pub max_results: i64,
    pub total: i64,
    #[serde(default)]
    pub issues: Vec<IssueDTO>,
}

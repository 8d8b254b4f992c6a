use serde::{Deserialize, Deserializer, Serialize};

use crate::tasks::repo::{Priority, SortField, SortOrder, Status, Task, TaskPatch, TaskQuery};

/// Body for POST /tasks. Enum-valued fields arrive as raw strings so the
/// rule list can report a bad label as a field error instead of a
/// deserialize failure.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

/// Body for PUT /tasks/:id — any subset of the mutable fields. A missing
/// `description` key leaves the field alone; an explicit `"description":
/// null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

// A plain nested Option collapses null into the outer None; this keeps
// present-but-null distinguishable from absent.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    /// Build the merge-patch, normalizing the title the same way the
    /// create path does. Call after the rule list has passed: enum labels
    /// are already known to be valid.
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            priority: self.priority.as_deref().and_then(Priority::parse),
            status: self.status.as_deref().and_then(Status::parse),
        }
    }
}

/// Query string for GET /tasks.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

impl ListTasksQuery {
    pub fn into_query(self) -> TaskQuery {
        TaskQuery {
            status: self.status,
            priority: self.priority,
            sort: SortField::parse_or_default(self.sort_by.as_deref()),
            order: SortOrder::parse_or_default(self.order.as_deref()),
            page: self.page.max(1),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

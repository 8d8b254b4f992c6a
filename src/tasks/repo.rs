use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Status {
    Pending,
    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,
    Done,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Status::Pending),
            "In Progress" => Some(Status::InProgress),
            "Done" => Some(Status::Done),
            _ => None,
        }
    }
}

/// Task record in the database. Serialized camelCase for the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Priority,
}

impl SortField {
    /// Unknown sort fields silently fall back to creation time.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("createdAt") => SortField::CreatedAt,
            Some("priority") => SortField::Priority,
            _ => SortField::CreatedAt,
        }
    }

    fn as_column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything but an explicit "asc" sorts descending.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter/sort/paginate request for a task listing. Filters are the raw
/// client strings: a value outside the enum labels simply matches no rows.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

/// Merge-patch for a single task; `None` fields keep their current value.
/// `description` is doubly optional: `Some(None)` clears it, outer `None`
/// leaves it alone.
#[derive(Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

/// Offset for a 1-indexed page. Saturates so hostile page/limit values can
/// neither overflow the multiplication nor produce a negative OFFSET.
pub(crate) fn page_offset(page: i64, limit: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(limit.max(0))
}

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, created_at";

impl Task {
    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        priority: Priority,
        status: Status,
    ) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, priority, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, priority, status, created_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(priority)
        .bind(status)
        .fetch_one(db)
        .await
    }

    pub async fn list(
        db: &PgPool,
        owner_id: Uuid,
        query: &TaskQuery,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let limit = query.limit.max(0);
        let offset = page_offset(query.page, limit);

        // Sort column and direction come from closed enums, never from
        // client input.
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR priority = $3) \
             ORDER BY {} {} \
             LIMIT $4 OFFSET $5",
            query.sort.as_column(),
            query.order.as_sql(),
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(owner_id)
            .bind(query.status.as_deref())
            .bind(query.priority.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await
    }

    /// Count of tasks matching the same filters as `list`, ignoring paging.
    pub async fn count(
        db: &PgPool,
        owner_id: Uuid,
        query: &TaskQuery,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR priority = $3)
            "#,
        )
        .bind(owner_id)
        .bind(query.status.as_deref())
        .bind(query.priority.as_deref())
        .fetch_one(db)
        .await
    }

    /// Fetch a task by id, scoped to its owner. A foreign or missing id
    /// both come back as `None`.
    pub async fn find(
        db: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, priority, status, created_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = COALESCE($3, title),
                description = CASE WHEN $4 THEN $5::text ELSE description END,
                priority = COALESCE($6, priority),
                status = COALESCE($7, status)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, priority, status, created_at
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .bind(patch.title.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.as_ref().and_then(|d| d.as_deref()))
        .bind(patch.priority)
        .bind(patch.status)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, owner_id: Uuid, task_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_labels_roundtrip() {
        for (label, value) in [
            ("Low", Priority::Low),
            ("Medium", Priority::Medium),
            ("High", Priority::High),
        ] {
            assert_eq!(Priority::parse(label), Some(value));
            assert_eq!(serde_json::to_value(value).unwrap(), label);
        }
        assert_eq!(Priority::parse("Urgent"), None);
        assert_eq!(Priority::parse("low"), None);
    }

    #[test]
    fn status_labels_roundtrip() {
        for (label, value) in [
            ("Pending", Status::Pending),
            ("In Progress", Status::InProgress),
            ("Done", Status::Done),
        ] {
            assert_eq!(Status::parse(label), Some(value));
            assert_eq!(serde_json::to_value(value).unwrap(), label);
        }
        assert_eq!(Status::parse("InProgress"), None);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_created_at() {
        assert_eq!(
            SortField::parse_or_default(Some("bogus")),
            SortField::CreatedAt
        );
        assert_eq!(SortField::parse_or_default(None), SortField::CreatedAt);
        assert_eq!(
            SortField::parse_or_default(Some("priority")),
            SortField::Priority
        );
    }

    #[test]
    fn order_defaults_to_descending() {
        assert_eq!(SortOrder::parse_or_default(None), SortOrder::Desc);
        assert_eq!(SortOrder::parse_or_default(Some("desc")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_or_default(Some("ASC")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_or_default(Some("asc")), SortOrder::Asc);
    }

    #[test]
    fn offset_is_zero_based_from_page_and_limit() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(4, 5), 15);
    }

    #[test]
    fn offset_saturates_on_hostile_paging_values() {
        // i64::MAX page must not overflow the multiplication.
        assert_eq!(page_offset(i64::MAX, 10), i64::MAX);
        assert_eq!(page_offset(i64::MAX, i64::MAX), i64::MAX);
        // Zero/negative inputs clamp instead of going negative.
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(-5, 10), 0);
        assert_eq!(page_offset(3, -7), 0);
    }

    #[test]
    fn task_serializes_camel_case_without_leaks() {
        let task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Write report".into(),
            description: None,
            priority: Priority::High,
            status: Status::InProgress,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["priority"], "High");
        assert_eq!(json["status"], "In Progress");
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("user_id").is_none());
    }
}

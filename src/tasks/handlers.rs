use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, DeletedResponse, ListTasksQuery, TaskListResponse, UpdateTaskRequest},
        repo::{Priority, Status, Task},
    },
    validation::{check_rules, Rule},
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

const PRIORITY_MESSAGE: &str = "Priority must be Low, Medium, or High";
const STATUS_MESSAGE: &str = "Status must be Pending, In Progress, or Done";
const TASK_NOT_FOUND: &str = "Task not found";

const CREATE_TASK_RULES: &[Rule<CreateTaskRequest>] = &[
    Rule {
        field: "title",
        message: "Title is required",
        check: |r| !r.title.trim().is_empty(),
    },
    Rule {
        field: "priority",
        message: PRIORITY_MESSAGE,
        check: |r| match r.priority.as_deref() {
            Some(p) => Priority::parse(p).is_some(),
            None => true,
        },
    },
    Rule {
        field: "status",
        message: STATUS_MESSAGE,
        check: |r| match r.status.as_deref() {
            Some(s) => Status::parse(s).is_some(),
            None => true,
        },
    },
];

const UPDATE_TASK_RULES: &[Rule<UpdateTaskRequest>] = &[
    Rule {
        field: "title",
        message: "Title cannot be empty",
        check: |r| match r.title.as_deref() {
            Some(t) => !t.trim().is_empty(),
            None => true,
        },
    },
    Rule {
        field: "priority",
        message: PRIORITY_MESSAGE,
        check: |r| match r.priority.as_deref() {
            Some(p) => Priority::parse(p).is_some(),
            None => true,
        },
    },
    Rule {
        field: "status",
        message: STATUS_MESSAGE,
        check: |r| match r.status.as_deref() {
            Some(s) => Status::parse(s).is_some(),
            None => true,
        },
    },
];

/// Owner always comes from the verified token; the body cannot name one.
#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    check_rules(&payload, CREATE_TASK_RULES)?;

    let priority = payload
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or(Priority::Medium);
    let status = payload
        .status
        .as_deref()
        .and_then(Status::parse)
        .unwrap_or(Status::Pending);

    let task = Task::create(
        &state.db,
        user_id,
        payload.title.trim(),
        payload.description.as_deref(),
        priority,
        status,
    )
    .await?;

    info!(task_id = %task.id, user_id = %user_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let query = params.into_query();
    let tasks = Task::list(&state.db, user_id, &query).await?;
    let total = Task::count(&state.db, user_id, &query).await?;

    Ok(Json(TaskListResponse {
        total,
        page: query.page,
        limit: query.limit,
        tasks,
    }))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = Task::find(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;
    Ok(Json(task))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    check_rules(&payload, UPDATE_TASK_RULES)?;

    let patch = payload.into_patch();
    let task = Task::update(&state.db, user_id, id, &patch)
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;

    info!(task_id = %task.id, user_id = %user_id, "task updated");
    Ok(Json(task))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !Task::delete(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound(TASK_NOT_FOUND));
    }

    info!(task_id = %id, user_id = %user_id, "task deleted");
    Ok(Json(DeletedResponse {
        message: "Task deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rules_reject_missing_title_and_bad_enums_together() {
        let payload = CreateTaskRequest {
            title: "  ".into(),
            description: None,
            priority: Some("Urgent".into()),
            status: Some("Started".into()),
        };
        let err = check_rules(&payload, CREATE_TASK_RULES).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0].message, "Title is required");
                assert_eq!(errors[1].message, PRIORITY_MESSAGE);
                assert_eq!(errors[2].message, STATUS_MESSAGE);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rules_accept_omitted_priority_and_status() {
        let payload = CreateTaskRequest {
            title: "Write report".into(),
            description: Some("quarterly".into()),
            priority: None,
            status: None,
        };
        assert!(check_rules(&payload, CREATE_TASK_RULES).is_ok());
    }

    #[test]
    fn create_rules_accept_every_enum_label() {
        for priority in ["Low", "Medium", "High"] {
            for status in ["Pending", "In Progress", "Done"] {
                let payload = CreateTaskRequest {
                    title: "t".into(),
                    description: None,
                    priority: Some(priority.into()),
                    status: Some(status.into()),
                };
                assert!(check_rules(&payload, CREATE_TASK_RULES).is_ok());
            }
        }
    }

    #[test]
    fn update_rules_allow_empty_patch_but_not_blank_title() {
        assert!(check_rules(&UpdateTaskRequest::default(), UPDATE_TASK_RULES).is_ok());

        let payload = UpdateTaskRequest {
            title: Some("   ".into()),
            ..Default::default()
        };
        let err = check_rules(&payload, UPDATE_TASK_RULES).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "Title cannot be empty");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn status_only_patch_leaves_other_fields_alone() {
        let payload: UpdateTaskRequest = serde_json::from_str(r#"{"status":"Done"}"#).unwrap();
        check_rules(&payload, UPDATE_TASK_RULES).unwrap();
        let patch = payload.into_patch();
        assert_eq!(patch.status, Some(Status::Done));
        assert!(patch.title.is_none());
        assert!(patch.description.is_none());
        assert!(patch.priority.is_none());
    }
}

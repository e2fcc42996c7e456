/// Task endpoints
///
/// # Endpoints
///
/// - `GET /tasks?projectId=` - Tasks of a project, with author, assignee and attachments
/// - `POST /tasks` - Create a task
/// - `GET /tasks/:id` - Get a task with its details
/// - `PUT /tasks/:id` - Update the fields present in the body
/// - `DELETE /tasks/:id` - Delete a task
/// - `PATCH /tasks/:id/status` - Change only the status
/// - `PUT /tasks/:id/assign` - Change only the assignee
/// - `POST /tasks/:id/attachments` - Attach a file (authenticated)
/// - `GET /tasks/user/:user_id` - Tasks authored by or assigned to a user
/// - `GET /tasks/overdue` - Past due and not completed

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext, ValidationErrorDetail},
    extract::{AppJson, AppPath, AppQuery},
    response::Envelope,
    routes::CurrentUser,
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;
use vexa_shared::models::{
    attachment::{Attachment, CreateAttachment},
    task::{CreateTask, Task, TaskDetails, TaskPriority, TaskStatus, UpdateTask},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub project_id: i32,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// Comma separated labels
    pub tags: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0, message = "Points must not be negative"))]
    pub points: Option<i32>,

    pub project_id: i32,

    pub author_user_id: Option<i32>,

    pub assigned_user_id: Option<i32>,
}

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            tags: req.tags,
            start_date: req.start_date,
            due_date: req.due_date,
            points: req.points,
            project_id: req.project_id,
            author_user_id: req.author_user_id,
            assigned_user_id: req.assigned_user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    /// Required; `null` unassigns the task
    #[serde(default, deserialize_with = "vexa_shared::models::nullable")]
    pub assigned_user_id: Option<Option<i32>>,
}

impl AssignTaskRequest {
    /// The requested assignee, rejecting a body without the key
    pub fn assignee(&self) -> ApiResult<Option<i32>> {
        self.assigned_user_id.ok_or_else(|| {
            ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "assignedUserId".to_string(),
                message: "assignedUserId is required; use null to unassign".to_string(),
            }])
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttachmentRequest {
    #[validate(url(message = "File URL must be a valid URL"))]
    pub file_url: String,

    #[validate(length(max = 255, message = "File name must be at most 255 characters"))]
    pub file_name: Option<String>,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// List the tasks of a project
///
/// ```text
/// GET /tasks?projectId=1
/// ```
///
/// Each task embeds `author`, `assignee` and `attachments`.
pub async fn list_tasks(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListTasksQuery>,
) -> ApiResult<Envelope<Vec<TaskDetails>>> {
    let tasks = Task::list_by_project(&state.db, query.project_id)
        .await
        .during("retrieving tasks")?;

    let tasks = Task::with_details(&state.db, tasks)
        .await
        .during("retrieving tasks")?;

    Ok(Envelope::ok(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<TaskDetails>> {
    let task = Task::find_by_id(&state.db, id)
        .await
        .during("retrieving task")?
        .ok_or_else(task_not_found)?;

    let task = Task::with_details(&state.db, vec![task])
        .await
        .during("retrieving task")?
        .pop()
        .ok_or_else(task_not_found)?;

    Ok(Envelope::ok(task))
}

/// Create task
///
/// ```text
/// POST /tasks
/// { "title": "Task A", "projectId": 1 }
/// ```
///
/// A missing project (or author/assignee) is rejected with 400.
pub async fn create_task(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    req.validate()?;

    let task = Task::create(&state.db, req.into())
        .await
        .during("creating a task")?;

    tracing::info!(task_id = task.id, project_id = task.project_id, "Task created");

    Ok(Envelope::created(task, "Task created successfully"))
}

/// Update the fields present in the body
///
/// `null` clears a nullable field; absent fields are left alone.
pub async fn update_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(update): AppJson<UpdateTask>,
) -> ApiResult<Envelope<Task>> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "title".to_string(),
            message: "Title must not be empty".to_string(),
        }]));
    }

    let task = Task::update(&state.db, id, update)
        .await
        .during("updating task")?
        .ok_or_else(task_not_found)?;

    Ok(Envelope::updated(task, "Task updated successfully"))
}

pub async fn update_task_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> ApiResult<Envelope<Task>> {
    let task = Task::update_status(&state.db, id, req.status)
        .await
        .during("updating task")?
        .ok_or_else(task_not_found)?;

    tracing::debug!(task_id = id, status = req.status.as_str(), "Task status changed");

    Ok(Envelope::updated(task, "Task updated successfully"))
}

pub async fn assign_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<AssignTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    let assignee = req.assignee()?;

    let task = Task::assign(&state.db, id, assignee)
        .await
        .during("assigning task")?
        .ok_or_else(task_not_found)?;

    Ok(Envelope::updated(task, "Task assigned successfully"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<()>> {
    if !Task::delete(&state.db, id).await.during("deleting task")? {
        return Err(task_not_found());
    }

    Ok(Envelope::message("Task deleted successfully"))
}

pub async fn list_user_tasks(
    State(state): State<AppState>,
    AppPath(user_id): AppPath<i32>,
) -> ApiResult<Envelope<Vec<TaskDetails>>> {
    let tasks = Task::list_by_user(&state.db, user_id)
        .await
        .during("retrieving user's tasks")?;

    let tasks = Task::with_details(&state.db, tasks)
        .await
        .during("retrieving user's tasks")?;

    Ok(Envelope::ok(tasks))
}

pub async fn list_overdue_tasks(State(state): State<AppState>) -> ApiResult<Envelope<Vec<Task>>> {
    let tasks = Task::list_overdue(&state.db, Utc::now())
        .await
        .during("retrieving overdue tasks")?;

    Ok(Envelope::ok(tasks))
}

/// Attach a file to a task
///
/// The caller is recorded as the uploader.
pub async fn add_attachment(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<CreateAttachmentRequest>,
) -> ApiResult<Envelope<Attachment>> {
    req.validate()?;

    if Task::find_by_id(&state.db, id)
        .await
        .during("adding attachment")?
        .is_none()
    {
        return Err(task_not_found());
    }

    let attachment = Attachment::create(
        &state.db,
        CreateAttachment {
            file_url: req.file_url,
            file_name: req.file_name,
            task_id: id,
            uploaded_by_id: Some(subject.user_id),
        },
    )
    .await
    .during("adding attachment")?;

    Ok(Envelope::created(attachment, "Attachment added successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "Task A", "projectId": 1 }))
                .unwrap();

        assert!(req.validate().is_ok());

        let create: CreateTask = req.into();
        assert_eq!(create.title, "Task A");
        assert_eq!(create.project_id, 1);
        assert!(create.status.is_none());
    }

    #[test]
    fn test_create_request_rejects_negative_points() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "Task A",
            "projectId": 1,
            "points": -3
        }))
        .unwrap();

        assert!(req.validate().unwrap_err().field_errors().contains_key("points"));
    }

    #[test]
    fn test_status_request_uses_display_names() {
        let req: UpdateStatusRequest =
            serde_json::from_value(serde_json::json!({ "status": "Under Review" })).unwrap();
        assert_eq!(req.status, TaskStatus::UnderReview);

        assert!(serde_json::from_value::<UpdateStatusRequest>(
            serde_json::json!({ "status": "Done" })
        )
        .is_err());
    }

    #[test]
    fn test_assign_request_accepts_null() {
        let req: AssignTaskRequest =
            serde_json::from_value(serde_json::json!({ "assignedUserId": null })).unwrap();
        assert_eq!(req.assignee().unwrap(), None);

        let req: AssignTaskRequest =
            serde_json::from_value(serde_json::json!({ "assignedUserId": 5 })).unwrap();
        assert_eq!(req.assignee().unwrap(), Some(5));
    }

    #[test]
    fn test_assign_request_requires_key() {
        let req: AssignTaskRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        let err = req.assignee().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_attachment_url_validated() {
        let req: CreateAttachmentRequest =
            serde_json::from_value(serde_json::json!({ "fileUrl": "not a url" })).unwrap();
        assert!(req.validate().is_err());
    }
}

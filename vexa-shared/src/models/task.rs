/// Task model and database operations
///
/// Tasks belong to exactly one project and optionally reference an author and
/// an assignee. Status and priority are closed enumerations stored as Postgres
/// enum types whose labels match the JSON representation.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('To Do', 'Work In Progress', 'Under Review', 'Completed');
/// CREATE TYPE task_priority AS ENUM ('Urgent', 'High', 'Medium', 'Low', 'Backlog');
///
/// CREATE TABLE tasks (
///     id SERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT,
///     status task_status,
///     priority task_priority,
///     tags TEXT,
///     start_date TIMESTAMPTZ,
///     due_date TIMESTAMPTZ,
///     points INTEGER,
///     project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     author_user_id INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
///     assigned_user_id INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use vexa_shared::models::task::{Task, CreateTask, TaskStatus};
/// use vexa_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     title: "Write release notes".to_string(),
///     project_id: 1,
///     ..Default::default()
/// }).await?;
///
/// Task::update_status(&pool, task.id, TaskStatus::WorkInProgress).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::attachment::Attachment;
use super::nullable;
use super::user::{like_pattern, User};

const TASK_COLUMNS: &str = "id, title, description, status, priority, tags, start_date, due_date, \
     points, project_id, author_user_id, assigned_user_id, created_at, updated_at";

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[sqlx(rename = "To Do")]
    #[serde(rename = "To Do")]
    ToDo,

    #[sqlx(rename = "Work In Progress")]
    #[serde(rename = "Work In Progress")]
    WorkInProgress,

    #[sqlx(rename = "Under Review")]
    #[serde(rename = "Under Review")]
    UnderReview,

    #[sqlx(rename = "Completed")]
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::WorkInProgress => "Work In Progress",
            TaskStatus::UnderReview => "Under Review",
            TaskStatus::Completed => "Completed",
        }
    }
}

/// Urgency of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
    Backlog,
}

/// A task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Free-form comma separated tags
    pub tags: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,

    /// Story points
    pub points: Option<i32>,

    /// Owning project
    pub project_id: i32,

    pub author_user_id: Option<i32>,
    pub assigned_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task with its author, assignee and attachments embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,
    pub author: Option<User>,
    pub assignee: Option<User>,
    pub attachments: Vec<Attachment>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub points: Option<i32>,
    pub project_id: i32,
    pub author_user_id: Option<i32>,
    pub assigned_user_id: Option<i32>,
}

/// Input for updating a task
///
/// Only present fields are written. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub status: Option<Option<TaskStatus>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Option<TaskPriority>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub points: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<Option<i32>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.points.is_none()
            && self.assigned_user_id.is_none()
    }
}

impl Task {
    /// Creates a new task
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `data` - Task creation data
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `project_id`, `author_user_id` or `assigned_user_id` reference missing rows
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (
                title, description, status, priority, tags, start_date, due_date,
                points, project_id, author_user_id, assigned_user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.tags)
            .bind(data.start_date)
            .bind(data.due_date)
            .bind(data.points)
            .bind(data.project_id)
            .bind(data.author_user_id)
            .bind(data.assigned_user_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the tasks of a project ordered by ID
    pub async fn list_by_project(pool: &PgPool, project_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY id");

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Lists tasks authored by or assigned to a user
    pub async fn list_by_user(pool: &PgPool, user_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE author_user_id = $1 OR assigned_user_id = $1
            ORDER BY id
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Lists tasks whose due date is before `now` and that are not completed
    ///
    /// Tasks without a status count as not completed.
    pub async fn list_overdue(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE due_date < $1
              AND status IS DISTINCT FROM $2
            ORDER BY due_date, id
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(now)
            .bind(TaskStatus::Completed)
            .fetch_all(pool)
            .await
    }

    /// Case-insensitive substring search over title and description
    pub async fn search(pool: &PgPool, term: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE title ILIKE $1 OR description ILIKE $1
            ORDER BY id
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(like_pattern(term))
            .fetch_all(pool)
            .await
    }

    /// Updates the fields present in `data`
    ///
    /// # Returns
    ///
    /// The updated task, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {column} = ${bind_count}"));
            }
        };
        push("title", data.title.is_some());
        push("description", data.description.is_some());
        push("status", data.status.is_some());
        push("priority", data.priority.is_some());
        push("tags", data.tags.is_some());
        push("start_date", data.start_date.is_some());
        push("due_date", data.due_date.is_some());
        push("points", data.points.is_some());
        push("assigned_user_id", data.assigned_user_id.is_some());

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(points) = data.points {
            q = q.bind(points);
        }
        if let Some(assigned_user_id) = data.assigned_user_id {
            q = q.bind(assigned_user_id);
        }

        q.fetch_optional(pool).await
    }

    /// Changes only the status of a task
    pub async fn update_status(
        pool: &PgPool,
        id: i32,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Changes only the assignee of a task (`None` unassigns)
    pub async fn assign(
        pool: &PgPool,
        id: i32,
        assigned_user_id: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET assigned_user_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(assigned_user_id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task and its attachments
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Embeds authors, assignees and attachments into a list of tasks
    ///
    /// Runs two batched queries regardless of the number of tasks.
    pub async fn with_details(
        pool: &PgPool,
        tasks: Vec<Task>,
    ) -> Result<Vec<TaskDetails>, sqlx::Error> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids: Vec<i32> = tasks
            .iter()
            .flat_map(|t| [t.author_user_id, t.assigned_user_id])
            .flatten()
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let task_ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();

        let users: HashMap<i32, User> = User::find_many(pool, &user_ids)
            .await?
            .into_iter()
            .map(|u| (u.user_id, u))
            .collect();

        let mut attachments: HashMap<i32, Vec<Attachment>> = HashMap::new();
        for attachment in Attachment::list_by_tasks(pool, &task_ids).await? {
            attachments.entry(attachment.task_id).or_default().push(attachment);
        }

        Ok(tasks
            .into_iter()
            .map(|task| TaskDetails {
                author: task.author_user_id.and_then(|id| users.get(&id).cloned()),
                assignee: task.assigned_user_id.and_then(|id| users.get(&id).cloned()),
                attachments: attachments.remove(&task.id).unwrap_or_default(),
                task,
            })
            .collect())
    }
}

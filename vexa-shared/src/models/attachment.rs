/// Attachments: files linked to a task
///
/// Only the location of the file is stored; uploading the content itself is
/// the client's concern. Attachments are deleted with their task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const ATTACHMENT_COLUMNS: &str = "id, file_url, file_name, task_id, uploaded_by_id, created_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i32,
    pub file_url: String,
    pub file_name: Option<String>,
    pub task_id: i32,
    pub uploaded_by_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttachment {
    pub file_url: String,
    pub file_name: Option<String>,
    pub task_id: i32,
    pub uploaded_by_id: Option<i32>,
}

impl Attachment {
    /// Records a new attachment on a task
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO attachments (file_url, file_name, task_id, uploaded_by_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(data.file_url)
            .bind(data.file_name)
            .bind(data.task_id)
            .bind(data.uploaded_by_id)
            .fetch_one(pool)
            .await
    }

    /// Lists the attachments of several tasks at once
    pub async fn list_by_tasks(pool: &PgPool, task_ids: &[i32]) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE task_id = ANY($1) ORDER BY id"
        );

        sqlx::query_as::<_, Attachment>(&query)
            .bind(task_ids)
            .fetch_all(pool)
            .await
    }
}

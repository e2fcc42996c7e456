/// Project model and database operations
///
/// Projects own tasks and are governed by zero or more teams through the
/// `project_teams` link table. Deleting a project removes its tasks and links.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id SERIAL PRIMARY KEY,
///     name TEXT NOT NULL,
///     description TEXT,
///     start_date TIMESTAMPTZ,
///     end_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_teams (
///     id SERIAL PRIMARY KEY,
///     project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (project_id, team_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::user::like_pattern;

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date, created_at, updated_at";

/// A project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Replacement values for a project's mutable fields
///
/// `PUT` semantics: every field is written, absent optionals become NULL.
pub type UpdateProject = CreateProject;

/// Link between a project and a governing team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTeam {
    pub id: i32,
    pub project_id: i32,
    pub team_id: i32,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new project
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use vexa_shared::models::project::{Project, CreateProject};
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// let project = Project::create(&pool, CreateProject {
    ///     name: "Website relaunch".to_string(),
    ///     description: None,
    ///     start_date: None,
    ///     end_date: None,
    /// }).await?;
    /// println!("Created project {}", project.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO projects (name, description, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(data.name)
            .bind(data.description)
            .bind(data.start_date)
            .bind(data.end_date)
            .fetch_one(pool)
            .await
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all projects ordered by ID
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id");

        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Replaces a project's mutable fields
    ///
    /// # Returns
    ///
    /// The updated project, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE projects
            SET name = $2, description = $3, start_date = $4, end_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.start_date)
            .bind(data.end_date)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a project with its tasks and team links
    ///
    /// # Returns
    ///
    /// `true` if the project was deleted, `false` if it did not exist
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the projects linked to a team
    pub async fn list_by_team(pool: &PgPool, team_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {cols}
            FROM projects p
            JOIN project_teams pt ON pt.project_id = p.id
            WHERE pt.team_id = $1
            ORDER BY p.id
            "#,
            cols = qualified_columns("p")
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }

    /// Case-insensitive substring search over name and description
    pub async fn search(pool: &PgPool, term: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE name ILIKE $1 OR description ILIKE $1
            ORDER BY id
            "#
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(like_pattern(term))
            .fetch_all(pool)
            .await
    }

    /// Links a team to a project
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The link already exists (unique violation)
    /// - The project or team does not exist (foreign key violation)
    pub async fn assign_team(
        pool: &PgPool,
        project_id: i32,
        team_id: i32,
    ) -> Result<ProjectTeam, sqlx::Error> {
        sqlx::query_as::<_, ProjectTeam>(
            r#"
            INSERT INTO project_teams (project_id, team_id)
            VALUES ($1, $2)
            RETURNING id, project_id, team_id, created_at
            "#,
        )
        .bind(project_id)
        .bind(team_id)
        .fetch_one(pool)
        .await
    }

    /// Counts the teams governing a project
    pub async fn team_count(pool: &PgPool, project_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM project_teams WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await
    }
}

fn qualified_columns(alias: &str) -> String {
    PROJECT_COLUMNS
        .split(", ")
        .map(|col| format!("{alias}.{col}"))
        .collect::<Vec<_>>()
        .join(", ")
}

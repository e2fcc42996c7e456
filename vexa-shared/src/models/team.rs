/// Team model and database operations
///
/// Teams group users (see [`team_member`](super::team_member)) and govern
/// projects through `project_teams`. A team may name a product owner and a
/// project manager; listing teams resolves both to usernames.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id SERIAL PRIMARY KEY,
///     team_name TEXT NOT NULL,
///     product_owner_user_id INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
///     project_manager_user_id INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::nullable;
use super::project::Project;
use super::team_member::{TeamMember, TeamMemberProfile, TeamRole};

const TEAM_COLUMNS: &str =
    "id, team_name, product_owner_user_id, project_manager_user_id, created_at, updated_at";

/// A team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i32,
    pub team_name: String,
    pub product_owner_user_id: Option<i32>,
    pub project_manager_user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A team with its product owner and project manager resolved to usernames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub team: Team,
    pub product_owner_username: Option<String>,
    pub project_manager_username: Option<String>,
}

/// A team with its members and linked projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMemberProfile>,
    pub projects: Vec<Project>,
}

/// Input for creating a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub team_name: String,
    pub product_owner_user_id: Option<i32>,
    pub project_manager_user_id: Option<i32>,
}

/// Input for updating a team
///
/// Only present fields are written. Use `Some(None)` to clear a role holder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub product_owner_user_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub project_manager_user_id: Option<Option<i32>>,
}

impl Team {
    /// Creates a team and makes `owner_user_id` its `Owner`
    ///
    /// The team row, the owner membership and the owner's primary team are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced user does not exist (foreign key
    /// violation) or the database connection fails.
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateTeam,
        owner_user_id: i32,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO teams (team_name, product_owner_user_id, project_manager_user_id)
            VALUES ($1, $2, $3)
            RETURNING {TEAM_COLUMNS}
            "#
        );

        let team = sqlx::query_as::<_, Team>(&query)
            .bind(data.team_name)
            .bind(data.product_owner_user_id)
            .bind(data.project_manager_user_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO team_members (team_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(team.id)
            .bind(owner_user_id)
            .bind(TeamRole::Owner)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE users SET team_id = $1, updated_at = NOW() WHERE user_id = $2 AND team_id IS NULL",
        )
        .bind(team.id)
        .bind(owner_user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(team)
    }

    /// Finds a team by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");

        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads a team with its members and projects
    pub async fn find_details(pool: &PgPool, id: i32) -> Result<Option<TeamDetails>, sqlx::Error> {
        let Some(team) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let members = TeamMember::list_by_team(pool, id).await?;
        let projects = Project::list_by_team(pool, id).await?;

        Ok(Some(TeamDetails {
            team,
            members,
            projects,
        }))
    }

    /// Lists all teams with role holders resolved to usernames
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<TeamSummary>, sqlx::Error> {
        sqlx::query_as::<_, TeamSummary>(
            r#"
            SELECT t.id, t.team_name, t.product_owner_user_id, t.project_manager_user_id,
                   t.created_at, t.updated_at,
                   po.username AS product_owner_username,
                   pm.username AS project_manager_username
            FROM teams t
            LEFT JOIN users po ON po.user_id = t.product_owner_user_id
            LEFT JOIN users pm ON pm.user_id = t.project_manager_user_id
            ORDER BY t.id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Updates the fields present in `data`
    ///
    /// # Returns
    ///
    /// The updated team, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateTeam,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE teams SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.team_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", team_name = ${bind_count}"));
        }
        if data.product_owner_user_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", product_owner_user_id = ${bind_count}"));
        }
        if data.project_manager_user_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", project_manager_user_id = ${bind_count}"));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TEAM_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Team>(&query).bind(id);

        if let Some(team_name) = data.team_name {
            q = q.bind(team_name);
        }
        if let Some(owner) = data.product_owner_user_id {
            q = q.bind(owner);
        }
        if let Some(manager) = data.project_manager_user_id {
            q = q.bind(manager);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a team
    ///
    /// Memberships and project links are removed by cascade; users whose
    /// primary team it was are left without one.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Team membership model and database operations
///
/// Memberships connect users to teams with a role. Roles are ordered
/// Owner > Admin > Editor > Member > Viewer and drive every authorization
/// decision on teams and on the projects those teams govern.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE team_role AS ENUM ('owner', 'admin', 'editor', 'member', 'viewer');
///
/// CREATE TABLE team_members (
///     team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
///     role team_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use vexa_shared::models::team_member::{TeamMember, TeamRole};
/// use vexa_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// TeamMember::add(&pool, 1, 42, TeamRole::Editor).await?;
///
/// let role = TeamMember::get_role(&pool, 1, 42).await?;
/// assert_eq!(role, Some(TeamRole::Editor));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Roles a user can hold within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
pub enum TeamRole {
    /// Full control, including deleting the team
    Owner,

    /// Everything except deleting the team
    Admin,

    /// Can edit the team, its members and its projects
    Editor,

    /// Regular member
    Member,

    /// Read-only access
    Viewer,
}

impl TeamRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "Owner",
            TeamRole::Admin => "Admin",
            TeamRole::Editor => "Editor",
            TeamRole::Member => "Member",
            TeamRole::Viewer => "Viewer",
        }
    }

    /// Checks if this role is at least as strong as `required`
    ///
    /// Hierarchy: Owner > Admin > Editor > Member > Viewer
    pub fn has_permission(&self, required: &TeamRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Returns numeric permission level for comparison
    pub fn permission_level(&self) -> u8 {
        match self {
            TeamRole::Owner => 5,
            TeamRole::Admin => 4,
            TeamRole::Editor => 3,
            TeamRole::Member => 2,
            TeamRole::Viewer => 1,
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership of a user in a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub team_id: i32,
    pub user_id: i32,
    pub role: TeamRole,
    pub created_at: DateTime<Utc>,
}

/// A team member joined with the user's profile, as listed on a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberProfile {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub role: TeamRole,
}

impl TeamMember {
    /// Adds a user to a team with the given role
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user is already a member (unique constraint violation)
    /// - Team or user doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn add(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
        role: TeamRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (team_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING team_id, user_id, role, created_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Adds several users to a team and makes it their primary team
    ///
    /// Users that are already members keep their existing role. Both writes
    /// happen in one transaction.
    ///
    /// # Returns
    ///
    /// Number of memberships created
    pub async fn add_many(
        pool: &PgPool,
        team_id: i32,
        user_ids: &[i32],
        role: TeamRole,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role)
            SELECT $1, u, $3 FROM UNNEST($2::INTEGER[]) AS u
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(user_ids)
        .bind(role)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            UPDATE users
            SET team_id = $1, updated_at = NOW()
            WHERE user_id = ANY($2)
            "#,
        )
        .bind(team_id)
        .bind(user_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(inserted)
    }

    /// Finds a specific membership
    pub async fn find(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT team_id, user_id, role, created_at
            FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Gets a user's role within a team
    ///
    /// # Returns
    ///
    /// The role if the user is a member, `None` otherwise
    pub async fn get_role(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
    ) -> Result<Option<TeamRole>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT role FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Counts the members of a team holding `role`
    pub async fn count_with_role(
        pool: &PgPool,
        team_id: i32,
        role: TeamRole,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM team_members WHERE team_id = $1 AND role = $2")
            .bind(team_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Gets the user's strongest role across all teams governing a project
    pub async fn highest_project_role(
        pool: &PgPool,
        project_id: i32,
        user_id: i32,
    ) -> Result<Option<TeamRole>, sqlx::Error> {
        let roles: Vec<TeamRole> = sqlx::query_scalar(
            r#"
            SELECT tm.role
            FROM team_members tm
            JOIN project_teams pt ON pt.team_id = tm.team_id
            WHERE pt.project_id = $1 AND tm.user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(roles.into_iter().max_by_key(TeamRole::permission_level))
    }

    /// Changes a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, or `None` if the user is not a member
    pub async fn update_role(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
        role: TeamRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE team_members
            SET role = $3
            WHERE team_id = $1 AND user_id = $2
            RETURNING team_id, user_id, role, created_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Removes a user from a team
    ///
    /// Also clears the user's primary team if it pointed at this team.
    ///
    /// # Returns
    ///
    /// `true` if a membership was removed
    pub async fn remove(pool: &PgPool, team_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        sqlx::query(
            r#"
            UPDATE users
            SET team_id = NULL, updated_at = NOW()
            WHERE user_id = $2 AND team_id = $1
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(removed)
    }

    /// Lists the members of a team with their profiles, strongest role first
    pub async fn list_by_team(
        pool: &PgPool,
        team_id: i32,
    ) -> Result<Vec<TeamMemberProfile>, sqlx::Error> {
        sqlx::query_as::<_, TeamMemberProfile>(
            r#"
            SELECT u.user_id, u.username, u.email, u.profile_picture_url, tm.role
            FROM team_members tm
            JOIN users u ON u.user_id = tm.user_id
            WHERE tm.team_id = $1
            ORDER BY tm.role, u.user_id
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(TeamRole::Owner.has_permission(&TeamRole::Admin));
        assert!(TeamRole::Admin.has_permission(&TeamRole::Editor));
        assert!(TeamRole::Editor.has_permission(&TeamRole::Editor));
        assert!(!TeamRole::Member.has_permission(&TeamRole::Editor));
        assert!(!TeamRole::Viewer.has_permission(&TeamRole::Member));
        assert!(!TeamRole::Admin.has_permission(&TeamRole::Owner));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_value(TeamRole::Editor).unwrap(), "Editor");
        let role: TeamRole = serde_json::from_str("\"Viewer\"").unwrap();
        assert_eq!(role, TeamRole::Viewer);
        assert_eq!(TeamRole::Owner.to_string(), "Owner");
    }

    #[test]
    fn test_strongest_role_selection() {
        let roles = vec![TeamRole::Viewer, TeamRole::Admin, TeamRole::Member];
        assert_eq!(
            roles.into_iter().max_by_key(TeamRole::permission_level),
            Some(TeamRole::Admin)
        );
    }
}

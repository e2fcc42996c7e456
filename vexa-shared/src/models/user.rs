/// User model and database operations
///
/// Users are mirrored from the external identity provider: `external_id` is the
/// provider's subject and is what bearer tokens carry. The local integer
/// `user_id` is what every other table references.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     user_id SERIAL PRIMARY KEY,
///     external_id TEXT NOT NULL UNIQUE,
///     username TEXT NOT NULL,
///     email TEXT NOT NULL UNIQUE,
///     profile_picture_url TEXT,
///     team_id INTEGER REFERENCES teams(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use vexa_shared::models::user::{User, CreateUser};
/// use vexa_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     external_id: "user_2abc".to_string(),
///     username: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     profile_picture_url: None,
///     team_id: None,
/// }).await?;
///
/// let found = User::find_by_external_id(&pool, "user_2abc").await?;
/// assert_eq!(found.map(|u| u.user_id), Some(user.user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Column list shared by every query returning a full user row
pub(crate) const USER_COLUMNS: &str =
    "user_id, external_id, username, email, profile_picture_url, team_id, created_at, updated_at";

/// A user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Local user ID
    pub user_id: i32,

    /// Subject identifier issued by the identity provider
    pub external_id: String,

    /// Display name
    pub username: String,

    /// Email address, unique across users
    pub email: String,

    /// Avatar location
    pub profile_picture_url: Option<String>,

    /// Primary team, if the user has joined one
    pub team_id: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub external_id: String,
    pub username: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub team_id: Option<i32>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The external ID or email is already taken (unique violation)
    /// - `team_id` does not reference a team (foreign key violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (external_id, username, email, profile_picture_url, team_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.external_id)
            .bind(data.username)
            .bind(data.email)
            .bind(data.profile_picture_url)
            .bind(data.team_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by local ID
    ///
    /// Returns `None` if no user exists with the given ID.
    pub async fn find_by_id(pool: &PgPool, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by the identity provider's subject
    ///
    /// This is how an authenticated request is resolved to a local user.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all users ordered by ID
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id");

        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Loads several users at once
    pub async fn find_many(pool: &PgPool, user_ids: &[i32]) -> Result<Vec<Self>, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ANY($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }

    /// Case-insensitive substring search over username and email
    pub async fn search(pool: &PgPool, term: &str) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE username ILIKE $1 OR email ILIKE $1
            ORDER BY user_id
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(like_pattern(term))
            .fetch_all(pool)
            .await
    }
}

/// Builds an `ILIKE` pattern matching `term` anywhere, with wildcards in the
/// term itself escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

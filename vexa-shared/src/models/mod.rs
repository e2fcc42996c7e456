/// Database models for VEXA
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Users mirrored from the identity provider
/// - `project`: Projects and their team links
/// - `task`: Tasks with status, priority and assignee
/// - `attachment`: Files attached to tasks
/// - `team`: Teams with product owner and project manager
/// - `team_member`: User-team relationships with roles
///
/// All models serialize as camelCase JSON.
///
/// # Example
///
/// ```no_run
/// use vexa_shared::models::project::{Project, CreateProject};
/// use vexa_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     name: "Apollo".to_string(),
///     description: Some("Moonshot".to_string()),
///     start_date: None,
///     end_date: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer};

pub mod attachment;
pub mod project;
pub mod task;
pub mod team;
pub mod team_member;
pub mod user;

/// Deserializes a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        note: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_missing_and_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.note, None);

        let null: Patch = serde_json::from_str(r#"{"note":null}"#).unwrap();
        assert_eq!(null.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note":"hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }
}

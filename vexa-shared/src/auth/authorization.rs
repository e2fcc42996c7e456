/// Authorization policy for teams and projects
///
/// Decisions are made by one pure function, [`authorize`], over a
/// [`Subject`], a [`Resource`] and an [`Action`]. The resource carries the
/// subject's role on it, so the policy itself never touches the database;
/// [`load_resource`] resolves that role beforehand.
///
/// # Rules
///
/// | resource | action | minimum role |
/// |----------|--------|--------------|
/// | team | View | any member |
/// | team | Update, ManageMembers, Invite, AssignTeam | Editor |
/// | team | Delete | Owner |
/// | project without governing teams | any | authenticated |
/// | project | View | any member of a governing team |
/// | project | Update, ManageMembers, Invite, AssignTeam | Editor |
/// | project | Delete | Admin |
///
/// For projects the subject's strongest role across all governing teams
/// counts. Unauthenticated subjects are always rejected.
///
/// # Example
///
/// ```no_run
/// use vexa_shared::auth::authorization::{require, Action, ResourceRef, Subject};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let subject = Subject { user_id: 42 };
/// require(&pool, Some(&subject), ResourceRef::Team(7), Action::Update).await?;
/// // ... perform the update
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use super::middleware::AuthContext;
use crate::models::project::Project;
use crate::models::team_member::{TeamMember, TeamRole};
use crate::models::user::User;

/// Authorization errors
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Not a member of {0}")]
    NotMember(String),

    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: TeamRole, actual: TeamRole },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// The local user on whose behalf a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub user_id: i32,
}

impl Subject {
    /// Resolves an authenticated identity to a local user
    ///
    /// Returns `None` if no user has been registered for the identity yet.
    pub async fn resolve(pool: &PgPool, auth: &AuthContext) -> Result<Option<Self>, sqlx::Error> {
        Ok(User::find_by_external_id(pool, &auth.external_id)
            .await?
            .map(|user| Subject {
                user_id: user.user_id,
            }))
    }
}

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
    ManageMembers,
    Invite,
    AssignTeam,
}

/// Identifies the resource an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Team(i32),
    Project(i32),
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Team(id) => write!(f, "team {id}"),
            ResourceRef::Project(id) => write!(f, "project {id}"),
        }
    }
}

/// A resource as seen by one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Team {
        team_id: i32,
        role: Option<TeamRole>,
    },
    Project {
        project_id: i32,
        governing_teams: i64,
        role: Option<TeamRole>,
    },
}

impl Resource {
    fn role(&self) -> Option<TeamRole> {
        match self {
            Resource::Team { role, .. } | Resource::Project { role, .. } => *role,
        }
    }

    fn reference(&self) -> ResourceRef {
        match self {
            Resource::Team { team_id, .. } => ResourceRef::Team(*team_id),
            Resource::Project { project_id, .. } => ResourceRef::Project(*project_id),
        }
    }
}

/// Minimum role needed for `action` on `resource`, `None` if any
/// authenticated subject may proceed
pub fn required_role(resource: &Resource, action: Action) -> Option<TeamRole> {
    match resource {
        Resource::Team { .. } => Some(match action {
            Action::View => TeamRole::Viewer,
            Action::Update | Action::ManageMembers | Action::Invite | Action::AssignTeam => {
                TeamRole::Editor
            }
            Action::Delete => TeamRole::Owner,
        }),
        Resource::Project {
            governing_teams: 0, ..
        } => None,
        Resource::Project { .. } => Some(match action {
            Action::View => TeamRole::Viewer,
            Action::Update | Action::ManageMembers | Action::Invite | Action::AssignTeam => {
                TeamRole::Editor
            }
            Action::Delete => TeamRole::Admin,
        }),
    }
}

/// Decides whether `subject` may perform `action` on `resource`
///
/// # Errors
///
/// - `AuthzError::Unauthenticated` if there is no subject
/// - `AuthzError::NotMember` if a role is required and the subject has none
/// - `AuthzError::InsufficientRole` if the subject's role is too weak
pub fn authorize(
    subject: Option<&Subject>,
    resource: &Resource,
    action: Action,
) -> Result<(), AuthzError> {
    if subject.is_none() {
        return Err(AuthzError::Unauthenticated);
    }

    let Some(required) = required_role(resource, action) else {
        return Ok(());
    };

    let actual = resource
        .role()
        .ok_or_else(|| AuthzError::NotMember(resource.reference().to_string()))?;

    if !actual.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }

    Ok(())
}

/// Loads the subject's view of a resource
///
/// # Errors
///
/// Returns `AuthzError::NotFound` for a team that does not exist. Missing
/// projects load as ungoverned so that the handler reports the 404.
pub async fn load_resource(
    pool: &PgPool,
    target: ResourceRef,
    subject: &Subject,
) -> Result<Resource, AuthzError> {
    match target {
        ResourceRef::Team(team_id) => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1)")
                    .bind(team_id)
                    .fetch_one(pool)
                    .await?;

            if !exists {
                return Err(AuthzError::NotFound(target.to_string()));
            }

            let role = TeamMember::get_role(pool, team_id, subject.user_id).await?;
            Ok(Resource::Team { team_id, role })
        }
        ResourceRef::Project(project_id) => {
            let governing_teams = Project::team_count(pool, project_id).await?;
            let role = if governing_teams > 0 {
                TeamMember::highest_project_role(pool, project_id, subject.user_id).await?
            } else {
                None
            };

            Ok(Resource::Project {
                project_id,
                governing_teams,
                role,
            })
        }
    }
}

/// Loads the resource and applies [`authorize`]
///
/// Unauthenticated callers are rejected before any query runs.
pub async fn require(
    pool: &PgPool,
    subject: Option<&Subject>,
    target: ResourceRef,
    action: Action,
) -> Result<(), AuthzError> {
    let subject = subject.ok_or(AuthzError::Unauthenticated)?;
    let resource = load_resource(pool, target, subject).await?;

    authorize(Some(subject), &resource, action).map_err(|e| {
        tracing::debug!(
            user_id = subject.user_id,
            resource = %target,
            action = ?action,
            error = %e,
            "Authorization denied"
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: Subject = Subject { user_id: 1 };

    fn team(role: Option<TeamRole>) -> Resource {
        Resource::Team { team_id: 10, role }
    }

    fn project(governing_teams: i64, role: Option<TeamRole>) -> Resource {
        Resource::Project {
            project_id: 20,
            governing_teams,
            role,
        }
    }

    #[test]
    fn test_unauthenticated_always_rejected() {
        for resource in [team(Some(TeamRole::Owner)), project(0, None)] {
            assert!(matches!(
                authorize(None, &resource, Action::View),
                Err(AuthzError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn test_team_update_needs_editor() {
        assert!(authorize(Some(&SUBJECT), &team(Some(TeamRole::Editor)), Action::Update).is_ok());
        assert!(authorize(Some(&SUBJECT), &team(Some(TeamRole::Admin)), Action::Update).is_ok());

        let err = authorize(Some(&SUBJECT), &team(Some(TeamRole::Member)), Action::Update)
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::InsufficientRole {
                required: TeamRole::Editor,
                actual: TeamRole::Member
            }
        ));
    }

    #[test]
    fn test_team_delete_is_owner_only() {
        assert!(authorize(Some(&SUBJECT), &team(Some(TeamRole::Owner)), Action::Delete).is_ok());
        assert!(authorize(Some(&SUBJECT), &team(Some(TeamRole::Admin)), Action::Delete).is_err());
    }

    #[test]
    fn test_team_view_any_member() {
        assert!(authorize(Some(&SUBJECT), &team(Some(TeamRole::Viewer)), Action::View).is_ok());
        assert!(matches!(
            authorize(Some(&SUBJECT), &team(None), Action::View),
            Err(AuthzError::NotMember(_))
        ));
    }

    #[test]
    fn test_ungoverned_project_open_to_authenticated() {
        for action in [Action::View, Action::Update, Action::Delete, Action::AssignTeam] {
            assert!(authorize(Some(&SUBJECT), &project(0, None), action).is_ok());
        }
    }

    #[test]
    fn test_governed_project_uses_team_role() {
        assert!(matches!(
            authorize(Some(&SUBJECT), &project(2, None), Action::Update),
            Err(AuthzError::NotMember(_))
        ));
        assert!(authorize(Some(&SUBJECT), &project(2, Some(TeamRole::Editor)), Action::Update).is_ok());
        assert!(authorize(Some(&SUBJECT), &project(2, Some(TeamRole::Editor)), Action::Delete).is_err());
        assert!(authorize(Some(&SUBJECT), &project(2, Some(TeamRole::Admin)), Action::Delete).is_ok());
        assert!(authorize(Some(&SUBJECT), &project(1, Some(TeamRole::Viewer)), Action::View).is_ok());
    }

    #[test]
    fn test_required_role_table() {
        assert_eq!(required_role(&team(None), Action::Invite), Some(TeamRole::Editor));
        assert_eq!(required_role(&team(None), Action::Delete), Some(TeamRole::Owner));
        assert_eq!(required_role(&project(0, None), Action::Delete), None);
        assert_eq!(required_role(&project(3, None), Action::Delete), Some(TeamRole::Admin));
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::NotMember(ResourceRef::Team(4).to_string());
        assert_eq!(err.to_string(), "Not a member of team 4");

        let err = AuthzError::InsufficientRole {
            required: TeamRole::Owner,
            actual: TeamRole::Editor,
        };
        assert!(err.to_string().contains("requires Owner"));
    }
}

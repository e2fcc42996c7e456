/// Team endpoints
///
/// # Endpoints
///
/// - `GET /teams` - List teams with role holders' usernames
/// - `POST /teams` - Create a team; the caller becomes its Owner
/// - `GET /teams/:id` - Team with members and projects
/// - `PUT /teams/:id` - Update a team (Editor+)
/// - `DELETE /teams/:id` - Delete a team (Owner)
/// - `POST /teams/:id/users` - Add users as Members (Editor+)
/// - `GET /teams/:id/members` - List members (any member)
/// - `PATCH /teams/:id/members/:user_id` - Change a member's role (Editor+)
/// - `DELETE /teams/:id/members/:user_id` - Remove a member (Editor+)
///
/// Role changes are bounded by the caller's own role: nobody can grant a
/// role above their own or act on a member who outranks them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext, ValidationErrorDetail},
    extract::{AppJson, AppPath},
    response::Envelope,
    routes::CurrentUser,
};
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;
use vexa_shared::{
    auth::authorization::{require, Action, ResourceRef, Subject},
    models::{
        team::{CreateTeam, Team, TeamDetails, TeamSummary, UpdateTeam},
        team_member::{TeamMember, TeamMemberProfile, TeamRole},
    },
};

/// Create team request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[validate(length(min = 2, max = 50, message = "Team name must be 2-50 characters"))]
    pub team_name: String,

    pub product_owner_user_id: Option<i32>,

    pub project_manager_user_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddUsersRequest {
    #[validate(length(min = 1, message = "At least one user is required"))]
    pub user_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: TeamRole,
}

fn team_not_found() -> ApiError {
    ApiError::NotFound("Team not found".to_string())
}

/// The caller's role in a team they have already been authorized on
pub(crate) async fn caller_role(
    state: &AppState,
    team_id: i32,
    subject: &Subject,
) -> ApiResult<TeamRole> {
    TeamMember::get_role(&state.db, team_id, subject.user_id)
        .await
        .during("checking permissions")?
        .ok_or_else(|| ApiError::Forbidden(format!("Not a member of team {team_id}")))
}

/// Rejects granting `role` by a caller holding `caller`
pub(crate) fn ensure_can_grant(caller: TeamRole, role: TeamRole) -> ApiResult<()> {
    if role.permission_level() > caller.permission_level() {
        return Err(ApiError::Forbidden(format!(
            "A {caller} cannot grant the {role} role"
        )));
    }
    Ok(())
}

/// Rejects acting on a member who outranks the caller
fn ensure_outranks_or_equals(caller: TeamRole, target: TeamRole) -> ApiResult<()> {
    if target.permission_level() > caller.permission_level() {
        return Err(ApiError::Forbidden(format!(
            "A {caller} cannot modify a {target}"
        )));
    }
    Ok(())
}

/// Rejects demoting or removing the last Owner of a team
///
/// `next` is the member's new role, `None` for a removal.
fn ensure_keeps_an_owner(current: TeamRole, next: Option<TeamRole>, owners: i64) -> ApiResult<()> {
    let loses_owner = current == TeamRole::Owner && next != Some(TeamRole::Owner);
    if loses_owner && owners <= 1 {
        return Err(ApiError::Conflict(
            "A team must keep at least one Owner".to_string(),
        ));
    }
    Ok(())
}

async fn owner_count(state: &AppState, team_id: i32, context: &'static str) -> ApiResult<i64> {
    TeamMember::count_with_role(&state.db, team_id, TeamRole::Owner)
        .await
        .during(context)
}

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Envelope<Vec<TeamSummary>>> {
    let teams = Team::list_summaries(&state.db)
        .await
        .during("retrieving teams")?;

    Ok(Envelope::ok(teams))
}

pub async fn get_team(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<TeamDetails>> {
    let team = Team::find_details(&state.db, id)
        .await
        .during("retrieving team")?
        .ok_or_else(team_not_found)?;

    Ok(Envelope::ok(team))
}

/// Create team
///
/// ```text
/// POST /teams
/// Authorization: Bearer <token>
/// { "teamName": "Platform", "productOwnerUserId": 3 }
/// ```
pub async fn create_team(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppJson(req): AppJson<CreateTeamRequest>,
) -> ApiResult<Envelope<Team>> {
    req.validate()?;

    let team = Team::create_with_owner(
        &state.db,
        CreateTeam {
            team_name: req.team_name,
            product_owner_user_id: req.product_owner_user_id,
            project_manager_user_id: req.project_manager_user_id,
        },
        subject.user_id,
    )
    .await
    .during("creating team")?;

    tracing::info!(team_id = team.id, owner = subject.user_id, "Team created");

    Ok(Envelope::created(team, "Team created successfully"))
}

pub async fn update_team(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
    AppJson(update): AppJson<UpdateTeam>,
) -> ApiResult<Envelope<Team>> {
    if let Some(name) = &update.team_name {
        let len = name.trim().chars().count();
        if !(2..=50).contains(&len) {
            return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "teamName".to_string(),
                message: "Team name must be 2-50 characters".to_string(),
            }]));
        }
    }

    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::Update).await?;

    let team = Team::update(&state.db, id, update)
        .await
        .during("updating team")?
        .ok_or_else(team_not_found)?;

    Ok(Envelope::updated(team, "Team updated successfully"))
}

pub async fn delete_team(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<()>> {
    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::Delete).await?;

    if !Team::delete(&state.db, id).await.during("deleting team")? {
        return Err(team_not_found());
    }

    tracing::info!(team_id = id, user_id = subject.user_id, "Team deleted");

    Ok(Envelope::message("Team deleted successfully"))
}

/// Add users to a team
///
/// New members join as `Member` and the team becomes their primary team.
/// Users who already belong to the team keep their role.
pub async fn add_team_users(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<AddUsersRequest>,
) -> ApiResult<Envelope<Vec<TeamMemberProfile>>> {
    req.validate()?;

    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::ManageMembers).await?;

    let added = TeamMember::add_many(&state.db, id, &req.user_ids, TeamRole::Member)
        .await
        .during("assigning users to team")?;

    tracing::info!(team_id = id, added, "Users assigned to team");

    let members = TeamMember::list_by_team(&state.db, id)
        .await
        .during("assigning users to team")?;

    Ok(Envelope::created(members, "Users assigned to team successfully"))
}

pub async fn list_team_members(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<Vec<TeamMemberProfile>>> {
    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::View).await?;

    let members = TeamMember::list_by_team(&state.db, id)
        .await
        .during("retrieving team members")?;

    Ok(Envelope::ok(members))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath((id, user_id)): AppPath<(i32, i32)>,
    AppJson(req): AppJson<UpdateRoleRequest>,
) -> ApiResult<Envelope<TeamMember>> {
    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::ManageMembers).await?;

    let caller = caller_role(&state, id, &subject).await?;
    ensure_can_grant(caller, req.role)?;

    let current = TeamMember::get_role(&state.db, id, user_id)
        .await
        .during("updating member")?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    ensure_outranks_or_equals(caller, current)?;

    if current == TeamRole::Owner && req.role != TeamRole::Owner {
        let owners = owner_count(&state, id, "updating member").await?;
        ensure_keeps_an_owner(current, Some(req.role), owners)?;
    }

    let member = TeamMember::update_role(&state.db, id, user_id, req.role)
        .await
        .during("updating member")?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    tracing::info!(team_id = id, user_id, role = %req.role, "Member role changed");

    Ok(Envelope::updated(member, "Member has been updated"))
}

pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath((id, user_id)): AppPath<(i32, i32)>,
) -> ApiResult<Envelope<()>> {
    require(&state.db, Some(&subject), ResourceRef::Team(id), Action::ManageMembers).await?;

    let caller = caller_role(&state, id, &subject).await?;

    let target = TeamMember::get_role(&state.db, id, user_id)
        .await
        .during("removing member")?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    ensure_outranks_or_equals(caller, target)?;

    if target == TeamRole::Owner {
        let owners = owner_count(&state, id, "removing member").await?;
        ensure_keeps_an_owner(target, None, owners)?;
    }

    if !TeamMember::remove(&state.db, id, user_id)
        .await
        .during("removing member")?
    {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    tracing::info!(team_id = id, user_id, removed_by = subject.user_id, "Member removed");

    Ok(Envelope::message("Member has been removed"))
}

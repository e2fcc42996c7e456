/// Team invitations
///
/// An Editor (or higher) invites a registered user into a team with a role.
/// The invitee receives a link carrying a one-time code and accepts it while
/// signed in:
///
/// ```text
/// POST /teams/7/invitations            { "userId": 12, "role": "Editor" }
/// → { "data": { "inviteId": "...", "link": "https://.../teams/invitations/<id>/accept?code=...", ... } }
///
/// POST /teams/invitations/<id>/accept  { "code": "..." }
/// → { "data": { teamId, userId, role, ... }, "message": "You have successfully joined the team!" }
/// ```
///
/// Delivering the link is left to the inviter; it is also logged.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext},
    extract::{AppJson, AppPath},
    response::Envelope,
    routes::{
        teams::{caller_role, ensure_can_grant},
        CurrentUser,
    },
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vexa_shared::{
    auth::authorization::{require, Action, ResourceRef},
    invites::{PendingInvite, CODE_LENGTH},
    models::{
        team_member::{TeamMember, TeamRole},
        user::User,
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    pub user_id: i32,

    #[serde(default = "default_role")]
    pub role: TeamRole,
}

fn default_role() -> TeamRole {
    TeamRole::Member
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub invite_id: Uuid,
    pub team_id: i32,
    pub user_id: i32,
    pub role: TeamRole,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub code: String,
}

impl AcceptInvitationRequest {
    fn is_well_formed(&self) -> bool {
        self.code.chars().count() == CODE_LENGTH
    }
}

/// Builds the accept link sent to the invitee
pub fn accept_link(public_url: &str, invite_id: Uuid, code: &str) -> String {
    format!("{public_url}/teams/invitations/{invite_id}/accept?code={code}")
}

/// Issue an invitation
///
/// # Errors
///
/// - `403 Forbidden`: caller is below Editor or grants a role above their own
/// - `404 Not Found`: team or invitee does not exist
/// - `409 Conflict`: invitee is already a member
pub async fn create_invitation(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(team_id): AppPath<i32>,
    AppJson(req): AppJson<CreateInvitationRequest>,
) -> ApiResult<Envelope<InvitationResponse>> {
    require(&state.db, Some(&subject), ResourceRef::Team(team_id), Action::Invite).await?;

    let caller = caller_role(&state, team_id, &subject).await?;
    ensure_can_grant(caller, req.role)?;

    if User::find_by_id(&state.db, req.user_id)
        .await
        .during("creating invitation")?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    if TeamMember::find(&state.db, team_id, req.user_id)
        .await
        .during("creating invitation")?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "User is already a member of this team".to_string(),
        ));
    }

    let issued = state
        .invitations
        .issue(team_id, req.user_id, req.role)
        .await?;

    let link = accept_link(&state.config.api.public_url, issued.invite_id, &issued.code);

    tracing::info!(
        invite_id = %issued.invite_id,
        team_id,
        user_id = req.user_id,
        link = %link,
        "Invitation link created"
    );

    Ok(Envelope::created(
        InvitationResponse {
            invite_id: issued.invite_id,
            team_id,
            user_id: req.user_id,
            role: req.role,
            link,
            expires_at: issued.expires_at,
        },
        "Invitation created successfully",
    ))
}

/// Accept an invitation
///
/// A wrong code leaves the invitation in place. An invitation redeemed by
/// someone other than the invitee is put back for the invitee.
pub async fn accept_invitation(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(invite_id): AppPath<Uuid>,
    AppJson(req): AppJson<AcceptInvitationRequest>,
) -> ApiResult<Envelope<TeamMember>> {
    if !req.is_well_formed() {
        return Err(ApiError::BadRequest("Invalid Link - Link Expired!".to_string()));
    }

    let pending = state.invitations.redeem(invite_id, &req.code).await?;

    if pending.user_id != subject.user_id {
        restore(&state, invite_id, &pending).await;
        return Err(ApiError::Forbidden(
            "This invitation was issued to another user".to_string(),
        ));
    }

    let existing = match TeamMember::find(&state.db, pending.team_id, subject.user_id).await {
        Ok(existing) => existing,
        Err(e) => {
            restore(&state, invite_id, &pending).await;
            return Err(ApiError::from(e));
        }
    };
    if existing.is_some() {
        return Err(ApiError::Forbidden(
            "You are already a member of this team".to_string(),
        ));
    }

    let member = match TeamMember::add(&state.db, pending.team_id, subject.user_id, pending.role)
        .await
        .during("joining team")
    {
        Ok(member) => member,
        Err(e) => {
            restore(&state, invite_id, &pending).await;
            return Err(e);
        }
    };

    tracing::info!(
        %invite_id,
        team_id = member.team_id,
        user_id = member.user_id,
        role = %member.role,
        "Invitation accepted"
    );

    Ok(Envelope::created(member, "You have successfully joined the team!"))
}

async fn restore(state: &AppState, invite_id: Uuid, pending: &PendingInvite) {
    if let Err(e) = state.invitations.restore(invite_id, pending).await {
        tracing::warn!(%invite_id, error = %e, "Failed to restore invitation");
    }
}

/// Project endpoints
///
/// # Endpoints
///
/// - `GET /projects` - List projects
/// - `POST /projects` - Create a project
/// - `GET /projects/:id` - Get a project
/// - `PUT /projects/:id` - Replace a project's fields (team Editor+)
/// - `DELETE /projects/:id` - Delete a project (team Admin+)
/// - `POST /projects/assign-team` - Link a team to a project (team Editor+)
/// - `GET /projects/team/:team_id` - Projects linked to a team
///
/// Projects without any linked team may be changed by any authenticated
/// user.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext},
    extract::{AppJson, AppPath},
    response::Envelope,
    routes::CurrentUser,
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};
use vexa_shared::{
    auth::authorization::{require, Action, ResourceRef},
    models::project::{CreateProject, Project, ProjectTeam},
};

/// Create or replace project request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_date_range"))]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

fn validate_date_range(req: &ProjectRequest) -> Result<(), ValidationError> {
    match (req.start_date, req.end_date) {
        (Some(start), Some(end)) if end < start => {
            let mut err = ValidationError::new("date_range");
            err.message = Some("End date must not be before start date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl From<ProjectRequest> for CreateProject {
    fn from(req: ProjectRequest) -> Self {
        CreateProject {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

/// Assign team request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeamRequest {
    pub project_id: i32,
    pub team_id: i32,
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Envelope<Vec<Project>>> {
    let projects = Project::list(&state.db)
        .await
        .during("retrieving projects")?;

    Ok(Envelope::ok(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<Project>> {
    let project = Project::find_by_id(&state.db, id)
        .await
        .during("retrieving project")?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Envelope::ok(project))
}

/// Create project
///
/// ```text
/// POST /projects
/// { "name": "Apollo", "description": "...", "startDate": "2025-01-01T00:00:00Z" }
/// ```
///
/// Responds 201 with the created project.
pub async fn create_project(
    State(state): State<AppState>,
    AppJson(req): AppJson<ProjectRequest>,
) -> ApiResult<Envelope<Project>> {
    req.validate()?;

    let project = Project::create(&state.db, req.into())
        .await
        .during("creating a project")?;

    tracing::info!(project_id = project.id, "Project created");

    Ok(Envelope::created(project, "Project created successfully"))
}

/// Replace a project's mutable fields
///
/// Omitted optional fields are cleared.
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<ProjectRequest>,
) -> ApiResult<Envelope<Project>> {
    req.validate()?;

    require(&state.db, Some(&subject), ResourceRef::Project(id), Action::Update).await?;

    let project = Project::update(&state.db, id, req.into())
        .await
        .during("updating project")?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Envelope::updated(project, "Project updated successfully"))
}

pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Envelope<()>> {
    require(&state.db, Some(&subject), ResourceRef::Project(id), Action::Delete).await?;

    let deleted = Project::delete(&state.db, id)
        .await
        .during("deleting project")?;

    if !deleted {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = id, user_id = subject.user_id, "Project deleted");

    Ok(Envelope::message("Project deleted successfully"))
}

/// Link a team to a project
///
/// The caller needs Editor or higher on the team being linked.
pub async fn assign_team(
    State(state): State<AppState>,
    CurrentUser(subject): CurrentUser,
    AppJson(req): AppJson<AssignTeamRequest>,
) -> ApiResult<Envelope<ProjectTeam>> {
    require(
        &state.db,
        Some(&subject),
        ResourceRef::Team(req.team_id),
        Action::AssignTeam,
    )
    .await?;

    if Project::find_by_id(&state.db, req.project_id)
        .await
        .during("assigning team to project")?
        .is_none()
    {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    let link = Project::assign_team(&state.db, req.project_id, req.team_id)
        .await
        .during("assigning team to project")?;

    Ok(Envelope::created(link, "Team assigned to project successfully"))
}

pub async fn list_team_projects(
    State(state): State<AppState>,
    AppPath(team_id): AppPath<i32>,
) -> ApiResult<Envelope<Vec<Project>>> {
    let projects = Project::list_by_team(&state.db, team_id)
        .await
        .during("retrieving projects")?;

    Ok(Envelope::ok(projects))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ProjectRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_request_uses_camel_case() {
        let req = request(serde_json::json!({
            "name": "Apollo",
            "startDate": "2025-01-01T00:00:00Z",
            "endDate": "2025-02-01T00:00:00Z"
        }));

        assert!(req.start_date.is_some());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let req = request(serde_json::json!({ "name": "" }));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let req = request(serde_json::json!({
            "name": "Apollo",
            "startDate": "2025-02-01T00:00:00Z",
            "endDate": "2025-01-01T00:00:00Z"
        }));

        assert!(req.validate().is_err());
    }
}

/// Declarative endpoint table
///
/// One constant per backend endpoint. Queries say which tags their result
/// provides; mutations say which tags they invalidate. [`crate::VexaClient`]
/// does the rest.
///
/// List queries provide one tag per returned entity plus the kind tag, so a
/// mutation on a single entity only refreshes the lists that contain it and
/// a creation (which invalidates the kind) refreshes them all.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use vexa_shared::models::{
    attachment::Attachment,
    project::{Project, ProjectTeam},
    task::{Task, TaskDetails, TaskPriority, TaskStatus, UpdateTask},
    team::{Team, TeamDetails, TeamSummary, UpdateTeam},
    team_member::{TeamMember, TeamMemberProfile, TeamRole},
    user::User,
};

use crate::cache::{Tag, TagKind};

/// A cached `GET` endpoint
pub struct QueryDef<A, T> {
    /// Cache key namespace
    pub name: &'static str,
    pub path: fn(&A) -> String,
    pub params: fn(&A) -> Vec<(&'static str, String)>,
    pub provides: fn(&A, &T) -> Vec<Tag>,
}

/// A state-changing endpoint
pub struct MutationDef<A, T> {
    pub name: &'static str,
    pub method: Method,
    pub path: fn(&A) -> String,
    pub body: fn(&A) -> Option<Value>,
    pub invalidates: fn(&A, &T) -> Vec<Tag>,
}

fn no_params<A>(_: &A) -> Vec<(&'static str, String)> {
    Vec::new()
}

fn no_body<A>(_: &A) -> Option<Value> {
    None
}

fn json_body<B: Serialize>(body: &B) -> Option<Value> {
    serde_json::to_value(body).ok()
}

fn list_tags(kind: TagKind, ids: impl IntoIterator<Item = i32>) -> Vec<Tag> {
    let mut tags: Vec<Tag> = ids.into_iter().map(|id| Tag::id(kind, id)).collect();
    tags.push(Tag::list(kind));
    tags
}

fn entity_and_list(kind: TagKind, id: i32) -> Vec<Tag> {
    vec![Tag::id(kind, id), Tag::list(kind)]
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeam {
    pub project_id: i32,
    pub team_id: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub points: Option<i32>,
    pub project_id: i32,
    pub author_user_id: Option<i32>,
    pub assigned_user_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub file_url: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub team_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub team_name: String,
    pub product_owner_user_id: Option<i32>,
    pub project_manager_user_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvitation {
    pub user_id: i32,
    pub role: TeamRole,
}

// ---------------------------------------------------------------------------
// Response bodies not shared with the server models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResults {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub invite_id: Uuid,
    pub team_id: i32,
    pub user_id: i32,
    pub role: TeamRole,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub const GET_PROJECTS: QueryDef<(), Vec<Project>> = QueryDef {
    name: "getProjects",
    path: |_| "/projects".to_string(),
    params: no_params,
    provides: |_, projects| list_tags(TagKind::Projects, projects.iter().map(|p| p.id)),
};

pub const GET_PROJECT: QueryDef<i32, Project> = QueryDef {
    name: "getProject",
    path: |id| format!("/projects/{id}"),
    params: no_params,
    provides: |id, _| vec![Tag::id(TagKind::Projects, *id)],
};

/// Projects governed by a team
pub const GET_TEAM_PROJECTS: QueryDef<i32, Vec<Project>> = QueryDef {
    name: "getTeamProjects",
    path: |team_id| format!("/projects/team/{team_id}"),
    params: no_params,
    provides: |team_id, projects| {
        let mut tags = list_tags(TagKind::Projects, projects.iter().map(|p| p.id));
        tags.push(Tag::id(TagKind::Teams, *team_id));
        tags
    },
};

pub const CREATE_PROJECT: MutationDef<NewProject, Project> = MutationDef {
    name: "createProject",
    method: Method::POST,
    path: |_| "/projects".to_string(),
    body: json_body,
    invalidates: |_, _| vec![Tag::list(TagKind::Projects)],
};

pub const UPDATE_PROJECT: MutationDef<(i32, NewProject), Project> = MutationDef {
    name: "updateProject",
    method: Method::PUT,
    path: |(id, _)| format!("/projects/{id}"),
    body: |(_, project)| json_body(project),
    invalidates: |(id, _), _| vec![Tag::id(TagKind::Projects, *id)],
};

pub const DELETE_PROJECT: MutationDef<i32, ()> = MutationDef {
    name: "deleteProject",
    method: Method::DELETE,
    path: |id| format!("/projects/{id}"),
    body: no_body,
    // Tasks of the project go with it
    invalidates: |id, _| {
        vec![
            Tag::id(TagKind::Projects, *id),
            Tag::list(TagKind::Projects),
            Tag::list(TagKind::Tasks),
        ]
    },
};

pub const ASSIGN_TEAM: MutationDef<AssignTeam, ProjectTeam> = MutationDef {
    name: "assignTeam",
    method: Method::POST,
    path: |_| "/projects/assign-team".to_string(),
    body: json_body,
    invalidates: |req, _| {
        vec![
            Tag::id(TagKind::Projects, req.project_id),
            Tag::id(TagKind::Teams, req.team_id),
        ]
    },
};

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Tasks of a project, by project id
pub const GET_TASKS: QueryDef<i32, Vec<TaskDetails>> = QueryDef {
    name: "getTasks",
    path: |_| "/tasks".to_string(),
    params: |project_id| vec![("projectId", project_id.to_string())],
    provides: |_, tasks| list_tags(TagKind::Tasks, tasks.iter().map(|t| t.task.id)),
};

pub const GET_TASK: QueryDef<i32, TaskDetails> = QueryDef {
    name: "getTask",
    path: |id| format!("/tasks/{id}"),
    params: no_params,
    provides: |id, _| vec![Tag::id(TagKind::Tasks, *id)],
};

/// Tasks a user authored or is assigned to, by user id
pub const GET_USER_TASKS: QueryDef<i32, Vec<TaskDetails>> = QueryDef {
    name: "getTasksByUser",
    path: |user_id| format!("/tasks/user/{user_id}"),
    params: no_params,
    provides: |_, tasks| list_tags(TagKind::Tasks, tasks.iter().map(|t| t.task.id)),
};

pub const GET_OVERDUE_TASKS: QueryDef<(), Vec<Task>> = QueryDef {
    name: "getOverdueTasks",
    path: |_| "/tasks/overdue".to_string(),
    params: no_params,
    provides: |_, tasks| list_tags(TagKind::Tasks, tasks.iter().map(|t| t.id)),
};

pub const CREATE_TASK: MutationDef<NewTask, Task> = MutationDef {
    name: "createTask",
    method: Method::POST,
    path: |_| "/tasks".to_string(),
    body: json_body,
    invalidates: |_, _| vec![Tag::list(TagKind::Tasks)],
};

/// Assignee, due date and status feed the by-user and overdue lists, which
/// may not contain the task yet, so every task list is refreshed
pub const UPDATE_TASK: MutationDef<(i32, UpdateTask), Task> = MutationDef {
    name: "updateTask",
    method: Method::PUT,
    path: |(id, _)| format!("/tasks/{id}"),
    body: |(_, update)| json_body(update),
    invalidates: |(id, _), _| entity_and_list(TagKind::Tasks, *id),
};

pub const UPDATE_TASK_STATUS: MutationDef<(i32, TaskStatus), Task> = MutationDef {
    name: "updateTaskStatus",
    method: Method::PATCH,
    path: |(id, _)| format!("/tasks/{id}/status"),
    body: |(_, status)| Some(serde_json::json!({ "status": status })),
    // Reopening a task can put it back on the overdue list
    invalidates: |(id, _), _| entity_and_list(TagKind::Tasks, *id),
};

/// `None` unassigns
pub const ASSIGN_TASK: MutationDef<(i32, Option<i32>), Task> = MutationDef {
    name: "assignTask",
    method: Method::PUT,
    path: |(id, _)| format!("/tasks/{id}/assign"),
    body: |(_, user_id)| Some(serde_json::json!({ "assignedUserId": user_id })),
    // The new assignee's list does not contain the task yet
    invalidates: |(id, _), _| entity_and_list(TagKind::Tasks, *id),
};

pub const DELETE_TASK: MutationDef<i32, ()> = MutationDef {
    name: "deleteTask",
    method: Method::DELETE,
    path: |id| format!("/tasks/{id}"),
    body: no_body,
    invalidates: |id, _| vec![Tag::id(TagKind::Tasks, *id), Tag::list(TagKind::Tasks)],
};

pub const ADD_ATTACHMENT: MutationDef<(i32, NewAttachment), Attachment> = MutationDef {
    name: "addAttachment",
    method: Method::POST,
    path: |(task_id, _)| format!("/tasks/{task_id}/attachments"),
    body: |(_, attachment)| json_body(attachment),
    invalidates: |(task_id, _), _| vec![Tag::id(TagKind::Tasks, *task_id)],
};

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Search is keyed by its term and provides every kind it may contain
pub const SEARCH: QueryDef<String, SearchResults> = QueryDef {
    name: "search",
    path: |_| "/search".to_string(),
    params: |query| vec![("query", query.clone())],
    provides: |_, _| {
        vec![
            Tag::list(TagKind::Tasks),
            Tag::list(TagKind::Projects),
            Tag::list(TagKind::Users),
        ]
    },
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub const GET_USERS: QueryDef<(), Vec<User>> = QueryDef {
    name: "getUsers",
    path: |_| "/users".to_string(),
    params: no_params,
    provides: |_, users| list_tags(TagKind::Users, users.iter().map(|u| u.user_id)),
};

/// A user by identity-provider subject
pub const GET_USER: QueryDef<String, User> = QueryDef {
    name: "getUser",
    path: |external_id| format!("/users/{external_id}"),
    params: no_params,
    provides: |_, user| vec![Tag::id(TagKind::Users, user.user_id)],
};

pub const CREATE_USER: MutationDef<NewUser, User> = MutationDef {
    name: "createUser",
    method: Method::POST,
    path: |_| "/users".to_string(),
    body: json_body,
    invalidates: |_, _| vec![Tag::list(TagKind::Users)],
};

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

pub const GET_TEAMS: QueryDef<(), Vec<TeamSummary>> = QueryDef {
    name: "getTeams",
    path: |_| "/teams".to_string(),
    params: no_params,
    provides: |_, teams| list_tags(TagKind::Teams, teams.iter().map(|t| t.team.id)),
};

pub const GET_TEAM: QueryDef<i32, TeamDetails> = QueryDef {
    name: "getTeam",
    path: |id| format!("/teams/{id}"),
    params: no_params,
    provides: |id, team| {
        let mut tags = vec![Tag::id(TagKind::Teams, *id)];
        tags.extend(team.projects.iter().map(|p| Tag::id(TagKind::Projects, p.id)));
        tags
    },
};

pub const GET_TEAM_MEMBERS: QueryDef<i32, Vec<TeamMemberProfile>> = QueryDef {
    name: "getTeamMembers",
    path: |id| format!("/teams/{id}/members"),
    params: no_params,
    provides: |id, _| vec![Tag::id(TagKind::Teams, *id)],
};

pub const CREATE_TEAM: MutationDef<NewTeam, Team> = MutationDef {
    name: "createTeam",
    method: Method::POST,
    path: |_| "/teams".to_string(),
    body: json_body,
    // The creator's primary team changes too
    invalidates: |_, _| vec![Tag::list(TagKind::Teams), Tag::list(TagKind::Users)],
};

pub const UPDATE_TEAM: MutationDef<(i32, UpdateTeam), Team> = MutationDef {
    name: "updateTeam",
    method: Method::PUT,
    path: |(id, _)| format!("/teams/{id}"),
    body: |(_, update)| json_body(update),
    invalidates: |(id, _), _| vec![Tag::id(TagKind::Teams, *id)],
};

pub const DELETE_TEAM: MutationDef<i32, ()> = MutationDef {
    name: "deleteTeam",
    method: Method::DELETE,
    path: |id| format!("/teams/{id}"),
    body: no_body,
    invalidates: |id, _| {
        vec![
            Tag::id(TagKind::Teams, *id),
            Tag::list(TagKind::Teams),
            Tag::list(TagKind::Projects),
        ]
    },
};

pub const ADD_TEAM_USERS: MutationDef<(i32, Vec<i32>), Vec<TeamMemberProfile>> = MutationDef {
    name: "addTeamUsers",
    method: Method::POST,
    path: |(id, _)| format!("/teams/{id}/users"),
    body: |(_, user_ids)| Some(serde_json::json!({ "userIds": user_ids })),
    invalidates: |(id, user_ids), _| {
        let mut tags = vec![Tag::id(TagKind::Teams, *id)];
        tags.extend(user_ids.iter().map(|u| Tag::id(TagKind::Users, *u)));
        tags
    },
};

/// `(team_id, user_id, role)`
pub const UPDATE_MEMBER_ROLE: MutationDef<(i32, i32, TeamRole), TeamMember> = MutationDef {
    name: "updateMemberRole",
    method: Method::PATCH,
    path: |(id, user_id, _)| format!("/teams/{id}/members/{user_id}"),
    body: |(_, _, role)| Some(serde_json::json!({ "role": role })),
    invalidates: |(id, _, _), _| vec![Tag::id(TagKind::Teams, *id)],
};

/// `(team_id, user_id)`
pub const REMOVE_MEMBER: MutationDef<(i32, i32), ()> = MutationDef {
    name: "removeMember",
    method: Method::DELETE,
    path: |(id, user_id)| format!("/teams/{id}/members/{user_id}"),
    body: no_body,
    invalidates: |(id, user_id), _| {
        vec![Tag::id(TagKind::Teams, *id), Tag::id(TagKind::Users, *user_id)]
    },
};

pub const CREATE_INVITATION: MutationDef<(i32, NewInvitation), Invitation> = MutationDef {
    name: "createInvitation",
    method: Method::POST,
    path: |(id, _)| format!("/teams/{id}/invitations"),
    body: |(_, invitation)| json_body(invitation),
    invalidates: |_, _| Vec::new(),
};

/// `(invite_id, code)`
pub const ACCEPT_INVITATION: MutationDef<(Uuid, String), TeamMember> = MutationDef {
    name: "acceptInvitation",
    method: Method::POST,
    path: |(invite_id, _)| format!("/teams/invitations/{invite_id}/accept"),
    body: |(_, code)| Some(serde_json::json!({ "code": code })),
    invalidates: |_, member| {
        vec![
            Tag::id(TagKind::Teams, member.team_id),
            Tag::id(TagKind::Users, member.user_id),
        ]
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_params() {
        assert_eq!((GET_PROJECT.path)(&4), "/projects/4");
        assert_eq!((GET_TASKS.path)(&4), "/tasks");
        assert_eq!(
            (GET_TASKS.params)(&4),
            vec![("projectId", "4".to_string())]
        );
        assert_eq!(
            (UPDATE_MEMBER_ROLE.path)(&(1, 2, TeamRole::Admin)),
            "/teams/1/members/2"
        );
        assert_eq!(UPDATE_TASK_STATUS.method, Method::PATCH);
    }

    #[test]
    fn test_status_body_uses_wire_names() {
        let body = (UPDATE_TASK_STATUS.body)(&(7, TaskStatus::WorkInProgress));
        assert_eq!(body, Some(serde_json::json!({ "status": "Work In Progress" })));
    }

    #[test]
    fn test_update_task_body_only_carries_set_fields() {
        let update = UpdateTask {
            description: Some(None),
            points: Some(Some(3)),
            ..Default::default()
        };

        let body = (UPDATE_TASK.body)(&(7, update));
        assert_eq!(
            body,
            Some(serde_json::json!({ "description": null, "points": 3 }))
        );
    }

    #[test]
    fn test_list_provides_entity_and_kind_tags() {
        let tags = list_tags(TagKind::Tasks, [7, 8]);

        assert!(tags.contains(&Tag::id(TagKind::Tasks, 7)));
        assert!(tags.contains(&Tag::id(TagKind::Tasks, 8)));
        assert!(tags.contains(&Tag::list(TagKind::Tasks)));
    }

    #[test]
    fn test_task_edits_refresh_every_task_list() {
        let list = Tag::list(TagKind::Tasks);
        let user_tasks = [Tag::id(TagKind::Tasks, 3), list];

        let assign = (ASSIGN_TASK.invalidates)(&(7, Some(5)), &task_stub(7));
        let status = (UPDATE_TASK_STATUS.invalidates)(&(7, TaskStatus::ToDo), &task_stub(7));
        let update = (UPDATE_TASK.invalidates)(&(7, UpdateTask::default()), &task_stub(7));

        for tags in [assign, status, update] {
            assert!(tags.contains(&Tag::id(TagKind::Tasks, 7)));
            // A list that does not yet hold task 7 is still refreshed
            assert!(tags.iter().any(|t| user_tasks.iter().any(|p| t.invalidates(p))));
        }
    }

    fn task_stub(id: i32) -> Task {
        let now = Utc::now();
        Task {
            id,
            title: "Write brief".to_string(),
            description: None,
            status: None,
            priority: None,
            tags: None,
            start_date: None,
            due_date: None,
            points: None,
            project_id: 1,
            author_user_id: None,
            assigned_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_user_omits_username_when_unset() {
        let user = NewUser {
            external_id: "user_1".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        };

        let body = json_body(&user).unwrap();
        assert!(body.get("username").is_none());
        assert_eq!(body["externalId"], "user_1");
    }
}

/// Cross-entity search
///
/// ```text
/// GET /search?query=design
/// ```
///
/// Returns tasks (title/description), projects (name/description) and users
/// (username/email) containing the query, case-insensitively.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext},
    extract::AppQuery,
    response::Envelope,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use vexa_shared::models::{project::Project, task::Task, user::User};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub users: Vec<User>,
}

pub async fn search(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchQuery>,
) -> ApiResult<Envelope<SearchResults>> {
    let term = params.query.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("Search query is required".to_string()));
    }

    let (tasks, projects, users) = futures::try_join!(
        Task::search(&state.db, term),
        Project::search(&state.db, term),
        User::search(&state.db, term),
    )
    .during("performing search")?;

    tracing::debug!(
        term,
        tasks = tasks.len(),
        projects = projects.len(),
        users = users.len(),
        "Search completed"
    );

    Ok(Envelope::ok(SearchResults {
        tasks,
        projects,
        users,
    }))
}
